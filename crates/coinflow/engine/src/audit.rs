//! Append-only, hash-chained audit trail of committed mutations.
//!
//! Every entry carries the hash of its predecessor; `entry_hash` is BLAKE3
//! over the previous hash and the entry's content. Rejected appends and drag
//! simulations never produce entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutation recorded by an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EventAppended,
    PersonRegistered,
    Reconfigured,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            AuditAction::EventAppended => "event_appended",
            AuditAction::PersonRegistered => "person_registered",
            AuditAction::Reconfigured => "reconfigured",
        };
        f.write_str(tag)
    }
}

/// An audit log entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 0
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Snapshot of what was committed
    pub payload: serde_json::Value,
    /// Hash of the previous entry (None for the first)
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

impl AuditEntry {
    fn compute_hash(
        sequence: u64,
        timestamp: &DateTime<Utc>,
        action: AuditAction,
        payload: &serde_json::Value,
        previous_hash: Option<&str>,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(previous_hash.unwrap_or("").as_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.update(timestamp.to_rfc3339().as_bytes());
        hasher.update(action.to_string().as_bytes());
        hasher.update(payload.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    fn expected_hash(&self) -> String {
        Self::compute_hash(
            self.sequence,
            &self.timestamp,
            self.action,
            &self.payload,
            self.previous_hash.as_deref(),
        )
    }
}

/// Result of re-deriving the hash chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_entries: usize,
    pub verified_entries: usize,
    pub first_invalid_index: Option<usize>,
    pub error_message: Option<String>,
}

/// The audit log. Never pruned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        action: AuditAction,
        payload: serde_json::Value,
    ) -> &AuditEntry {
        let sequence = self.entries.len() as u64;
        let previous_hash = self.head_hash().map(str::to_string);
        let entry_hash = AuditEntry::compute_hash(
            sequence,
            &timestamp,
            action,
            &payload,
            previous_hash.as_deref(),
        );
        let index = self.entries.len();
        self.entries.push(AuditEntry {
            sequence,
            timestamp,
            action,
            payload,
            previous_hash,
            entry_hash,
        });
        &self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequential scan from the oldest entry.
    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn head_hash(&self) -> Option<&str> {
        self.entries.last().map(|e| e.entry_hash.as_str())
    }

    /// Re-derive every hash and check the chain linkage.
    pub fn verify(&self) -> ChainVerification {
        verify_entries(&self.entries)
    }

    /// One JSON object per line.
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Verify an ordered slice of entries, e.g. one parsed back from JSONL.
pub fn verify_entries(entries: &[AuditEntry]) -> ChainVerification {
    let mut result = ChainVerification {
        valid: true,
        total_entries: entries.len(),
        verified_entries: 0,
        first_invalid_index: None,
        error_message: None,
    };

    for (i, entry) in entries.iter().enumerate() {
        let expected_prev = if i == 0 {
            None
        } else {
            Some(entries[i - 1].entry_hash.as_str())
        };

        let failure = if entry.previous_hash.as_deref() != expected_prev {
            Some(format!(
                "entry {} has broken chain link (expected prev: {:?}, got: {:?})",
                entry.sequence, expected_prev, entry.previous_hash
            ))
        } else if entry.expected_hash() != entry.entry_hash {
            Some(format!("entry {} has invalid hash", entry.sequence))
        } else {
            None
        };

        if let Some(message) = failure {
            result.valid = false;
            result.first_invalid_index = Some(i);
            result.error_message = Some(message);
            return result;
        }
        result.verified_entries = i + 1;
    }

    result
}
