//! Lazy k-combinations over a slice.
//!
//! Used for pairwise link updates (k = 2) and for the team search (k = team
//! size). Combinations are yielded in lexicographic order of positions, so a
//! sorted pool yields lexicographically ordered combinations.

/// Lazy, finite iterator over all k-element combinations of `pool`.
///
/// Cloning yields an independent cursor; [`Combinations::reset`] restarts
/// the sequence from the first combination.
#[derive(Debug, Clone)]
pub struct Combinations<'a, T> {
    pool: &'a [T],
    indices: Vec<usize>,
    k: usize,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Done,
}

impl<'a, T> Combinations<'a, T> {
    pub fn new(pool: &'a [T], k: usize) -> Self {
        Self {
            pool,
            indices: (0..k).collect(),
            k,
            state: if k > pool.len() {
                State::Done
            } else {
                State::Fresh
            },
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.pool, self.k);
    }

    /// Total number of combinations this iterator yields from the start.
    pub fn total(&self) -> u128 {
        binomial(self.pool.len(), self.k)
    }

    fn current(&self) -> Vec<&'a T> {
        self.indices.iter().map(|&i| &self.pool[i]).collect()
    }

    /// Advance `indices` to the next combination; false when exhausted.
    fn step(&mut self) -> bool {
        let n = self.pool.len();
        let k = self.k;
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.indices[i] != i + n - k {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }
}

impl<'a, T> Iterator for Combinations<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Done => None,
            State::Fresh => {
                self.state = State::Running;
                Some(self.current())
            }
            State::Running => {
                if self.step() {
                    Some(self.current())
                } else {
                    self.state = State::Done;
                    None
                }
            }
        }
    }
}

/// C(n, k), saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc * (n - i) is always divisible by (i + 1) at this point
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    acc
}
