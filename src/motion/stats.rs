//! Streaming mean / variance over a fixed-size rolling window.
//!
//! Uses the shifted-data formulation: every sample is stored relative to a
//! reference `K` (the first sample seen), so the sums stay small and the
//! variance numerator never suffers catastrophic cancellation.  Sums are
//! kept as exact integers; only the final division is floating point.

use heapless::Deque;

/// Running totals of `x - K` and `(x - K)²`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalStats {
    k: i32,
    n: u32,
    ex: i64,
    ex2: i128,
}

impl IncrementalStats {
    pub const fn new() -> Self {
        Self {
            k: 0,
            n: 0,
            ex: 0,
            ex2: 0,
        }
    }

    pub fn add(&mut self, x: i32) {
        if self.n == 0 {
            self.k = x;
        }
        self.n += 1;
        let d = i64::from(x) - i64::from(self.k);
        self.ex += d;
        self.ex2 += i128::from(d) * i128::from(d);
    }

    /// Reverse a previous [`add`](Self::add) of `x`.
    pub fn remove(&mut self, x: i32) {
        if self.n == 0 {
            return;
        }
        self.n -= 1;
        let d = i64::from(x) - i64::from(self.k);
        self.ex -= d;
        self.ex2 -= i128::from(d) * i128::from(d);
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    /// `K + Σ(x-K)/n`; `None` with no samples.
    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| f64::from(self.k) + self.ex as f64 / f64::from(self.n))
    }

    /// Sample variance `(Σ(x-K)² - (Σ(x-K))²/n) / (n-1)`; `None` for `n < 2`.
    pub fn variance(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        let n = i128::from(self.n);
        let ex = i128::from(self.ex);
        let numerator = n * self.ex2 - ex * ex;
        Some(numerator.max(0) as f64 / (n * (n - 1)) as f64)
    }

    pub fn std(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

/// Null-hypothesis rejection: is `value` further than `k` standard
/// deviations from `mean`?
pub fn is_unlikely(value: f64, mean: f64, std: f64, k: f64) -> bool {
    (value - mean).abs() > k * std
}

/// [`IncrementalStats`] over the last `N` samples.
#[derive(Debug, Clone, Default)]
pub struct RollingStats<const N: usize> {
    window: Deque<i32, N>,
    stats: IncrementalStats,
}

impl<const N: usize> RollingStats<N> {
    pub const fn new() -> Self {
        Self {
            window: Deque::new(),
            stats: IncrementalStats::new(),
        }
    }

    /// Grow the window by one sample.  Returns `false` (and ignores `x`)
    /// once the window is full; use [`update`](Self::update) from then on.
    pub fn add(&mut self, x: i32) -> bool {
        if self.window.push_back(x).is_err() {
            return false;
        }
        self.stats.add(x);
        true
    }

    /// Evict the oldest sample and insert `x`.  O(1).
    pub fn update(&mut self, x: i32) {
        if let Some(old) = self.window.pop_front() {
            self.stats.remove(old);
        }
        // A slot was just freed (or N == 0).
        if self.window.push_back(x).is_ok() {
            self.stats.add(x);
        }
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> impl Iterator<Item = &i32> {
        self.window.iter()
    }

    pub fn stats(&self) -> &IncrementalStats {
        &self.stats
    }

    pub fn mean(&self) -> Option<f64> {
        self.stats.mean()
    }

    pub fn std(&self) -> Option<f64> {
        self.stats.std()
    }
}
