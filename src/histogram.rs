//! Streaming quantile histogram used for grid axis calibration.
//!
//! A bin-merging sketch in the style of Ben-Haim and Tom-Tov: at most
//! `max_bins` centroids kept sorted by value; inserting past the budget
//! merges the two closest neighbours by count-weighted averaging.

/// A bounded set of `(value, count)` centroids approximating a value
/// distribution.
#[derive(Clone, Debug)]
pub struct Histogram {
    max_bins: usize,
    bins: Vec<Bin>,
    min: f64,
    max: f64,
    total: u64,
}

#[derive(Clone, Copy, Debug)]
struct Bin {
    value: f64,
    count: f64,
}

impl Histogram {
    /// An empty histogram holding at most `max_bins` centroids.
    #[must_use]
    pub fn new(max_bins: usize) -> Histogram {
        Histogram {
            max_bins: max_bins.max(2),
            bins: Vec::new(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            total: 0,
        }
    }

    /// Fold one observation into the sketch.
    pub fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.total += 1;

        let position = self.bins.partition_point(|bin| bin.value < value);
        if let Some(bin) = self.bins.get_mut(position) {
            if bin.value == value {
                bin.count += 1.0;
                return;
            }
        }
        self.bins.insert(
            position,
            Bin {
                value,
                count: 1.0,
            },
        );
        if self.bins.len() > self.max_bins {
            self.merge_closest();
        }
    }

    /// `n` approximately equi-count quantiles at cumulative frequencies
    /// `(j + 1) / n`, non-decreasing and clamped into `[min, max]`.
    /// Empty when the sketch is empty.
    #[must_use]
    pub fn uniform(&self, n: usize) -> Vec<f64> {
        if self.bins.is_empty() || n == 0 {
            return Vec::new();
        }
        let total = self.total as f64;
        let mut quantiles = Vec::with_capacity(n);
        for j in 0..n {
            let target = (j + 1) as f64 * total / n as f64;
            quantiles.push(self.quantile_at(target));
        }
        for i in 1..quantiles.len() {
            if quantiles[i] < quantiles[i - 1] {
                quantiles[i] = quantiles[i - 1];
            }
        }
        quantiles
    }

    /// Smallest observed value; infinite when the sketch is empty.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observed value; negative-infinite when the sketch is empty.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Observations folded in so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    fn merge_closest(&mut self) {
        let mut closest = 0;
        let mut gap = f64::INFINITY;
        for i in 0..self.bins.len() - 1 {
            let width = self.bins[i + 1].value - self.bins[i].value;
            if width < gap {
                gap = width;
                closest = i;
            }
        }
        let (a, b) = (self.bins[closest], self.bins[closest + 1]);
        let count = a.count + b.count;
        self.bins[closest] = Bin {
            value: (a.value * a.count + b.value * b.count) / count,
            count,
        };
        self.bins.remove(closest + 1);
    }

    // Inverts the centroid trapezoid at cumulative count `target`,
    // walking virtual zero-mass sentinels at the observed extrema.
    fn quantile_at(&self, target: f64) -> f64 {
        if target >= self.total as f64 {
            return self.max;
        }
        let mut lower_value = self.min;
        let mut lower_count = 0.0;
        let mut lower_cumulative = 0.0;
        for i in 0..=self.bins.len() {
            let (value, count) = if i < self.bins.len() {
                (self.bins[i].value, self.bins[i].count)
            } else {
                (self.max, 0.0)
            };
            let cumulative = lower_cumulative + lower_count / 2.0 + count / 2.0;
            if target <= cumulative {
                let excess = (target - lower_cumulative).max(0.0);
                let rise = count - lower_count;
                let fraction = if rise.abs() < f64::EPSILON {
                    if lower_count > 0.0 {
                        (excess / lower_count).clamp(0.0, 1.0)
                    } else {
                        1.0
                    }
                } else {
                    let discriminant = (lower_count * lower_count + 2.0 * rise * excess).max(0.0);
                    ((discriminant.sqrt() - lower_count) / rise).clamp(0.0, 1.0)
                };
                return lower_value + (value - lower_value) * fraction;
            }
            lower_cumulative = cumulative;
            lower_value = value;
            lower_count = count;
        }
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrema_and_total_track_observations() {
        let mut h = Histogram::new(8);
        for v in [5.0, -3.0, 12.0, 7.0] {
            h.update(v);
        }
        assert_eq!(h.min(), -3.0);
        assert_eq!(h.max(), 12.0);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn bins_stay_within_budget() {
        let mut h = Histogram::new(4);
        for v in 0..100 {
            h.update(f64::from(v));
        }
        assert!(h.bins.len() <= 4);
        assert_eq!(h.total(), 100);
    }

    #[test]
    fn uniform_is_monotone_and_bounded() {
        let mut h = Histogram::new(16);
        for v in [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0] {
            h.update(v);
        }
        for n in [1, 2, 4, 8, 32] {
            let q = h.uniform(n);
            assert_eq!(q.len(), n);
            for pair in q.windows(2) {
                assert!(pair[0] <= pair[1], "uniform({n}) not monotone: {q:?}");
            }
            assert!(q[0] >= h.min());
            assert_eq!(*q.last().unwrap(), h.max());
        }
    }

    #[test]
    fn uniform_of_uniform_data_is_roughly_even() {
        let mut h = Histogram::new(32);
        for v in 0..1000 {
            h.update(f64::from(v));
        }
        let q = h.uniform(4);
        assert!((q[0] - 250.0).abs() < 50.0, "first quartile off: {q:?}");
        assert!((q[1] - 500.0).abs() < 50.0, "median off: {q:?}");
        assert!((q[2] - 750.0).abs() < 50.0, "third quartile off: {q:?}");
        assert_eq!(q[3], 999.0);
    }

    #[test]
    fn empty_sketch_yields_no_quantiles() {
        let h = Histogram::new(8);
        assert!(h.uniform(4).is_empty());
    }
}
