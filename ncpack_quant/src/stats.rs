/// Value distribution of one variable: extremes and mean over the finite
/// (unmasked) entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of finite values the statistics were taken over.
    pub count: usize,
}

impl Distribution {
    /// Single pass over `values`. NaN and infinities (masked entries after
    /// decoding) are skipped; with no finite values every statistic is 0.
    pub fn of(values: &[f64]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &v in values {
            if !v.is_finite() {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        if count == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                count,
            };
        }
        let n = count as f64;
        let mean = if sum.is_finite() {
            sum / n
        } else {
            values.iter().filter(|v| v.is_finite()).map(|v| v / n).sum()
        };
        Self {
            min,
            max,
            // clamp away float summation drift outside [min, max]
            mean: mean.clamp(min, max),
            count,
        }
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// `range() / divisor`, still finite when the range itself exceeds
    /// `f64::MAX`.
    pub fn range_over(&self, divisor: f64) -> f64 {
        let range = self.range();
        if range.is_finite() {
            range / divisor
        } else {
            self.max / divisor - self.min / divisor
        }
    }

    /// The smaller of the two gaps between the mean and an extreme.
    #[inline]
    pub fn smaller_gap(&self) -> f64 {
        (self.mean - self.min).min(self.max - self.mean)
    }
}
