/// Descriptive statistics of one column of a sample set.
///
/// Obtained from [`EventStats::summary()`](crate::EventStats::summary) or
/// [`EventStats::elapsed_summary()`](crate::EventStats::elapsed_summary).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    count: usize,
    min: u64,
    max: u64,
    median: u64,
    mean: f64,
}

impl Summary {
    /// Summarizes the values, or returns `None` if there are none.
    pub(crate) fn from_values(values: impl IntoIterator<Item = u64>) -> Option<Self> {
        let mut sorted: Vec<u64> = values.into_iter().collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let min = sorted.first().copied()?;
        let max = sorted.last().copied()?;

        // Lower median for an even number of values, so the median is always a real sample.
        #[expect(
            clippy::integer_division,
            reason = "rounding down is what selects the lower median"
        )]
        let median_index = count.saturating_sub(1) / 2;
        let median = sorted.get(median_index).copied()?;

        let sum: u128 = sorted.iter().copied().map(u128::from).sum();

        #[expect(
            clippy::cast_precision_loss,
            reason = "the mean is an approximation anyway, f64 precision is plenty"
        )]
        let mean = sum as f64 / count as f64;

        Some(Self {
            count,
            min,
            max,
            median,
            mean,
        })
    }

    /// The number of values summarized.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The smallest value.
    #[must_use]
    pub fn min(&self) -> u64 {
        self.min
    }

    /// The largest value.
    #[must_use]
    pub fn max(&self) -> u64 {
        self.max
    }

    /// The middle value. For an even number of values, the lower of the two middle values.
    #[must_use]
    pub fn median(&self) -> u64 {
        self.median
    }

    /// The arithmetic mean.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }
}
