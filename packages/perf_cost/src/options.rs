//! Configuration of single-shot and repeated measurements.

use std::time::Duration;

/// Configures a single-shot measurement made by [`Profiler::profile()`][1].
///
/// # Examples
///
/// ```
/// use perf_cost::ProfileOptions;
///
/// let options = ProfileOptions::default().warmup(3).reclaim_first(false);
/// assert_eq!(options.warmup_iterations(), 3);
/// assert!(!options.reclaims_first());
/// ```
///
/// [1]: crate::Profiler::profile
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileOptions {
    reclaim_first: bool,
    warmup: u32,
}

impl ProfileOptions {
    /// Whether to force a memory reclamation pass before anything else happens.
    ///
    /// Defaults to `true`. Reclamation happens outside the measured window.
    #[must_use]
    pub fn reclaim_first(mut self, value: bool) -> Self {
        self.reclaim_first = value;
        self
    }

    /// How many times to run the work, unmeasured, before the measured execution.
    ///
    /// Defaults to zero.
    #[must_use]
    pub fn warmup(mut self, iterations: u32) -> Self {
        self.warmup = iterations;
        self
    }

    /// Whether a memory reclamation pass is forced before the measurement.
    #[must_use]
    pub fn reclaims_first(&self) -> bool {
        self.reclaim_first
    }

    /// The number of unmeasured warmup executions.
    #[must_use]
    pub fn warmup_iterations(&self) -> u32 {
        self.warmup
    }
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            reclaim_first: true,
            warmup: 0,
        }
    }
}

/// Configures a repeated measurement made by [`Profiler::sample()`][1].
///
/// Sampling stops as soon as either budget is used up: the total time spent in the sampling
/// loop reaches [`max_duration`](Self::max_duration) or the number of completed iterations
/// reaches [`max_epochs`](Self::max_epochs). Both budgets are only checked before an iteration
/// starts, so an iteration in progress always runs to completion.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use perf_cost::SampleOptions;
///
/// let options = SampleOptions::default()
///     .max_duration(Duration::from_millis(250))
///     .max_epochs(100)
///     .reclaim_each_sample(true);
///
/// assert_eq!(options.duration_budget(), Duration::from_millis(250));
/// assert_eq!(options.epoch_budget(), 100);
/// assert_eq!(options.warmup_iterations(), 1);
/// ```
///
/// [1]: crate::Profiler::sample
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleOptions {
    max_duration: Duration,
    max_epochs: u64,
    reclaim_each_sample: bool,
    warmup: u32,
}

impl SampleOptions {
    /// The longest time the sampling loop may keep starting new iterations.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub fn max_duration(mut self, value: Duration) -> Self {
        self.max_duration = value;
        self
    }

    /// The largest number of iterations to sample.
    ///
    /// Defaults to 1000. Zero is valid and produces an empty sample set.
    #[must_use]
    pub fn max_epochs(mut self, value: u64) -> Self {
        self.max_epochs = value;
        self
    }

    /// Whether to force a memory reclamation pass before every sampled iteration.
    ///
    /// Defaults to `false`. The reclamation happens outside the measured window of each
    /// iteration but still counts against [`max_duration`](Self::max_duration).
    #[must_use]
    pub fn reclaim_each_sample(mut self, value: bool) -> Self {
        self.reclaim_each_sample = value;
        self
    }

    /// How many times to run the work, unmeasured, before sampling starts.
    ///
    /// Defaults to 1.
    #[must_use]
    pub fn warmup(mut self, iterations: u32) -> Self {
        self.warmup = iterations;
        self
    }

    /// The time budget of the sampling loop.
    #[must_use]
    pub fn duration_budget(&self) -> Duration {
        self.max_duration
    }

    /// The iteration budget of the sampling loop.
    #[must_use]
    pub fn epoch_budget(&self) -> u64 {
        self.max_epochs
    }

    /// Whether a memory reclamation pass is forced before every sampled iteration.
    #[must_use]
    pub fn reclaims_each_sample(&self) -> bool {
        self.reclaim_each_sample
    }

    /// The number of unmeasured warmup executions.
    #[must_use]
    pub fn warmup_iterations(&self) -> u32 {
        self.warmup
    }
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(5),
            max_epochs: 1000,
            reclaim_each_sample: false,
            warmup: 1,
        }
    }
}
