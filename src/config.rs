/// Configuration for queue construction.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of elements the queue can hold before its first growth
    /// allocation (default: 15). The queue rounds the backing block up to the
    /// next power of two internally.
    pub initial_capacity: usize,
    /// Enable metrics collection (slight overhead on every operation).
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is 0, or large enough that the backing
    /// block (one spare slot included) could not be rounded up to a power of
    /// two.
    pub const fn new(initial_capacity: usize, enable_metrics: bool) -> Self {
        assert!(initial_capacity >= 1, "initial_capacity must be at least 1");
        assert!(
            initial_capacity < (usize::MAX >> 1),
            "initial_capacity too large to round up to a power of two"
        );

        Self {
            initial_capacity,
            enable_metrics,
        }
    }

    /// Convenience constructor from a bare capacity hint.
    pub const fn with_capacity(initial_capacity: usize) -> Self {
        Self::new(initial_capacity, false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 15,
            enable_metrics: false,
        }
    }
}
