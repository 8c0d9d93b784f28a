//! Ranger configuration

/// Options controlling reference resolution
#[derive(Debug, Clone)]
pub struct RangerOptions {
    /// Deepest nesting of recursive lassos before failing (default: 8)
    pub max_depth: usize,
    /// Log non-fatal filter failures and pass the value through unchanged
    /// instead of failing
    pub lax: bool,
    /// Append the filter description to filter errors
    pub verbose: bool,
}

impl Default for RangerOptions {
    fn default() -> Self {
        Self {
            max_depth: 8,
            lax: false,
            verbose: false,
        }
    }
}

impl RangerOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_lax(mut self, lax: bool) -> Self {
        self.lax = lax;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
