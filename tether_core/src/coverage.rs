/// The instrumentation collaborator, reduced to the one call the driver needs.
///
/// Implementations discard whatever coverage has been accumulated so far,
/// so the engine's feedback only reflects code run on fuzzed inputs.
pub trait CoverageSink {
    fn clear_new_coverage(&mut self);
}

/// A sink for targets built without coverage instrumentation.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoCoverage;

impl CoverageSink for NoCoverage {
    fn clear_new_coverage(&mut self) {}
}

impl<F> CoverageSink for F
where
    F: FnMut(),
{
    fn clear_new_coverage(&mut self) {
        self()
    }
}

/// Gates the start-up coverage reset so it fires exactly once.
#[derive(Debug)]
pub struct CoverageScope<C> {
    sink: C,
    cleared: bool,
}

impl<C: CoverageSink> CoverageScope<C> {
    pub fn new(sink: C) -> Self {
        Self {
            sink,
            cleared: false,
        }
    }

    /// Clears coverage on the first call and does nothing afterwards.
    /// Returns whether this call performed the reset.
    pub fn enter(&mut self) -> bool {
        if self.cleared {
            return false;
        }
        self.sink.clear_new_coverage();
        self.cleared = true;
        tracing::debug!("start-up coverage discarded");
        true
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }
}
