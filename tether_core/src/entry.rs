use crate::config::DriverConfig;
use crate::control::ControlChannel;
use crate::coverage::{CoverageSink, NoCoverage};
use crate::driver::PersistentDriver;
use crate::error::DriverError;
use crate::fallback::FallbackRunner;
use crate::harness::Harness;
use crate::input::InputChannel;
use std::process::ExitCode;

/// How this process was launched, decided once at start-up.
#[derive(Debug)]
pub enum Mode {
    /// An engine handed us the input file; iterate until it kills us.
    Persistent(InputChannel),
    /// Standalone run on a file or stdin.
    Fallback,
}

impl Mode {
    pub fn detect(config: &DriverConfig) -> Result<Self, DriverError> {
        let mode = match InputChannel::probe(config.input_fd, config.max_input_size)? {
            Some(input) => Mode::Persistent(input),
            None => Mode::Fallback,
        };
        tracing::debug!(persistent = mode.is_persistent(), "mode selected");
        Ok(mode)
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Mode::Persistent(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ReadFailure,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::ReadFailure => 1,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

/// Process-level orchestration: initialization hook, mode detection,
/// dispatch.
pub struct EntryPoint<C = NoCoverage> {
    config: DriverConfig,
    coverage: C,
}

impl EntryPoint<NoCoverage> {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            coverage: NoCoverage,
        }
    }
}

impl<C: CoverageSink> EntryPoint<C> {
    pub fn with_coverage<D: CoverageSink>(self, coverage: D) -> EntryPoint<D> {
        EntryPoint {
            config: self.config,
            coverage,
        }
    }

    /// Runs the target and returns the process outcome. Fatal conditions
    /// terminate the process.
    pub fn run<H: Harness + ?Sized>(self, harness: &mut H, args: Vec<String>) -> ExitCode {
        match self.try_run(harness, args) {
            Ok(outcome) => outcome.into(),
            Err(e) => fatal(&e),
        }
    }

    /// Like [`EntryPoint::run`] but hands fatal errors back to the caller.
    /// In persistent mode this only ever returns an error.
    pub fn try_run<H: Harness + ?Sized>(
        self,
        harness: &mut H,
        mut args: Vec<String>,
    ) -> Result<Outcome, DriverError> {
        harness.initialize(&mut args);
        self.config.validate()?;

        match Mode::detect(&self.config)? {
            Mode::Persistent(input) => {
                // SAFETY: the control descriptor is reserved for the engine
                // and is adopted exactly once, here.
                let control = unsafe {
                    ControlChannel::from_raw_fd(self.config.control_fd, self.config.done_tag)
                };
                let mut driver = PersistentDriver::new(input, control, self.coverage);
                match driver.run(harness)? {}
            }
            Mode::Fallback => {
                match FallbackRunner::new(self.config.max_input_size).run(harness, &args) {
                    Ok(()) => Ok(Outcome::Success),
                    Err(e) if !e.is_fatal() => {
                        tracing::error!("{}", e);
                        Ok(Outcome::ReadFailure)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

/// Logs a fatal driver error and terminates the process.
pub fn fatal(err: &DriverError) -> ! {
    if tracing::dispatcher::has_been_set() {
        tracing::error!(error = %err, "fatal driver error");
    } else {
        eprintln!("FATAL: {err}");
    }
    std::process::exit(1)
}
