pub mod config;
pub mod control;
pub mod coverage;
pub mod driver;
pub mod entry;
pub mod error;
pub mod fallback;
pub mod harness;
pub mod input;

pub use config::DriverConfig;
pub use control::ControlChannel;
pub use coverage::{CoverageScope, CoverageSink, NoCoverage};
pub use driver::{LoopState, PersistentDriver};
pub use entry::{EntryPoint, Mode, Outcome, fatal};
pub use error::DriverError;
pub use fallback::{FallbackRunner, InputSource};
pub use harness::{Harness, run_one_input};
pub use input::InputChannel;
