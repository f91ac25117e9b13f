use crate::error::DriverError;

/// The capabilities an embedding target hands to the driver.
///
/// Every method has a default, so a target only overrides what it actually
/// provides:
/// * `initialize` defaults to a no-op that returns `1`.
/// * `mutate` defaults to failing with [`DriverError::Unsupported`].
/// * `test_one_input` defaults to failing with
///   [`DriverError::MissingTestCallback`], so a target that forgot to supply
///   its callback stops on the first input instead of silently passing.
///
/// Any `FnMut(&[u8]) -> i32` closure is a complete harness.
pub trait Harness {
    /// Called once before mode dispatch. May rewrite the argument vector;
    /// the driver ignores the return value.
    fn initialize(&mut self, _args: &mut Vec<String>) -> i32 {
        1
    }

    /// Custom mutation hook. Returns the new size of `data[..size]`, at most
    /// `max_size`.
    fn mutate(
        &mut self,
        _data: &mut [u8],
        _size: usize,
        _max_size: usize,
    ) -> Result<usize, DriverError> {
        Err(DriverError::Unsupported("mutate"))
    }

    /// Runs one fuzzing iteration. A healthy target returns `Ok(0)`.
    fn test_one_input(&mut self, _data: &[u8]) -> Result<i32, DriverError> {
        Err(DriverError::MissingTestCallback)
    }
}

impl<F> Harness for F
where
    F: FnMut(&[u8]) -> i32,
{
    fn test_one_input(&mut self, data: &[u8]) -> Result<i32, DriverError> {
        Ok(self(data))
    }
}

/// Invokes the test callback once and enforces the zero-return contract.
pub fn run_one_input<H: Harness + ?Sized>(harness: &mut H, data: &[u8]) -> Result<(), DriverError> {
    match harness.test_one_input(data)? {
        0 => Ok(()),
        code => Err(DriverError::CallbackFailed(code)),
    }
}
