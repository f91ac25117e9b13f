use crate::control::ControlChannel;
use crate::coverage::{CoverageScope, CoverageSink};
use crate::error::DriverError;
use crate::harness::{Harness, run_one_input};
use crate::input::InputChannel;
use std::convert::Infallible;
use std::fs::File;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingFirstIteration,
    Looping,
}

/// Runs iterations handed over by the engine, one process launch, many
/// inputs.
///
/// Every fetch follows the same handshake: acknowledge the previous iteration
/// with a done tag (skipped before the first one, which discards start-up
/// coverage instead), then block on the next length header and expose that
/// many bytes of the shared input buffer.
pub struct PersistentDriver<C, S = File> {
    input: InputChannel,
    control: ControlChannel<S>,
    coverage: CoverageScope<C>,
    state: LoopState,
    completed: u64,
}

impl<C, S> PersistentDriver<C, S>
where
    C: CoverageSink,
    S: Read + Write,
{
    pub fn new(input: InputChannel, control: ControlChannel<S>, coverage: C) -> Self {
        Self {
            input,
            control,
            coverage: CoverageScope::new(coverage),
            state: LoopState::AwaitingFirstIteration,
            completed: 0,
        }
    }

    /// Finishes the previous iteration and returns the next input.
    ///
    /// Targets that drive their own loop call this directly; the slice is
    /// valid until the next call.
    pub fn fetch_input(&mut self) -> Result<&[u8], DriverError> {
        match self.state {
            LoopState::AwaitingFirstIteration => {
                self.coverage.enter();
                self.state = LoopState::Looping;
            }
            LoopState::Looping => {
                self.control.send_done()?;
                self.completed += 1;
            }
        }

        let len = self.control.recv_len()?;
        self.input.window(len)
    }

    /// Runs `harness` on every input the engine sends. Only returns on a
    /// fatal error; the engine ends the process otherwise.
    pub fn run<H: Harness + ?Sized>(&mut self, harness: &mut H) -> Result<Infallible, DriverError> {
        tracing::info!(
            input_fd = self.input.fd(),
            capacity = self.input.capacity(),
            "entering persistent mode"
        );
        loop {
            let data = self.fetch_input()?;
            run_one_input(harness, data)?;
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Iterations acknowledged to the engine so far.
    pub fn completed_iterations(&self) -> u64 {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::net::Shutdown;
    use std::os::fd::AsRawFd;
    use std::os::unix::fs::FileExt;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;

    const CAPACITY: usize = 1024;

    struct Engine {
        file: tempfile::NamedTempFile,
        stream: UnixStream,
    }

    impl Engine {
        fn send(&self, data: &[u8]) {
            self.file.as_file().write_all_at(data, 0).unwrap();
            (&self.stream)
                .write_all(&(data.len() as u64).to_ne_bytes())
                .unwrap();
        }

        fn send_len(&self, len: u64) {
            (&self.stream).write_all(&len.to_ne_bytes()).unwrap();
        }

        fn hang_up(&self) {
            self.stream.shutdown(Shutdown::Write).unwrap();
        }

        /// Everything the target wrote before closing its end.
        fn drain(&self) -> Vec<u8> {
            let mut out = Vec::new();
            (&self.stream).read_to_end(&mut out).unwrap();
            out
        }
    }

    fn attach() -> (Engine, PersistentDriver<Box<dyn FnMut()>, UnixStream>, Rc<Cell<u32>>) {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(CAPACITY as u64).unwrap();
        let input = InputChannel::map(file.as_file().as_raw_fd(), CAPACITY).unwrap();

        let (engine_end, target_end) = UnixStream::pair().unwrap();
        let control = ControlChannel::new(target_end, b'D');

        let clears = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clears);
        let sink: Box<dyn FnMut()> = Box::new(move || counter.set(counter.get() + 1));

        let driver = PersistentDriver::new(input, control, sink);
        (
            Engine {
                file,
                stream: engine_end,
            },
            driver,
            clears,
        )
    }

    #[test]
    fn first_fetch_clears_coverage_and_sends_no_tag() {
        let (engine, mut driver, clears) = attach();
        assert_eq!(driver.state(), LoopState::AwaitingFirstIteration);

        engine.send(b"seed");
        assert_eq!(driver.fetch_input().unwrap(), b"seed");
        assert_eq!(driver.state(), LoopState::Looping);
        assert_eq!(clears.get(), 1);
        assert_eq!(driver.completed_iterations(), 0);

        drop(driver);
        assert!(engine.drain().is_empty());
    }

    #[test]
    fn one_tag_per_completed_iteration() {
        let (engine, mut driver, clears) = attach();
        let inputs: [&[u8]; 3] = [b"alpha", b"", b"gamma-ray"];
        let seen = RefCell::new(Vec::new());

        for input in inputs {
            engine.send(input);
        }
        engine.hang_up();

        // The file only holds the last write, so check lengths here and
        // contents in the sequential test below.
        let mut harness = |data: &[u8]| {
            seen.borrow_mut().push(data.len());
            0
        };
        let err = match driver.run(&mut harness) {
            Err(e) => e,
            Ok(never) => match never {},
        };
        assert!(err.is_channel_closed(), "Unexpected error: {err:?}");
        assert_eq!(*seen.borrow(), vec![5, 0, 9]);
        assert_eq!(driver.completed_iterations(), 3);
        assert_eq!(clears.get(), 1);

        drop(driver);
        assert_eq!(engine.drain(), b"DDD");
    }

    #[test]
    fn sequential_iterations_see_current_contents() {
        let (engine, mut driver, clears) = attach();

        engine.send(b"first input");
        assert_eq!(driver.fetch_input().unwrap(), b"first input");

        engine.send(b"second");
        assert_eq!(driver.fetch_input().unwrap(), b"second");
        let mut tag = [0u8; 1];
        (&engine.stream).read_exact(&mut tag).unwrap();
        assert_eq!(tag, [b'D']);

        assert_eq!(clears.get(), 1);
        assert_eq!(driver.completed_iterations(), 1);
    }

    #[test]
    fn zero_length_exposes_empty_slice() {
        let (engine, mut driver, _) = attach();
        engine.send_len(0);
        let data = driver.fetch_input().unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn full_capacity_length_exposes_whole_buffer() {
        let (engine, mut driver, _) = attach();
        let payload = vec![0xA5u8; CAPACITY];
        engine.send(&payload);
        assert_eq!(driver.fetch_input().unwrap(), payload.as_slice());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let (engine, mut driver, _) = attach();
        engine.send_len(CAPACITY as u64 + 1);
        match driver.fetch_input() {
            Err(DriverError::LengthOutOfBounds { len, .. }) => assert_eq!(len, CAPACITY as u64 + 1),
            other => panic!("Expected LengthOutOfBounds, got {other:?}"),
        }
    }

    #[test]
    fn closed_channel_after_iteration_writes_no_extra_tag() {
        let (engine, mut driver, _) = attach();
        engine.send(b"only");
        engine.hang_up();

        let calls = Cell::new(0);
        let mut harness = |_: &[u8]| {
            calls.set(calls.get() + 1);
            0
        };
        let err = match driver.run(&mut harness) {
            Err(e) => e,
            Ok(never) => match never {},
        };
        assert!(err.is_channel_closed());
        assert_eq!(calls.get(), 1);

        drop(driver);
        assert_eq!(engine.drain(), b"D");
    }

    #[test]
    fn failing_callback_stops_without_tag() {
        let (engine, mut driver, _) = attach();
        engine.send(b"one");
        engine.send(b"two");

        let calls = Cell::new(0);
        let mut harness = |_: &[u8]| {
            calls.set(calls.get() + 1);
            if calls.get() == 2 { 1 } else { 0 }
        };
        match driver.run(&mut harness) {
            Err(DriverError::CallbackFailed(code)) => assert_eq!(code, 1),
            Err(other) => panic!("Expected CallbackFailed, got {other:?}"),
            Ok(never) => match never {},
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(driver.completed_iterations(), 1);

        drop(driver);
        assert_eq!(engine.drain(), b"D");
    }

    #[test]
    fn coverage_clear_happens_before_first_callback() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(CAPACITY as u64).unwrap();
        let input = InputChannel::map(file.as_file().as_raw_fd(), CAPACITY).unwrap();
        let (engine_end, target_end) = UnixStream::pair().unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink_events = Rc::clone(&events);
        let mut driver = PersistentDriver::new(
            input,
            ControlChannel::new(target_end, b'D'),
            move || sink_events.borrow_mut().push("clear"),
        );

        (&engine_end).write_all(&3u64.to_ne_bytes()).unwrap();
        (&engine_end).write_all(&3u64.to_ne_bytes()).unwrap();
        engine_end.shutdown(Shutdown::Write).unwrap();

        let mut harness = |_: &[u8]| {
            events.borrow_mut().push("callback");
            0
        };
        let _ = driver.run(&mut harness);
        assert_eq!(*events.borrow(), vec!["clear", "callback", "callback"]);
    }

    #[test]
    fn write_failure_on_done_tag_is_fatal() {
        let (engine, mut driver, _) = attach();
        engine.send(b"x");
        driver.fetch_input().unwrap();
        drop(engine);

        let err = driver.fetch_input().unwrap_err();
        match err {
            DriverError::DoneTagWrite(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected DoneTagWrite, got {other:?}"),
        }
    }
}
