use crate::error::DriverError;
use crate::harness::{Harness, run_one_input};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

pub const STDIN_NAME: &str = "[STDIN]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// The trailing argument names the input file, if there is one besides
    /// the program name.
    pub fn from_args(args: &[String]) -> Self {
        match args {
            [_, .., last] => InputSource::File(PathBuf::from(last)),
            _ => InputSource::Stdin,
        }
    }

    pub fn name(&self) -> String {
        match self {
            InputSource::Stdin => STDIN_NAME.to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }

    /// Opens the source. A file that cannot be opened degrades to stdin.
    pub fn open(self) -> (Box<dyn Read>, InputSource) {
        match self {
            InputSource::Stdin => (Box::new(io::stdin()), InputSource::Stdin),
            InputSource::File(path) => match File::open(&path) {
                Ok(file) => (Box::new(file), InputSource::File(path)),
                Err(e) => {
                    tracing::warn!("Cannot open {:?} as input, using stdin: {}", path, e);
                    (Box::new(io::stdin()), InputSource::Stdin)
                }
            },
        }
    }
}

/// Single-shot execution for running a target without an engine attached.
#[derive(Debug, Clone, Copy)]
pub struct FallbackRunner {
    max_input_size: usize,
}

impl FallbackRunner {
    pub fn new(max_input_size: usize) -> Self {
        Self { max_input_size }
    }

    pub fn run<H: Harness + ?Sized>(
        &self,
        harness: &mut H,
        args: &[String],
    ) -> Result<(), DriverError> {
        let (reader, source) = InputSource::from_args(args).open();
        let name = source.name();

        tracing::info!("Accepting input from '{}'", name);
        if let Some(program) = args.first() {
            tracing::info!("Usage for fuzzing: honggfuzz -P [flags] -- {}", program);
        }

        self.run_reader(harness, reader, &name)
    }

    /// Reads at most `max_input_size` bytes from `reader` and hands them to
    /// the harness once.
    pub fn run_reader<H, R>(
        &self,
        harness: &mut H,
        reader: R,
        name: &str,
    ) -> Result<(), DriverError>
    where
        H: Harness + ?Sized,
        R: Read,
    {
        let buf = self.read_input(reader).map_err(|source| DriverError::FallbackRead {
            name: name.to_string(),
            source,
        })?;
        tracing::info!(
            len = buf.len(),
            md5 = %format!("{:x}", md5::compute(&buf)),
            "running input from '{}'",
            name
        );

        run_one_input(harness, &buf)
    }

    fn read_input<R: Read>(&self, reader: R) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader
            .take(self.max_input_size as u64)
            .read_to_end(&mut buf)?;
        Ok(buf)
    }
}
