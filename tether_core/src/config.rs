use serde::Deserialize;
use std::os::fd::RawFd;
use std::path::Path;

/// Descriptor the engine maps the input file on.
pub const DEFAULT_INPUT_FD: RawFd = 1021;
/// Descriptor carrying length headers and done tags.
pub const DEFAULT_CONTROL_FD: RawFd = 1023;
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;
pub const DEFAULT_DONE_TAG: u8 = b'D';

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default = "default_input_fd")]
    pub input_fd: RawFd,
    #[serde(default = "default_control_fd")]
    pub control_fd: RawFd,
    #[serde(default = "default_max_input_size")]
    pub max_input_size: usize,
    #[serde(default = "default_done_tag")]
    pub done_tag: u8,
}

fn default_input_fd() -> RawFd {
    DEFAULT_INPUT_FD
}

fn default_control_fd() -> RawFd {
    DEFAULT_CONTROL_FD
}

pub fn default_max_input_size() -> usize {
    DEFAULT_MAX_INPUT_SIZE
}

fn default_done_tag() -> u8 {
    DEFAULT_DONE_TAG
}

impl DriverConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: DriverConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Rejects settings the engine could never satisfy.
    pub fn validate(&self) -> Result<(), crate::DriverError> {
        if self.max_input_size == 0 {
            return Err(crate::DriverError::InvalidConfig(
                "max-input-size must be greater than zero".to_string(),
            ));
        }
        if self.input_fd < 0 || self.control_fd < 0 {
            return Err(crate::DriverError::InvalidConfig(format!(
                "descriptors must be non-negative (input-fd={}, control-fd={})",
                self.input_fd, self.control_fd
            )));
        }
        if self.input_fd == self.control_fd {
            return Err(crate::DriverError::InvalidConfig(format!(
                "input-fd and control-fd must differ (both are {})",
                self.input_fd
            )));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            input_fd: DEFAULT_INPUT_FD,
            control_fd: DEFAULT_CONTROL_FD,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            done_tag: DEFAULT_DONE_TAG,
        }
    }
}
