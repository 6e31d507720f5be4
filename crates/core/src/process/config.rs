//! Configuration for the process orchestrator.

use serde::{Deserialize, Serialize};

/// How a [`Process`](super::Process) discovers files and buffers work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Walk every root once at startup.
    #[serde(default)]
    pub scan: bool,

    /// Watch every root for newly created files until killed.
    #[serde(default)]
    pub watch: bool,

    /// Capacity of the job queue shared by all producers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Buffer size of each watcher's event stream.
    #[serde(default = "default_watch_buffer")]
    pub watch_buffer: usize,
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_watch_buffer() -> usize {
    16384
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            scan: false,
            watch: false,
            queue_capacity: default_queue_capacity(),
            watch_buffer: default_watch_buffer(),
        }
    }
}

impl ProcessConfig {
    /// Enables or disables the startup scan.
    pub fn with_scan(mut self, scan: bool) -> Self {
        self.scan = scan;
        self
    }

    /// Enables or disables watching.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Sets the job queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the watcher event buffer.
    pub fn with_watch_buffer(mut self, buffer: usize) -> Self {
        self.watch_buffer = buffer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessConfig::default();
        assert!(!config.scan);
        assert!(!config.watch);
        assert_eq!(config.queue_capacity, 4096);
        assert_eq!(config.watch_buffer, 16384);
    }

    #[test]
    fn test_config_builder() {
        let config = ProcessConfig::default()
            .with_scan(true)
            .with_watch(true)
            .with_queue_capacity(1)
            .with_watch_buffer(8);
        assert!(config.scan && config.watch);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.watch_buffer, 8);
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: ProcessConfig = toml::from_str("scan = true").unwrap();
        assert!(config.scan);
        assert_eq!(config.queue_capacity, 4096);
    }
}
