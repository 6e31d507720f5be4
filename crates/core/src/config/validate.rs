use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Job queue capacity and watch buffer are not 0
/// - Converter and exiftool timeouts are not 0
/// - exiftool has at least one date tag to read
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let checks = [
        (config.process.queue_capacity == 0, "process.queue_capacity cannot be 0"),
        (config.process.watch_buffer == 0, "process.watch_buffer cannot be 0"),
        (config.converter.timeout_secs == 0, "converter.timeout_secs cannot be 0"),
        (config.exiftool.timeout_secs == 0, "exiftool.timeout_secs cannot be 0"),
        (config.exiftool.date_tags.is_empty(), "exiftool.date_tags cannot be empty"),
    ];

    match checks.iter().find(|(failed, _)| *failed) {
        Some((_, reason)) => Err(ConfigError::ValidationError(reason.to_string())),
        None => Ok(()),
    }
}
