use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SleepDisabledParseError {
    #[error("SleepDisabled value was not found in pmset output.")]
    KeyNotFound,
    #[error("SleepDisabled value was missing in pmset output.")]
    ValueMissing,
    #[error("SleepDisabled value '{0}' was not recognized.")]
    InvalidValue(String),
}

const KEY: &str = "SleepDisabled";

/// Extract the `SleepDisabled` flag from `pmset -g` output.
///
/// Accepts `SleepDisabled 1`, `SleepDisabled: 1` and `SleepDisabled=1`; keys
/// that merely start with `SleepDisabled` are ignored.
pub fn parse_sleep_disabled(output: &str) -> Result<bool, SleepDisabledParseError> {
    for line in output.lines() {
        let Some(suffix) = line.trim().strip_prefix(KEY) else {
            continue;
        };
        if let Some(first) = suffix.chars().next()
            && !first.is_whitespace()
            && first != ':'
            && first != '='
        {
            continue;
        }

        let remainder = suffix.trim_start();
        let remainder = remainder
            .strip_prefix(':')
            .or_else(|| remainder.strip_prefix('='))
            .unwrap_or(remainder);

        return match remainder.split_whitespace().next() {
            None => Err(SleepDisabledParseError::ValueMissing),
            Some("1") => Ok(true),
            Some("0") => Ok(false),
            Some(other) => Err(SleepDisabledParseError::InvalidValue(other.to_string())),
        };
    }
    Err(SleepDisabledParseError::KeyNotFound)
}
