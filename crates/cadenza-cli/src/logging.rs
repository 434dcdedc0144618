//! Logger setup for the command-line tools.

use anyhow::{Context, Result};
use log::Level;

/// Log level for a count of `-v` flags.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    }
}

/// Installs the process-wide logger.
pub fn init(verbosity: u8) -> Result<()> {
    simple_logger::init_with_level(level_for(verbosity)).context("Failed to install logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), Level::Info);
        assert_eq!(level_for(1), Level::Debug);
        assert_eq!(level_for(2), Level::Trace);
        assert_eq!(level_for(9), Level::Trace);
    }
}
