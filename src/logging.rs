// Copyright (c) 2026 rezky_nightky

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

const LOG_FILE_NAME: &str = ".glyphrain-log";

pub fn default_log_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(LOG_FILE_NAME))
}

pub fn log_target(enabled: bool, explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| if enabled { default_log_path() } else { None })
}

pub fn init(path: &Path) -> io::Result<()> {
    let log_file = OpenOptions::new().create(true).append(true).open(path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp_micros()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("-------------");
    info!("starting glyphrain; this log is for development and debugging");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_even_without_flag() {
        let p = PathBuf::from("/tmp/rain.log");
        assert_eq!(log_target(false, Some(p.clone())), Some(p));
    }

    #[test]
    fn disabled_without_path_means_no_log() {
        assert_eq!(log_target(false, None), None);
    }

    #[test]
    fn enabled_uses_file_in_home() {
        if let Some(p) = log_target(true, None) {
            assert!(p.ends_with(LOG_FILE_NAME));
        }
    }
}
