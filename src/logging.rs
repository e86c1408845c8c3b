use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug)]
struct FileLogger {
    log_path: PathBuf,
    level: LevelFilter,
}

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let log_entry = format!(
                "[{}] {} {} - {}\n",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            );

            if let Ok(mut file) = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
            {
                let _ = file.write_all(log_entry.as_bytes());
            }
        }
    }

    fn flush(&self) {}
}

/// Installs the file logger writing to `<data_dir>/log.txt`.
///
/// The terminal belongs to the UI, so nothing is ever logged to stdout.
pub fn init(data_dir: PathBuf, debug: bool) -> Result<(), SetLoggerError> {
    let _ = create_dir_all(&data_dir);
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let logger = LOGGER.get_or_init(|| FileLogger {
        log_path: data_dir.join("log.txt"),
        level,
    });

    log::set_logger(logger).map(|()| log::set_max_level(level))
}
