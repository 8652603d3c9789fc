//! Sink for the `log` facade.
//!
//! The subsystem only emits records; the kernel decides where they go by
//! installing a `LockedLogger` around its console.

use core::{
    fmt::Write,
    sync::atomic::{AtomicUsize, Ordering},
};
use netmux_sync::IrqLock;

/// Logger writing one line per record into `W`.
pub struct LockedLogger<W> {
    writer: IrqLock<W>,
    level: log::LevelFilter,
    dropped: AtomicUsize,
}

impl<W: Write + Send> LockedLogger<W> {
    #[must_use]
    pub const fn new(writer: W, level: log::LevelFilter) -> Self {
        Self {
            writer: IrqLock::new(writer),
            level,
            dropped: AtomicUsize::new(0),
        }
    }

    #[must_use]
    /// Records that could not be written.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        self.writer.with_locked(f)
    }
}

impl<W: Write + Send> log::Log for LockedLogger<W> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // A record emitted while the writer is held (e.g. from an interrupt
        // handler) is dropped rather than deadlocking.
        let written = self
            .writer
            .try_with_locked(|writer| writeln!(writer, "[{:5}] {}", record.level(), record.args()))
            .is_some_and(|r| r.is_ok());
        if !written {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn flush(&self) {}
}

#[must_use]
pub const fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    }
}

/// Installs `logger` as the global logger.
pub fn init(logger: &'static dyn log::Log, level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Record};

    #[test]
    fn test_line_format() {
        let logger = LockedLogger::new(String::new(), LevelFilter::Info);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("netc: {} interface(s) attached", 2))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("e1000: link up"))
                .build(),
        );

        logger.with_writer(|out| {
            assert_eq!(out, "[INFO ] netc: 2 interface(s) attached\n");
        });
    }

    #[test]
    fn test_reentrant_record_is_dropped() {
        let logger = LockedLogger::new(String::new(), LevelFilter::Trace);

        logger.with_writer(|_| {
            logger.log(
                &Record::builder()
                    .level(Level::Warn)
                    .args(format_args!("e1000: reset did not complete"))
                    .build(),
            );
        });
        logger.with_writer(|out| assert!(out.is_empty()));
        assert_eq!(logger.dropped(), 1);
    }

    struct Full;

    impl Write for Full {
        fn write_str(&mut self, _: &str) -> core::fmt::Result {
            Err(core::fmt::Error)
        }
    }

    #[test]
    fn test_failing_writer() {
        let logger = LockedLogger::new(Full, LevelFilter::Info);
        for _ in 0..2 {
            logger.log(
                &Record::builder()
                    .level(Level::Error)
                    .args(format_args!("netc: no interface attached"))
                    .build(),
            );
        }
        assert_eq!(logger.dropped(), 2);
    }
}
