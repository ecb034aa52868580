//! Kernel log sink.
//!
//! Records from the `log` facade are formatted into lines and written to
//! whichever [`Console`] was handed to [`init`]. Before that, records are
//! dropped.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;

use kivi_hal::Console;
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

lazy_static! {
    static ref CONSOLE: Mutex<Option<Box<dyn Console + Send>>> = Mutex::new(None);
}

struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = CONSOLE.lock().as_mut() {
            console.write_str(&format_line(record));
        }
    }

    fn flush(&self) {}
}

/// Warnings and errors carry their source location.
fn format_line(record: &Record) -> String {
    if record.level() < Level::Info {
        format!(
            "[{}][{}:{}]: {}\n",
            record.level(),
            record.file().unwrap_or("<none>"),
            record.line().unwrap_or_default(),
            record.args()
        )
    } else {
        format!("[{}]: {}\n", record.level(), record.args())
    }
}

/// Routes log output to `console` and sets the maximum level.
///
/// Calling this again swaps the console; the logger itself is only
/// registered once.
pub fn init<C>(console: C, level: LevelFilter)
where
    C: Console + Send + 'static,
{
    *CONSOLE.lock() = Some(Box::new(console));
    // Already registered by an earlier call.
    let _ = log::set_logger(&CONSOLE_LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::testutil::RecordingConsole;

    #[test]
    fn info_lines_are_bare() {
        let line = format_line(
            &Record::builder()
                .args(format_args!("booted {} services", 3))
                .level(Level::Info)
                .file(Some("kernel.rs"))
                .line(Some(70))
                .build(),
        );
        assert_eq!(line, "[INFO]: booted 3 services\n");
    }

    #[test]
    fn warnings_carry_their_location() {
        let line = format_line(
            &Record::builder()
                .args(format_args!("slow quantum"))
                .level(Level::Warn)
                .file(Some("sched.rs"))
                .line(Some(7))
                .build(),
        );
        assert_eq!(line, "[WARN][sched.rs:7]: slow quantum\n");
    }

    // The only test in this crate that installs the global logger.
    #[test]
    fn init_applies_the_configured_level() {
        let console = RecordingConsole::default();
        let lines = console.lines();
        let config = KernelConfig::default().with_log_level(LevelFilter::Warn);
        crate::init(console, &config);
        assert_eq!(log::max_level(), LevelFilter::Warn);

        log::info!("dropped");
        log::warn!("kept");
        let lines = lines.lock();
        assert!(!lines.iter().any(|l| l.contains("dropped")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("[WARN][") && l.ends_with("]: kept\n")));
    }
}
