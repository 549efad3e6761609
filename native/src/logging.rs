// Console logging, crash reports and optional Sentry monitoring for the bridge.

use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

const LOG_DIR_NAME: &str = "X4NvdaBridge";
const CRASH_LOG_FILE: &str = "bridge_crash.log";

static CRASH_LOG_PATH: OnceCell<PathBuf> = OnceCell::new();
static SENTRY_GUARD: Mutex<Option<sentry::ClientInitGuard>> = Mutex::new(None);

/// Initialize env_logger. Defaults to `info` when RUST_LOG is unset.
pub fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Info);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    let _ = builder.try_init();
}

/// Enable Sentry when a DSN is configured. Returns whether it is active.
pub fn init_sentry(dsn: Option<&str>, environment: Option<&str>) -> bool {
    let Some(dsn) = dsn.filter(|d| !d.is_empty()) else {
        info!("[SENTRY] No DSN configured - monitoring disabled");
        return false;
    };

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: environment.map(|e| e.to_string().into()),
            attach_stacktrace: true,
            send_default_pii: false,
            auto_session_tracking: true,
            session_mode: sentry::SessionMode::Application,
            ..Default::default()
        },
    ));

    if !guard.is_enabled() {
        info!("[SENTRY] Client could not be enabled");
        return false;
    }

    match SENTRY_GUARD.lock() {
        Ok(mut slot) => {
            *slot = Some(guard);
            info!("[SENTRY] Monitoring enabled - Environment: {:?}", environment);
            true
        }
        Err(_) => false,
    }
}

pub fn is_sentry_enabled() -> bool {
    SENTRY_GUARD
        .lock()
        .map(|slot| slot.as_ref().is_some_and(|g| g.is_enabled()))
        .unwrap_or(false)
}

/// End the Sentry session and flush pending events.
pub fn shutdown_sentry() {
    let guard = SENTRY_GUARD.lock().ok().and_then(|mut slot| slot.take());
    if let Some(guard) = guard {
        info!("[SENTRY] Flushing events");
        drop(guard);
    }
}

fn report_to_sentry(context: &str, message: &str, level: sentry::Level) {
    if !is_sentry_enabled() {
        return;
    }

    sentry::with_scope(
        |scope| {
            scope.set_tag("context", context);
            scope.set_level(Some(level));
        },
        || {
            sentry::capture_message(message, level);
        },
    );
}

/// Report a failure that stops the bridge from serving the game.
pub fn capture_critical_error(context: &str, error: &str) {
    report_to_sentry(
        context,
        &format!("[CRITICAL] {}: {}", context, error),
        sentry::Level::Fatal,
    );
}

/// Record an error that ended a session in the crash log and Sentry.
pub fn log_critical_error(context: &str, error: &str) {
    report_to_sentry(context, error, sentry::Level::Error);

    let report = format_report(
        "CRITICAL ERROR",
        &[("Context", context.to_string()), ("Error", error.to_string())],
    );
    if let Err(e) = append_crash_log(&report) {
        error!("[CRASH LOGGER] Failed to write critical error: {}", e);
    }
}

/// Install a panic hook appending reports to `<local data>/X4NvdaBridge/bridge_crash.log`.
pub fn init_crash_logger() {
    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join(LOG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = fs::create_dir_all(&log_dir);

    let log_path = log_dir.join(CRASH_LOG_FILE);
    let _ = CRASH_LOG_PATH.set(log_path.clone());

    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Unknown panic payload".to_string());

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "Unknown location".to_string());

        let report = format_report(
            "BRIDGE PANIC",
            &[
                ("Location", location),
                ("Message", payload),
                (
                    "Backtrace",
                    format!("\n{}", std::backtrace::Backtrace::capture()),
                ),
            ],
        );

        if is_sentry_enabled() {
            sentry::capture_message(&report, sentry::Level::Fatal);
        }
        if let Err(e) = append_crash_log(&report) {
            error!("[CRASH LOGGER] Failed to write crash log: {}", e);
        }
        error!("\n{}", report);
    }));

    info!("[CRASH LOGGER] Writing crash reports to {:?}", log_path);
}

/// Crash log entry: a banner, a timestamp, the calling thread, then `entries`.
fn format_report(title: &str, entries: &[(&str, String)]) -> String {
    let mut report = format!(
        "===== {} =====\nTimestamp: {}\nThread: {}\n",
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        std::thread::current().name().unwrap_or("unnamed")
    );
    for (label, value) in entries {
        report.push_str(&format!("{}: {}\n", label, value));
    }
    report
}

fn append_crash_log(report: &str) -> std::io::Result<()> {
    if let Some(log_path) = CRASH_LOG_PATH.get() {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        writeln!(file, "{}", report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentry_stays_disabled_without_dsn() {
        assert!(!init_sentry(None, None));
        assert!(!init_sentry(Some(""), Some("test")));
        assert!(!is_sentry_enabled());
    }

    #[test]
    fn critical_errors_without_sinks_are_harmless() {
        capture_critical_error("Test", "nothing listening");
        log_critical_error("Test", "nothing listening");
    }

    #[test]
    fn report_lists_entries_after_header() {
        let report = format_report(
            "CRITICAL ERROR",
            &[
                ("Context", "Pipe Transport".to_string()),
                ("Error", "broken pipe".to_string()),
            ],
        );

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "===== CRITICAL ERROR =====");
        assert!(lines[1].starts_with("Timestamp: "));
        assert!(lines[2].starts_with("Thread: "));
        assert_eq!(lines[3], "Context: Pipe Transport");
        assert_eq!(lines[4], "Error: broken pipe");
    }
}
