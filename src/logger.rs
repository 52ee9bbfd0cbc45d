//! Session log for the board tools.
//!
//! Every run truncates `pixelboard.log` in the platform data directory:
//!   Linux:    `$XDG_DATA_HOME/PixelBoard/` (or `~/.local/share/PixelBoard/`)
//!   Windows:  `%APPDATA%\PixelBoard\`
//!   macOS:    `~/Library/Application Support/PixelBoard/`
//!
//! Lines carry the current context (the batch input being processed) so
//! a log from a long batch run can be read per file:
//!
//! ```text
//! [12:04:55] [WARN] [cat.png] Discarding stale conversion #3
//! ```
//!
//! Until [`init`] runs (library use, tests) nothing is written anywhere.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

static SINK: OnceLock<Mutex<File>> = OnceLock::new();
static SINK_PATH: OnceLock<PathBuf> = OnceLock::new();
static CONTEXT: Mutex<Option<String>> = Mutex::new(None);
static ECHO_PROBLEMS: AtomicBool = AtomicBool::new(false);

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Open (truncating) the session log and hook panics into it.  Failure to
/// open the file leaves logging disabled.
pub fn init() {
    let path = data_dir().join("PixelBoard").join("pixelboard.log");
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    let _ = SINK.set(Mutex::new(file));
    let _ = SINK_PATH.set(path);

    append(&format!(
        "=== PixelBoard {} started (unix {}) ===",
        env!("CARGO_PKG_VERSION"),
        unix_seconds()
    ));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let ctx = current_context();
        append(&format_line(&timestamp(), "PANIC", ctx.as_deref(), &info.to_string()));
        prev(info);
    }));
}

/// Where this run's log lives, once [`init`] succeeded.
pub fn log_path() -> Option<&'static PathBuf> {
    SINK_PATH.get()
}

/// Also print warnings and errors to stderr (CLI `--verbose`).
pub fn set_echo(enabled: bool) {
    ECHO_PROBLEMS.store(enabled, Ordering::Relaxed);
}

/// Tag subsequent lines with `context` (an input file name), or
/// clear the tag with `None`.
pub fn set_context(context: Option<String>) {
    if let Ok(mut slot) = CONTEXT.lock() {
        *slot = context;
    }
}

pub fn current_context() -> Option<String> {
    CONTEXT.lock().ok().and_then(|slot| slot.clone())
}

pub fn write(level: Level, msg: &str) {
    let line = format_line(&timestamp(), level.tag(), current_context().as_deref(), msg);
    if level >= Level::Warn && ECHO_PROBLEMS.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    append(&line);
}

fn format_line(ts: &str, tag: &str, context: Option<&str>, msg: &str) -> String {
    match context {
        Some(ctx) => format!("[{}] [{}] [{}] {}", ts, tag, ctx, msg),
        None => format!("[{}] [{}] {}", ts, tag, msg),
    }
}

fn append(line: &str) {
    if let Some(sink) = SINK.get()
        && let Ok(mut file) = sink.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// UTC wall clock, HH:MM:SS.
fn timestamp() -> String {
    let secs = unix_seconds();
    format!(
        "{:02}:{:02}:{:02}",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_level_and_context() {
        assert_eq!(
            format_line("01:02:03", Level::Warn.tag(), Some("cat.png"), "bad color"),
            "[01:02:03] [WARN] [cat.png] bad color"
        );
        assert_eq!(
            format_line("01:02:03", Level::Info.tag(), None, "ready"),
            "[01:02:03] [INFO] ready"
        );
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Error > Level::Warn);
        assert!(Level::Warn > Level::Info);
    }

    #[test]
    fn writes_before_init_are_dropped() {
        write(Level::Info, "nothing to see");
        crate::log_warn!("formatted {}", 42);
    }

    #[test]
    fn timestamp_is_clock_shaped() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[5..6], ":");
    }
}
