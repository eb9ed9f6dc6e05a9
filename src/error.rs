use owo_colors::OwoColorize;
use resext::ResExt;
use strip_ansi_escapes::strip_str;
use time::macros::format_description;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::{Mutex, OnceCell},
};

ResExt! {
    pub enum CrawlError {
        Io(std::io::Error),
        Network(reqwest::Error),
        UrlParsing(url::ParseError),
        Regex(regex::Error),
        Json(serde_json::Error),
    }
}

/// A fetch returned no page: network failure or a non-success status.
/// Absorbed by the page-node factory; the owning strategy treats it as
/// "try another link".
#[derive(Debug, Clone)]
pub struct PageUnreachable {
    pub url: String,
    pub reason: String,
}

impl std::fmt::Display for PageUnreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page unreachable: {} ({})", self.url, self.reason)
    }
}

impl std::error::Error for PageUnreachable {}

/// DFS reached a node whose links are all tried and cannot backtrack
/// further. Not an error from the driver's perspective: it terminates the
/// crawl normally.
#[derive(Debug, Clone, Copy)]
pub struct LinkCapacityExhausted;

impl std::fmt::Display for LinkCapacityExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no more links to backtrack into")
    }
}

impl std::error::Error for LinkCapacityExhausted {}

/// A traversal strategy cannot make progress for a reason other than
/// normal exhaustion (e.g. a malformed frontier). Logged and treated as a
/// crawl-ending fault rather than a silent stop.
#[derive(Debug, Clone)]
pub struct StrategyFault(pub String);

impl std::fmt::Display for StrategyFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "strategy fault: {}", self.0)
    }
}

impl std::error::Error for StrategyFault {}

/// A result-store or blob-store write failed. Never fatal to the crawl
/// (spec §7): callers log it and carry on with in-memory state.
#[derive(Debug, Clone)]
pub struct PersistenceFault(pub String);

impl std::fmt::Display for PersistenceFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "persistence fault: {}", self.0)
    }
}

impl std::error::Error for PersistenceFault {}

/// Poll for a job id the store has never heard of, even after the grace
/// period. Surfaces as a 404 to an HTTP front end.
#[derive(Debug, Clone, Copy)]
pub struct JobUnknown(pub u64);

impl std::fmt::Display for JobUnknown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job {} is unknown", self.0)
    }
}

impl std::error::Error for JobUnknown {}

static LOGGER: OnceCell<Option<Mutex<File>>> = OnceCell::const_new();
static LOG_FILE_PATH: OnceCell<Option<std::path::PathBuf>> = OnceCell::const_new();

/// Must be called (at most once, before the first log line) to route
/// output to a file instead of stderr. Harmless to skip.
pub async fn set_log_file(path: Option<std::path::PathBuf>) {
    let _ = LOG_FILE_PATH.set(path);
}

async fn init_logger() -> &'static Option<Mutex<File>> {
    LOGGER
        .get_or_init(async || {
            let path = LOG_FILE_PATH.get().cloned().flatten();

            match path {
                Some(path) => OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .ok()
                    .map(Mutex::new),
                None => None,
            }
        })
        .await
}

const LOG_TIMESTAMP_FORMAT: &[time::format_description::BorrowedFormatItem] = format_description!(
    "[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second].[subsecond digits:3]"
);

fn timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .to_offset(time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC))
        .format(&LOG_TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| String::from("????-??-?? ??:??:??.???"))
}

/// Minimal structured logger in the teacher's style: timestamped lines,
/// either appended to a log file or printed (colored) to stderr.
pub trait Log {
    async fn log(&self, level: &'static str);
}

impl Log for str {
    async fn log(&self, level: &'static str) {
        let ts = timestamp();

        if let Some(file) = init_logger().await {
            let mut wtr = file.lock().await;
            let line = format!("{} {}:\n{}\n\n", ts, level, strip_str(self));
            let _ = wtr.write_all(line.as_bytes()).await;
            let _ = wtr.flush().await;
        } else {
            let colored_level = match level {
                "[ERROR]" | "[FATAL]" => level.red().bold().to_string(),
                "[WARN]" => level.yellow().to_string(),
                _ => level.purple().to_string(),
            };
            eprintln!("{} {}:\n{}\n", ts.bright_black(), colored_level, self);
        }
    }
}

impl Log for String {
    async fn log(&self, level: &'static str) {
        self.as_str().log(level).await
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! skip_on_none {
    ($opt:expr) => {
        match $opt {
            Some(v) => v,
            None => continue,
        }
    };
}
