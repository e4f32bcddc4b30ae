use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

/// Where log lines go. The controller swallows plugin stdout, so the file is
/// the main sink; stdout is opt-in for running a plugin by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub dir: String,
    pub stdout: bool,
    pub file_stem: String,
}

impl LogSettings {
    /// Resolves settings from the `--log-dir` flag and the `DECK_LOG_*`
    /// variables. A non-empty flag wins over the environment.
    pub fn from_sources<F>(flag_dir: &str, plugin_uuid: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let dir = if flag_dir.trim().is_empty() {
            non_empty("DECK_LOG_DIR").unwrap_or_default()
        } else {
            flag_dir.to_string()
        };
        Self {
            level: non_empty("DECK_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            dir,
            stdout: non_empty("DECK_LOG_STDOUT")
                .and_then(|value| parse_bool_env(&value))
                .unwrap_or(false),
            file_stem: format!("deck-plugin-{}", sanitize_component(plugin_uuid)),
        }
    }

    pub fn resolve(flag_dir: &str, plugin_uuid: &str) -> Self {
        Self::from_sources(flag_dir, plugin_uuid, |key| std::env::var(key).ok())
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        if self.dir.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.dir).join(format!("{}.log", self.file_stem)))
    }
}

type SharedFile = Arc<StdMutex<File>>;

/// Keeps the plugin's log file open for as long as the subscriber runs.
pub struct LogGuard {
    path: Option<PathBuf>,
    file: Option<SharedFile>,
}

impl LogGuard {
    /// Opens the log file in append mode, creating its directory. With no
    /// directory configured the guard holds nothing.
    pub fn open(settings: &LogSettings) -> io::Result<Self> {
        let Some(path) = settings.file_path() else {
            return Ok(Self::detached());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path: Some(path),
            file: Some(Arc::new(StdMutex::new(file))),
        })
    }

    fn detached() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn sink(&self, stdout: bool) -> LogSink {
        LogSink {
            stdout,
            file: self.file.clone(),
        }
    }
}

/// Fans each formatted event out to the log file and, when enabled, stdout.
#[derive(Clone)]
struct LogSink {
    stdout: bool,
    file: Option<SharedFile>,
}

impl LogSink {
    // write errors are dropped; there is nowhere left to report them
    fn each(&self, mut op: impl FnMut(&mut dyn Write) -> io::Result<()>) {
        if self.stdout {
            let _ = op(&mut io::stdout());
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = op(&mut *file);
            }
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.each(|out| out.write_all(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.each(|out| out.flush());
        Ok(())
    }
}

/// Installs the global subscriber. Returns `None` if one was already set. A
/// log file that cannot be opened is reported on stderr and skipped.
pub fn init_logging(settings: &LogSettings) -> Option<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));
    let guard = LogGuard::open(settings).unwrap_or_else(|err| {
        eprintln!("deck_log_file_error: {err}");
        LogGuard::detached()
    });
    let sink = guard.sink(settings.stdout);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(BoxMakeWriter::new(move || sink.clone()))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok()?;
    Some(guard)
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn flag_dir_wins_over_environment() {
        let settings = LogSettings::from_sources(
            "/tmp/flag",
            "com.example.plugin",
            lookup(&[("DECK_LOG_DIR", "/tmp/env"), ("DECK_LOG_STDOUT", "yes")]),
        );
        assert_eq!(settings.dir, "/tmp/flag");
        assert!(settings.stdout);
        assert_eq!(settings.level, "info");
    }

    #[test]
    fn environment_fills_gaps() {
        let settings = LogSettings::from_sources(
            "  ",
            "com.example/plugin",
            lookup(&[
                ("DECK_LOG_DIR", "/tmp/env"),
                ("DECK_LOG_LEVEL", "debug"),
                ("DECK_LOG_STDOUT", "maybe"),
            ]),
        );
        assert_eq!(settings.dir, "/tmp/env");
        assert_eq!(settings.level, "debug");
        assert!(!settings.stdout);
        assert_eq!(settings.file_stem, "deck-plugin-com.example_plugin");
    }

    #[test]
    fn no_dir_means_no_file() {
        let settings = LogSettings::from_sources("", "p", lookup(&[]));
        assert!(settings.file_path().is_none());
        let guard = LogGuard::open(&settings).expect("open");
        assert!(guard.path().is_none());
    }

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("logs");
        let settings = LogSettings::from_sources(
            nested.to_str().expect("utf8 path"),
            "com.example.plugin",
            lookup(&[]),
        );
        let guard = LogGuard::open(&settings).expect("open");
        let path = guard.path().expect("path").to_path_buf();
        assert_eq!(path, nested.join("deck-plugin-com.example.plugin.log"));

        let mut sink = guard.sink(false);
        sink.write_all(b"first\n").expect("write");
        sink.flush().expect("flush");
        let reopened = LogGuard::open(&settings).expect("reopen");
        reopened.sink(false).write_all(b"second\n").expect("write");

        let content = std::fs::read_to_string(path).expect("read");
        assert_eq!(content, "first\nsecond\n");
    }
}
