use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Record};
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::Path;
use std::time::SystemTime;

const TARGET: &str = "brew_restore";

/// A single line written during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub level: Level,
    pub message: String,
}

/// Logging context for one run: a truncated log file that receives every
/// level, plus an env_logger console sink filtered at the chosen threshold.
///
/// Created once in `cli::run` and handed to each phase by `&mut`; call
/// [`RunLog::close`] before exiting so the file is flushed.
pub struct RunLog {
    file: Option<LineWriter<File>>,
    console: Option<env_logger::Logger>,
    entries: Vec<Entry>,
}

impl RunLog {
    pub fn open(path: &Path, console_level: LevelFilter) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
        let console = env_logger::Builder::new()
            .filter_level(console_level)
            .format(|buf, record| writeln!(buf, "{} - {} - {}", timestamp(), record.level(), record.args()))
            .build();
        Ok(Self { file: Some(LineWriter::new(file)), console: Some(console), entries: Vec::new() })
    }

    /// A context with no sinks; lines are only kept in memory.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self { file: None, console: None, entries: Vec::new() }
    }

    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        if let Some(file) = self.file.as_mut() {
            // A failing log write has nowhere better to be reported.
            let _ = writeln!(file, "{} - {} - {}", timestamp(), level, message);
        }
        if let Some(console) = &self.console {
            console.log(&Record::builder().args(format_args!("{message}")).level(level).target(TARGET).build());
        }
        self.entries.push(Entry { level, message });
    }

    pub fn error(&mut self, message: impl Into<String>) { self.log(Level::Error, message) }
    pub fn warn(&mut self, message: impl Into<String>) { self.log(Level::Warn, message) }
    pub fn info(&mut self, message: impl Into<String>) { self.log(Level::Info, message) }
    pub fn debug(&mut self, message: impl Into<String>) { self.log(Level::Debug, message) }

    #[cfg(test)]
    pub fn entries(&self) -> &[Entry] { &self.entries }

    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn close(mut self) -> Result<()> {
        if let Some(console) = &self.console { console.flush(); }
        if let Some(mut file) = self.file.take() {
            file.flush().context("flushing log file")?;
        }
        Ok(())
    }
}

/// `YYYY-MM-DD HH:MM:SS`, UTC.
fn timestamp() -> String {
    let rfc = humantime::format_rfc3339_seconds(SystemTime::now()).to_string();
    rfc.trim_end_matches('Z').replacen('T', " ", 1)
}
