use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::process::Command;

use crate::runlog::RunLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cask,
    Formula,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self { Category::Cask => "cask", Category::Formula => "formula" }
    }

    pub fn list_args(self) -> &'static [&'static str] {
        match self { Category::Cask => &["list", "--cask"], Category::Formula => &["list", "--formula"] }
    }

    pub fn install_args(self) -> &'static [&'static str] {
        match self { Category::Cask => &["install", "--cask"], Category::Formula => &["install"] }
    }
}

/// What an external command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool { self.code == Some(0) }
}

/// Runs a program with an argument vector and waits for it. Never goes through a shell.
pub trait Executor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let out = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("running '{}'", display_command(program, args)))?;
        Ok(CommandOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// Shell-quoted rendering of an argv, for log lines only.
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(|a| shell_escape::escape(Cow::from(a)).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identifiers currently installed for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledSet(HashSet<String>);

impl InstalledSet {
    /// Splits listing output on any whitespace.
    pub fn from_listing(stdout: &str) -> Self {
        Self(stdout.split_whitespace().map(str::to_string).collect())
    }

    pub fn contains(&self, id: &str) -> bool { self.0.contains(id) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[cfg(test)]
    pub fn insert(&mut self, id: impl Into<String>) -> bool { self.0.insert(id.into()) }
}

impl<S: Into<String>> FromIterator<S> for InstalledSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The brew executable plus the executor used to reach it.
pub struct Brew<E: Executor> {
    program: String,
    exec: E,
}

impl<E: Executor> Brew<E> {
    pub fn new(program: impl Into<String>, exec: E) -> Self {
        Self { program: program.into(), exec }
    }

    #[cfg(test)]
    pub fn executor(&self) -> &E { &self.exec }

    /// Runs the category's listing command. A failed query yields whatever
    /// stdout it produced (possibly nothing); the failure is only logged.
    pub fn installed(&self, category: Category, log: &mut RunLog) -> InstalledSet {
        let args = category.list_args();
        log.debug(format!("querying installed {} packages: {}", category.label(), display_command(&self.program, args)));
        match self.exec.run(&self.program, args) {
            Ok(out) => {
                if !out.success() {
                    log.warn(format!("Listing installed {} packages exited with {}: {}", category.label(), exit_label(out.code), out.stderr.trim()));
                }
                let set = InstalledSet::from_listing(&out.stdout);
                if set.is_empty() {
                    log.debug(format!("brew reported no installed {} packages", category.label()));
                } else {
                    log.debug(format!("{} installed {} packages", set.len(), category.label()));
                }
                set
            }
            Err(e) => {
                log.warn(format!("Could not list installed {} packages: {e:#}", category.label()));
                InstalledSet::default()
            }
        }
    }

    /// Runs `<install prefix> <id>` for the category.
    pub fn install(&self, category: Category, id: &str, log: &mut RunLog) -> Result<CommandOutput> {
        let mut args: Vec<&str> = category.install_args().to_vec();
        args.push(id);
        log.debug(format!("running: {}", display_command(&self.program, &args)));
        self.exec.run(&self.program, &args)
    }
}

pub fn exit_label(code: Option<i32>) -> String {
    match code { Some(c) => format!("exit code {c}"), None => "a signal".into() }
}
