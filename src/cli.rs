use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{Level, LevelFilter};

use crate::brew::{Brew, Category, Executor, SystemExecutor};
use crate::config::{self, Config};
use crate::install::{install_packages, InstallReport};
use crate::manifest::ManifestError;
use crate::runlog::RunLog;
use crate::verify::verify_installation;

#[derive(Parser, Debug)]
#[command(name = "brew-restore", version, about = "Reinstall Homebrew packages and verify installation.")]
pub struct Cli {
    /// Path to the cask list file [default: brew-cask.txt]
    #[arg(long)]
    cask_file: Option<PathBuf>,
    /// Path to the formula list file [default: brew-formula.txt]
    #[arg(long)]
    formula_file: Option<PathBuf>,
    /// Install only casks
    #[arg(long, default_value_t = false)]
    casks_only: bool,
    /// Install only formulas
    #[arg(long, default_value_t = false)]
    formulas_only: bool,
    /// brew executable to run [default: brew]
    #[arg(long)]
    brew: Option<String>,
    /// Log file, overwritten each run [default: brew_reinstall.log]
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Console log level (the log file always gets everything)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    /// Query and verify, but do not install anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Config file [default: $XDG_CONFIG_HOME/brew-restore/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel { Trace, Debug, Info, Warn, Error }

fn level_filter(level: Option<LogLevel>) -> LevelFilter {
    match level.unwrap_or(LogLevel::Info) {
        LogLevel::Trace => LevelFilter::Trace,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Error => LevelFilter::Error,
    }
}

/// Which categories a run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection { CasksOnly, FormulasOnly, Both }

impl Selection {
    /// `--casks-only` wins when both flags are given.
    pub fn from_flags(casks_only: bool, formulas_only: bool) -> Self {
        if casks_only { Selection::CasksOnly } else if formulas_only { Selection::FormulasOnly } else { Selection::Both }
    }

    fn categories(self) -> &'static [Category] {
        match self {
            Selection::CasksOnly => &[Category::Cask],
            Selection::FormulasOnly => &[Category::Formula],
            Selection::Both => &[Category::Cask, Category::Formula],
        }
    }
}

/// Everything a run needs once flags and config are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub selection: Selection,
    pub cask_file: PathBuf,
    pub formula_file: PathBuf,
    pub dry_run: bool,
}

impl Plan {
    fn list_file(&self, category: Category) -> &Path {
        match category { Category::Cask => &self.cask_file, Category::Formula => &self.formula_file }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let (cfg, cfg_err) = match config::load_config(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_file = cli.log_file.clone().or_else(|| cfg.log_file.clone()).unwrap_or_else(|| config::DEFAULT_LOG_FILE.into());
    let mut log = RunLog::open(&log_file, level_filter(cli.log_level))?;
    if let Some(e) = cfg_err {
        log.warn(format!("Ignoring config file: {e:#}"));
    }
    if cli.casks_only && cli.formulas_only {
        log.warn("Both --casks-only and --formulas-only given; processing casks only.");
    }

    let plan = Plan {
        selection: Selection::from_flags(cli.casks_only, cli.formulas_only),
        cask_file: cli.cask_file.clone().or_else(|| cfg.cask_file.clone()).unwrap_or_else(|| config::DEFAULT_CASK_FILE.into()),
        formula_file: cli.formula_file.clone().or_else(|| cfg.formula_file.clone()).unwrap_or_else(|| config::DEFAULT_FORMULA_FILE.into()),
        dry_run: cli.dry_run,
    };
    log.debug(format!("plan: {plan:?}"));

    let brew_name = cli.brew.clone().or_else(|| cfg.brew.clone()).unwrap_or_else(|| config::DEFAULT_BREW.into());
    let brew = Brew::new(resolve_brew(&brew_name, &mut log), SystemExecutor);

    reinstall(&mut log, &brew, &plan);

    log.info("Reinstallation complete!");
    let errors = log.count(Level::Error);
    if errors > 0 {
        log.info(format!("{errors} error line(s) logged; see {}", log_file.display()));
    }
    log.close()
}

/// Bare names are looked up on PATH; explicit paths are used as given.
fn resolve_brew(name: &str, log: &mut RunLog) -> String {
    if name.contains(std::path::MAIN_SEPARATOR) {
        return name.to_string();
    }
    match which::which(name) {
        Ok(path) => {
            log.debug(format!("using {} at {}", name, path.display()));
            path.to_string_lossy().into_owned()
        }
        Err(_) => {
            log.warn(format!("'{name}' not found on PATH; brew commands will fail"));
            name.to_string()
        }
    }
}

/// Snapshot installed sets, run every install phase, then every verify phase.
pub fn reinstall<E: Executor>(log: &mut RunLog, brew: &Brew<E>, plan: &Plan) {
    let categories = plan.selection.categories();
    let snapshots: Vec<_> = [Category::Cask, Category::Formula]
        .into_iter()
        .map(|c| (c, brew.installed(c, log)))
        .collect();

    for (category, installed) in snapshots.iter().filter(|(c, _)| categories.contains(c)) {
        match install_packages(log, brew, *category, plan.list_file(*category), installed, plan.dry_run) {
            Ok(report) => log_report(log, *category, &report),
            Err(e) => skipped(log, "install", *category, &e),
        }
    }
    for category in categories {
        if let Err(e) = verify_installation(log, brew, *category, plan.list_file(*category)) {
            skipped(log, "verify", *category, &e);
        }
    }
}

fn log_report(log: &mut RunLog, category: Category, report: &InstallReport) {
    log.debug(format!(
        "{} install pass: {} attempted, {} installed, {} failed, {} already installed, {} dry-run",
        category.label(), report.attempted(), report.installed, report.failed, report.already_installed, report.dry_run
    ));
}

fn skipped(log: &mut RunLog, phase: &str, category: Category, e: &ManifestError) {
    log.debug(format!("{} {phase} phase skipped: {e}", category.label()));
}
