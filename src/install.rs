use std::path::Path;

use crate::brew::{exit_label, Brew, Category, Executor, InstalledSet};
use crate::manifest::{Manifest, ManifestError};
use crate::runlog::RunLog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub already_installed: usize,
    pub installed: usize,
    pub failed: usize,
    pub dry_run: usize,
}

impl InstallReport {
    pub fn attempted(&self) -> usize { self.installed + self.failed }
}

/// Installs every manifest entry that is not in `installed`, one brew
/// invocation per entry, in file order. Per-package failures are logged and
/// never stop the pass.
pub fn install_packages<E: Executor>(
    log: &mut RunLog,
    brew: &Brew<E>,
    category: Category,
    list_file: &Path,
    installed: &InstalledSet,
    dry_run: bool,
) -> Result<InstallReport, ManifestError> {
    let label = category.label();
    let manifest = match Manifest::load(list_file) {
        Ok(m) => m,
        Err(e) => {
            match &e {
                ManifestError::Missing(_) => log.error(format!("No {label} list file found.")),
                ManifestError::Read { .. } => log.error(format!("Could not read {label} list file: {e}")),
            }
            return Err(e);
        }
    };

    log.info(format!("Installing {label} packages from {}...", list_file.display()));
    log.debug(format!("{} entries in {}", manifest.entry_count(), list_file.display()));
    let mut report = InstallReport::default();
    for package in manifest.iter() {
        if installed.contains(package) {
            log.info(format!("{package} is already installed."));
            report.already_installed += 1;
            continue;
        }
        if package.starts_with('-') {
            log.error(format!("Refusing to install {package}: identifiers must not start with '-'"));
            report.failed += 1;
            continue;
        }
        if dry_run {
            log.info(format!("Would install {package}."));
            report.dry_run += 1;
            continue;
        }

        log.info(format!("Installing {package}..."));
        match brew.install(category, package, log) {
            Ok(out) if out.success() => {
                log.info(format!("{package} installed successfully."));
                report.installed += 1;
            }
            Ok(out) => {
                log.debug(format!("brew install {package} failed with {}", exit_label(out.code)));
                log.error(format!("Error installing {package}: {}", out.stderr.trim_end()));
                report.failed += 1;
            }
            Err(e) => {
                log.error(format!("Error installing {package}: {e:#}"));
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brew::fake::FakeExecutor;
    use log::Level;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn manifest_file(dir: &tempfile::TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("brew-formula.txt");
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(&path, text).unwrap();
        path
    }

    fn errors(log: &RunLog) -> Vec<String> {
        log.entries().iter().filter(|e| e.level == Level::Error).map(|e| e.message.clone()).collect()
    }

    #[test]
    fn skips_installed_and_installs_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["wget", "curl"]);
        let brew = Brew::new("brew", FakeExecutor::new());
        let mut log = RunLog::detached();
        let installed = InstalledSet::from_iter(["curl"]);

        let report = install_packages(&mut log, &brew, Category::Formula, &path, &installed, false).unwrap();

        assert_eq!(brew.executor().install_calls(), ["wget"]);
        assert!(log.entries().iter().any(|e| e.message == "curl is already installed."));
        assert!(log.entries().iter().any(|e| e.message == "wget installed successfully."));
        assert_eq!(report, InstallReport { already_installed: 1, installed: 1, failed: 0, dry_run: 0 });
    }

    #[test]
    fn failure_logs_stderr_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["wget", "curl", "jq"]);
        let exec = FakeExecutor::new().respond("brew install wget", 1, "", "network error\n");
        let brew = Brew::new("brew", exec);
        let mut log = RunLog::detached();
        let installed = InstalledSet::from_iter(["curl"]);

        let report = install_packages(&mut log, &brew, Category::Formula, &path, &installed, false).unwrap();

        assert_eq!(errors(&log), ["Error installing wget: network error"]);
        assert!(log.entries().iter().any(|e| e.message == "curl is already installed."));
        assert_eq!(brew.executor().install_calls(), ["wget", "jq"]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.installed, 1);
    }

    #[test]
    fn cask_installs_use_cask_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["firefox"]);
        let brew = Brew::new("brew", FakeExecutor::new());
        let mut log = RunLog::detached();
        install_packages(&mut log, &brew, Category::Cask, &path, &InstalledSet::default(), false).unwrap();
        assert_eq!(brew.executor().calls.borrow()[0], ["brew", "install", "--cask", "firefox"]);
    }

    #[test]
    fn missing_manifest_is_one_error_and_no_installs() {
        let dir = tempfile::tempdir().unwrap();
        let brew = Brew::new("brew", FakeExecutor::new());
        let mut log = RunLog::detached();
        let res = install_packages(&mut log, &brew, Category::Cask, &dir.path().join("brew-cask.txt"), &InstalledSet::default(), false);
        assert!(matches!(res, Err(ManifestError::Missing(_))));
        assert_eq!(errors(&log), ["No cask list file found."]);
        assert!(brew.executor().calls.borrow().is_empty());
    }

    #[test]
    fn unavailable_executor_fails_each_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["wget", "jq"]);
        let brew = Brew::new("brew", FakeExecutor::unavailable());
        let mut log = RunLog::detached();
        let report = install_packages(&mut log, &brew, Category::Formula, &path, &InstalledSet::default(), false).unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(errors(&log).len(), 2);
    }

    #[test]
    fn option_like_identifier_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["--force", "wget"]);
        let brew = Brew::new("brew", FakeExecutor::new());
        let mut log = RunLog::detached();
        let report = install_packages(&mut log, &brew, Category::Formula, &path, &InstalledSet::default(), false).unwrap();
        assert_eq!(brew.executor().install_calls(), ["wget"]);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn dry_run_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_file(&dir, &["wget", "curl"]);
        let brew = Brew::new("brew", FakeExecutor::new());
        let mut log = RunLog::detached();
        let report = install_packages(&mut log, &brew, Category::Formula, &path, &InstalledSet::from_iter(["curl"]), true).unwrap();
        assert!(brew.executor().calls.borrow().is_empty());
        assert_eq!(report.dry_run, 1);
        assert!(log.entries().iter().any(|e| e.message == "Would install wget."));
    }

    fn ident() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9@.+_-]{0,8}"
    }

    proptest! {
        #[test]
        fn one_invocation_per_missing_entry(
            manifest in proptest::collection::vec(ident(), 0..12),
            installed in proptest::collection::btree_set(ident(), 0..12),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let refs: Vec<&str> = manifest.iter().map(String::as_str).collect();
            let path = manifest_file(&dir, &refs);
            let brew = Brew::new("brew", FakeExecutor::new());
            let mut log = RunLog::detached();
            let set: InstalledSet = installed.iter().cloned().collect();

            install_packages(&mut log, &brew, Category::Formula, &path, &set, false).unwrap();

            let expected: Vec<String> = manifest.iter().filter(|m| !installed.contains(m.as_str())).cloned().collect();
            prop_assert_eq!(brew.executor().install_calls(), expected);
        }

        #[test]
        fn second_pass_is_a_no_op(
            manifest in proptest::collection::vec(ident(), 0..12),
            installed in proptest::collection::btree_set(ident(), 0..6),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let refs: Vec<&str> = manifest.iter().map(String::as_str).collect();
            let path = manifest_file(&dir, &refs);
            let mut log = RunLog::detached();

            let first = Brew::new("brew", FakeExecutor::new());
            let mut set: InstalledSet = installed.iter().cloned().collect();
            install_packages(&mut log, &first, Category::Formula, &path, &set, false).unwrap();
            let succeeded: BTreeSet<String> = first.executor().install_calls().into_iter().collect();
            for id in succeeded { set.insert(id); }

            let second = Brew::new("brew", FakeExecutor::new());
            install_packages(&mut log, &second, Category::Formula, &path, &set, false).unwrap();
            prop_assert!(second.executor().install_calls().is_empty());
        }
    }
}
