use std::collections::BTreeSet;
use std::path::Path;

use crate::brew::{Brew, Category, Executor};
use crate::manifest::{Manifest, ManifestError};
use crate::runlog::RunLog;

/// Re-queries brew and reports manifest entries that are still not installed.
/// Read-only: discrepancies are logged, never reinstalled.
pub fn verify_installation<E: Executor>(
    log: &mut RunLog,
    brew: &Brew<E>,
    category: Category,
    list_file: &Path,
) -> Result<BTreeSet<String>, ManifestError> {
    let label = category.label();
    log.info(format!("Verifying installed {label} packages..."));
    let current = brew.installed(category, log);
    let expected = match Manifest::load(list_file) {
        Ok(m) => m,
        Err(e) => {
            match &e {
                ManifestError::Missing(_) => log.error(format!("No {label} list file found for verification.")),
                ManifestError::Read { .. } => log.error(format!("Could not read {label} list file for verification: {e}")),
            }
            return Err(e);
        }
    };

    let discrepancies = expected.missing_from(&current);
    if discrepancies.is_empty() {
        log.info(format!("All {label} packages are installed correctly."));
    } else {
        let listed = discrepancies.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        log.error(format!("Discrepancies found in {label} package installation: {listed}"));
    }
    Ok(discrepancies)
}
