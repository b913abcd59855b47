//! `strata check` — build and finalize a manifest's class graph.

use std::path::Path;

use anyhow::Context;
use strata_engine::ClassError;

use crate::manifest::{Manifest, ManifestError};

/// Outcome of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Classes registered, root included
    pub classes: usize,
    /// Implementations bound from `[implement]`
    pub implementations: usize,
}

/// Build and finalize `manifest`
pub fn check(manifest: &Manifest) -> Result<CheckReport, ManifestError> {
    let mut director = manifest.build()?;
    director.finalize_all()?;
    Ok(CheckReport {
        classes: director.len(),
        implementations: manifest.implement.values().map(Vec::len).sum(),
    })
}

/// Run `strata check`: load the manifest at `path` and report the outcome
pub fn execute(path: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;

    match check(&manifest) {
        Ok(report) => {
            println!(
                "ok: {} classes finalized, {} implementations bound",
                report.classes, report.implementations
            );
            Ok(())
        }
        Err(ManifestError::Class(ClassError::UnresolvedAbstractMember(unresolved))) => {
            eprintln!("error: {} unresolved abstract members", unresolved.len());
            for member in unresolved.iter() {
                eprintln!("  - {}", member);
            }
            anyhow::bail!("{} failed the check", path.display())
        }
        Err(e) => Err(e).with_context(|| format!("{} failed the check", path.display())),
    }
}
