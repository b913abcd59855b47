//! `strata dump` — print merged member tables.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use strata_engine::{BuildDirector, ClassRecord, Member};

use crate::manifest::Manifest;

/// Render one class: header line, then one line per merged member
pub fn render_class(class: &ClassRecord) -> String {
    let mut out = String::new();
    let bases: Vec<&str> = class.bases().iter().map(|b| b.type_name()).collect();
    let _ = write!(out, "class {} {}", class.type_name(), class.class_id());
    if !bases.is_empty() {
        let _ = write!(out, " : {}", bases.join(", "));
    }
    if class.is_finalized() {
        out.push_str(if class.is_sealed() { " [sealed]" } else { " [open]" });
    } else {
        out.push_str(" [building]");
    }
    out.push('\n');

    for (name, entry) in class.members() {
        let state = match &entry.member {
            Some(Member::Method(_)) => "method".to_string(),
            Some(Member::Constant(value)) => format!("const = {}", value),
            None => "pending".to_string(),
        };
        let _ = write!(out, "  {:<16} {:<24} from {}", name, state, entry.origin);
        let attributes = entry.attributes.describe();
        if !attributes.is_empty() {
            let _ = write!(out, " ({})", attributes);
        }
        out.push('\n');
    }
    out
}

/// Render `only` or every class of `director`
pub fn render(director: &BuildDirector, only: Option<&str>) -> anyhow::Result<String> {
    match only {
        Some(name) => {
            let class = director
                .class(name)
                .with_context(|| format!("no class named '{}'", name))?;
            Ok(render_class(class))
        }
        None => Ok(director
            .classes()
            .map(|class| render_class(class))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Run `strata dump`: print `class`, or every class, of the manifest at `path`
pub fn execute(path: &Path, class: Option<&str>) -> anyhow::Result<()> {
    let manifest = Manifest::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let mut director = manifest.build()?;

    // Unresolved members still dump, shown as pending.
    if let Err(e) = director.finalize_all() {
        tracing::warn!(error = %e, "class graph did not finalize");
    }

    print!("{}", render(&director, class)?);
    Ok(())
}
