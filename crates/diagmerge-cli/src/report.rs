//! Terminal summary of a run

use crate::run::RunReport;
use colored::*;
use diagmerge_types::{ResolveError, Subsystem};
use std::fmt::Write;

/// Per-subsystem additions and missing diagnostics, then the files written.
pub fn render(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "{}", "diagmerge summary".bold());

    for subsystem in Subsystem::ALL {
        let added = summary.added(subsystem);
        let missing = summary.missing(subsystem);
        let _ = writeln!(
            out,
            "  {:<11} {} added, {} missing",
            subsystem.to_string(),
            added.len().to_string().green(),
            missing.len().to_string().yellow()
        );
        for name in added {
            let _ = writeln!(out, "    {} {}", "+".green(), name);
        }
        for name in missing {
            let _ = writeln!(out, "    {} {}", "?".yellow(), name);
        }
    }

    if !report.added_codes.is_empty() {
        let _ = writeln!(
            out,
            "  {} STASH request records added",
            report.added_codes.len().to_string().green()
        );
    }
    let _ = writeln!(
        out,
        "  {} requests already satisfied",
        summary.already_present().to_string().dimmed()
    );
    for path in &report.written {
        let _ = writeln!(out, "{} {}", "✓".green(), path.display());
    }
    out
}

/// Print a fatal resolution error and the configuration that fixes it
pub fn print_fatal(err: &ResolveError) {
    eprintln!("{} {}", "✗".red(), err);
    if let Some(remedy) = err.remedy() {
        eprintln!("\n{}\n", "To resolve, then re-run:".bold());
        eprintln!("{}", remedy);
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}
