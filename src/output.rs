//! CLI output formatting.
//!
//! # Page-First Display
//!
//! Reports are organised by page, not by file. Each page is headed by the
//! URL path it is served from and the kind the router detected; the file it
//! came from follows as an indented `Source:` line.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! 001 /contact.html (contact)
//!     Source: contact.html
//!     sticky-header: 1
//!     forms: 1
//!     phone-tracking: 3
//!     Inactive: reveal, carousel, counters
//! 002 /index.html (home)
//!     Source: index.html
//!     ...
//!
//! Checked 2 pages: 1 contact, 1 home
//! ```
//!
//! ## Startup
//!
//! Written to stderr by `render`, so the rendered HTML on stdout stays clean.
//!
//! ```text
//! sticky-header: 1 registration
//! carousel: failed (DOM error: ...)
//! Started 16 components, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes it out. Format functions
//! are pure.

use crate::app::{PageAudit, Startup};
use crate::router::PageKind;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Page kinds in a stable order with their counts, skipping absent kinds.
fn kind_counts(audits: &[PageAudit]) -> Vec<(PageKind, usize)> {
    const ORDER: [PageKind; 6] = [
        PageKind::Home,
        PageKind::Service,
        PageKind::Area,
        PageKind::Contact,
        PageKind::Blog,
        PageKind::Other,
    ];
    ORDER
        .into_iter()
        .map(|kind| (kind, audits.iter().filter(|a| a.kind == kind).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

// ============================================================================
// Check
// ============================================================================

/// Format the markup audit of a site directory.
pub fn format_check_output(audits: &[PageAudit]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, audit) in audits.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            audit.url_path,
            audit.kind
        ));
        lines.push(format!("{}Source: {}", indent(1), audit.path.display()));
        for (name, count) in audit.matches.iter().filter(|(_, n)| *n > 0) {
            lines.push(format!("{}{}: {}", indent(1), name, count));
        }
        let inactive: Vec<&str> = audit.inactive().collect();
        if !inactive.is_empty() {
            lines.push(format!("{}Inactive: {}", indent(1), inactive.join(", ")));
        }
    }

    if !audits.is_empty() {
        lines.push(String::new());
    }
    let kinds: Vec<String> = kind_counts(audits)
        .into_iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect();
    let summary = format!("Checked {}", plural(audits.len(), "page", "pages"));
    if kinds.is_empty() {
        lines.push(summary);
    } else {
        lines.push(format!("{summary}: {}", kinds.join(", ")));
    }
    lines
}

pub fn print_check_output(audits: &[PageAudit]) {
    for line in format_check_output(audits) {
        println!("{}", line);
    }
}

// ============================================================================
// Startup
// ============================================================================

/// Format per-component startup results.
pub fn format_startup(startup: &Startup) -> Vec<String> {
    let mut lines: Vec<String> = startup
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(count) => format!(
                "{}: {}",
                outcome.component,
                plural(*count, "registration", "registrations")
            ),
            Err(err) => format!("{}: failed ({})", outcome.component, err),
        })
        .collect();
    lines.push(format!(
        "Started {}, {} failed",
        plural(startup.outcomes.len(), "component", "components"),
        startup.failures().count()
    ));
    lines
}

pub fn print_startup(startup: &Startup) {
    for line in format_startup(startup) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Outcome;
    use crate::context::UiError;
    use crate::events::Teardown;
    use std::path::PathBuf;

    fn audit(path: &str, kind: PageKind, matches: &[(&'static str, usize)]) -> PageAudit {
        PageAudit {
            path: PathBuf::from(path),
            url_path: format!("/{path}"),
            kind,
            matches: matches.to_vec(),
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn index_is_zero_padded() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "page", "pages"), "1 page");
        assert_eq!(plural(0, "page", "pages"), "0 pages");
    }

    // =========================================================================
    // Check output tests
    // =========================================================================

    #[test]
    fn check_lists_active_and_inactive_components() {
        let audits = vec![audit(
            "contact.html",
            PageKind::Contact,
            &[("sticky-header", 1), ("carousel", 0), ("forms", 1), ("counters", 0)],
        )];
        let lines = format_check_output(&audits);
        assert_eq!(
            lines,
            vec![
                "001 /contact.html (contact)",
                "    Source: contact.html",
                "    sticky-header: 1",
                "    forms: 1",
                "    Inactive: carousel, counters",
                "",
                "Checked 1 page: 1 contact",
            ]
        );
    }

    #[test]
    fn check_summary_counts_kinds_in_order() {
        let audits = vec![
            audit("blog/a.html", PageKind::Blog, &[("router", 1)]),
            audit("index.html", PageKind::Home, &[("router", 1)]),
            audit("blog/b.html", PageKind::Blog, &[("router", 1)]),
        ];
        let lines = format_check_output(&audits);
        assert_eq!(lines.last().unwrap(), "Checked 3 pages: 1 home, 2 blog");
        assert!(!lines.iter().any(|l| l.contains("Inactive")));
    }

    #[test]
    fn check_empty_directory() {
        assert_eq!(format_check_output(&[]), vec!["Checked 0 pages"]);
    }

    // =========================================================================
    // Startup output tests
    // =========================================================================

    #[test]
    fn startup_reports_each_component() {
        let startup = Startup {
            teardown: Teardown::new(),
            outcomes: vec![
                Outcome {
                    component: "sticky-header",
                    result: Ok(1),
                },
                Outcome {
                    component: "carousel",
                    result: Err(UiError::Invalid("no slides".into())),
                },
                Outcome {
                    component: "schema",
                    result: Ok(0),
                },
            ],
        };
        let lines = format_startup(&startup);
        assert_eq!(
            lines,
            vec![
                "sticky-header: 1 registration",
                "carousel: failed (no slides)",
                "schema: 0 registrations",
                "Started 3 components, 1 failed",
            ]
        );
    }
}
