//! Table formatting utilities for CLI output.

use std::fmt::Write;

use prefill_download::{AppOutcome, PrefillSummary};

const NAME_WIDTH: usize = 32;
const TABLE_WIDTH: usize = 72;

/// Truncates a string to a maximum length, adding "..." if needed.
///
/// # Examples
///
/// ```rust
/// use prefill_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Human-readable byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn outcome_cell(outcome: &AppOutcome) -> String {
    match outcome {
        AppOutcome::Updated { bytes_transferred } => {
            format!("updated ({})", format_bytes(*bytes_transferred))
        }
        other => other.to_string(),
    }
}

/// Per-app rows followed by run totals.
pub fn render_summary(summary: &PrefillSummary) -> String {
    let mut out = String::new();
    let rule = "-".repeat(TABLE_WIDTH);

    let _ = writeln!(out, "{:<10} {:<NAME_WIDTH$} Result", "App", "Name");
    let _ = writeln!(out, "{rule}");
    for app in &summary.apps {
        let name = app.name.as_deref().unwrap_or("?");
        let _ = writeln!(
            out,
            "{:<10} {:<NAME_WIDTH$} {}",
            app.app_id.to_string(),
            truncate_string(name, NAME_WIDTH),
            outcome_cell(&app.outcome)
        );
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Updated: {}  Up to date: {}  Failed: {}  Not owned: {}  Downloaded: {}",
        summary.updated,
        summary.up_to_date,
        summary.failed,
        summary.unowned_skipped,
        format_bytes(summary.bytes_transferred)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefill_core::AppId;
    use prefill_download::AppReport;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_string("Ünïcödé Game", 8), "Ünïcö...");
    }

    #[test]
    fn summary_lists_apps_and_totals() {
        let summary = PrefillSummary {
            updated: 1,
            up_to_date: 1,
            failed: 0,
            unowned_skipped: 0,
            bytes_transferred: 2048,
            apps: vec![
                AppReport {
                    app_id: AppId(730),
                    name: Some("Counter-Strike 2".to_string()),
                    outcome: AppOutcome::Updated {
                        bytes_transferred: 2048,
                    },
                },
                AppReport {
                    app_id: AppId(440),
                    name: None,
                    outcome: AppOutcome::AlreadyUpToDate,
                },
            ],
        };

        let table = render_summary(&summary);

        assert!(table.contains("Counter-Strike 2"));
        assert!(table.contains("updated (2.00 KiB)"));
        assert!(table.contains("up to date"));
        assert!(table.contains("Updated: 1  Up to date: 1"));
    }
}
