//! End-of-run summary table

use crate::config::RunMode;
use crate::pipeline::RunSummary;
use crate::ui::{theme, Theme};
use owo_colors::OwoColorize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn rows(summary: &RunSummary) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    let mut add = |metric, value: String| rows.push(SummaryRow { metric, value });

    let mode = match summary.mode {
        RunMode::Fix => "fix".to_string(),
        RunMode::Dump(filter) => format!("dump ({})", filter.as_str()),
    };
    add("Mode", mode);
    add("Files", summary.discovered.to_string());
    add("Parsed", summary.parsed.to_string());

    match summary.mode {
        RunMode::Fix => {
            add("Rewritten", summary.fixed.to_string());
            add("Renamed declarations", summary.renamed.to_string());
        }
        RunMode::Dump(_) => {
            let stats = summary.collected;
            add("Valid identifiers", stats.valid.to_string());
            add("Missing identifiers", stats.missing.to_string());
            add("Recorded", stats.recorded.to_string());
        }
    }

    add("Store entries loaded", summary.store_loaded.to_string());
    if let Some(saved) = summary.store_saved {
        add("Store entries saved", saved.to_string());
    }
    add("Failed", summary.failures.len().to_string());
    add("Time", format!("{:.2?}", summary.elapsed));
    rows
}

/// Summary table followed by one line per failed file
pub fn render_summary(summary: &RunSummary, theme: &Theme) -> String {
    let mut out = Table::new(rows(summary)).with(Style::rounded()).to_string();
    out.push('\n');

    if summary.is_success() {
        out.push_str(&format!("{}\n", "All files processed".style(theme.success.clone())));
    } else {
        out.push_str(&format!(
            "{}\n",
            format!("{} file(s) failed", summary.failures.len()).style(theme.error.clone())
        ));
        for (path, message) in &summary.failures {
            out.push_str(&format!(
                "  {} {}\n",
                path.display().style(theme.path.clone()),
                message.style(theme.muted.clone())
            ));
        }
    }
    out
}

/// Print the summary on stderr
pub fn print_summary(summary: &RunSummary) {
    eprint!("{}", render_summary(summary, theme()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::DumpFilter;
    use std::path::PathBuf;

    #[test]
    fn test_fix_summary_lists_failures() {
        let summary = RunSummary {
            discovered: 3,
            parsed: 2,
            fixed: 2,
            failures: vec![(PathBuf::from("src/Bad.java"), "syntax error".to_string())],
            ..RunSummary::default()
        };
        let text = render_summary(&summary, &Theme::plain());
        assert!(text.contains("Rewritten"));
        assert!(text.contains("1 file(s) failed"));
        assert!(text.contains("src/Bad.java syntax error"));
        assert!(!text.contains("Recorded"));
    }

    #[test]
    fn test_dump_summary() {
        let summary = RunSummary {
            mode: RunMode::Dump(DumpFilter::Missing),
            store_saved: Some(12),
            ..RunSummary::default()
        };
        let text = render_summary(&summary, &Theme::plain());
        assert!(text.contains("dump (missing)"));
        assert!(text.contains("Store entries saved"));
        assert!(text.contains("All files processed"));
    }
}
