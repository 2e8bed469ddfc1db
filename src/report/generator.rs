use crate::domain::{format_hms, format_short, Ticket};
use crate::report::stats::{calculate_day_stats, DayStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

/// Format percentage with 1 decimal place
fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn share(part: Duration, total: Duration) -> f64 {
    if total > Duration::zero() {
        (part.num_seconds() as f64 / total.num_seconds() as f64) * 100.0
    } else {
        0.0
    }
}

/// Render the markdown report for one day
pub fn render_report(stats: &DayStats) -> String {
    let mut report = String::new();

    report.push_str(&format!("# Time Report - {}\n\n", stats.date));

    report.push_str("## Summary\n\n");
    report.push_str(&format!(
        "- **Total Time:** {} ({})\n",
        format_short(stats.total),
        format_hms(stats.total)
    ));
    report.push_str(&format!(
        "- **Tickets Worked:** {} (Done: {})\n",
        stats.tickets.len(),
        stats.done_count()
    ));
    if let Some(busiest) = stats.busiest() {
        report.push_str(&format!(
            "- **Most Time:** {} ({})\n",
            busiest.id,
            format_short(busiest.elapsed)
        ));
    }
    report.push('\n');

    if stats.tickets.is_empty() {
        report.push_str("No time tracked on this day.\n");
        return report;
    }

    report.push_str("## Tickets\n\n");
    for ticket in &stats.tickets {
        report.push_str(&format!("### {} [{}]\n\n", ticket.id, ticket.status.label()));
        if !ticket.comment.is_empty() {
            report.push_str(&format!("{}\n\n", ticket.comment));
        }

        report.push_str("| Item | Status | Time | Share |\n");
        report.push_str("|------|--------|------|-------|\n");
        report.push_str(&format!(
            "| **{}** | {} | {} | {} |\n",
            ticket.id,
            ticket.status.label(),
            format_hms(ticket.elapsed),
            format_percent(share(ticket.elapsed, stats.total))
        ));
        for todo in &ticket.todos {
            report.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                todo.title.replace('|', "\\|"),
                todo.status.label(),
                format_hms(todo.elapsed),
                format_percent(share(todo.elapsed, ticket.elapsed))
            ));
        }
        report.push('\n');
    }

    report
}

/// Generate and write the report for `date`; returns the written path
pub fn generate_report(
    tickets: &[Ticket],
    date: NaiveDate,
    now: DateTime<Local>,
    output: &Path,
) -> Result<PathBuf> {
    let stats = calculate_day_stats(tickets, date, now);
    let report = render_report(&stats);

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    fs::write(output, report)
        .with_context(|| format!("Failed to write report: {}", output.display()))?;

    log::info!("Report for {} written to {}", date, output.display());
    Ok(output.to_path_buf())
}
