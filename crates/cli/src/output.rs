// Run summary rendering

use colored::Colorize;
use jobsieve_core::application::{FilterStats, ProviderSummary, RunMode, RunSummary};
use jobsieve_core::domain::MatchType;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Listings")]
    listings: usize,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Filtered")]
    filtered: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Collisions")]
    collisions: usize,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&ProviderSummary> for ProviderRow {
    fn from(summary: &ProviderSummary) -> Self {
        Self {
            provider: summary.provider.clone(),
            listings: summary.listings,
            records: summary.records,
            filtered: summary.filtered,
            failed: summary.failed,
            collisions: summary.collisions,
            status: match &summary.error {
                Some(error) => format!("skipped: {error}"),
                None => "ok".to_string(),
            },
        }
    }
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Reconcile")]
    label: String,
    #[tabled(rename = "Count")]
    value: String,
}

fn row(label: impl Into<String>, value: impl ToString) -> CountRow {
    CountRow {
        label: label.into(),
        value: value.to_string(),
    }
}

fn filter_rows(rows: &mut Vec<CountRow>, scope: &str, stats: &FilterStats) {
    rows.push(row(format!("Filtered ({scope})"), stats.total()));
    for (reason, count) in stats.iter() {
        rows.push(row(format!("  {reason}"), count));
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Plain-text tables for one run
pub fn render_tables(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.mode == RunMode::Normal {
        let providers: Vec<ProviderRow> = summary.providers.iter().map(ProviderRow::from).collect();
        out.push_str(&Table::new(providers).to_string());
        out.push('\n');
    }

    let report = &summary.reconcile;
    let mut rows = vec![
        row("Incoming records", report.incoming),
        row("Promoted to block list", report.promoted),
    ];
    filter_rows(&mut rows, "incoming", &report.filtered_incoming);
    filter_rows(&mut rows, "master", &report.filtered_master);
    rows.extend([
        row("Exact-key duplicates", report.dedup.count(MatchType::ExactKey)),
        row("Content duplicates", report.dedup.count(MatchType::ContentMatch)),
        row("Refreshed from duplicates", report.dedup.refreshed),
        row("Inserted", report.inserted),
        row("Master size", report.master_size),
        row("Master written", yes_no(report.master_written)),
    ]);
    out.push_str(&Table::new(rows).to_string());
    out.push('\n');
    out
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "{}",
        format!(
            "✓ Run {} finished ({}, {})",
            summary.run_id, summary.mode, summary.run_date
        )
        .green()
        .bold()
    );
    println!();
    print!("{}", render_tables(summary));

    let report = &summary.reconcile;
    if report.first_save {
        println!("{}", "• First master file created".cyan());
    }
    if report.dedup.corpus_too_small {
        println!(
            "{}",
            format!(
                "• Only {} descriptions to compare; content duplicates may be missed",
                report.dedup.corpus_size
            )
            .yellow()
        );
    }
    for provider in summary.providers.iter().filter(|p| p.error.is_some()) {
        println!("{} {} was skipped", "✗".red(), provider.provider);
    }
}
