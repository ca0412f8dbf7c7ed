use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lead_funnel_dashboard::config::{DataArgs, FilterArgs, Settings};
use lead_funnel_dashboard::dashboard::Dashboard;
use lead_funnel_dashboard::evolution::Evolution;
use lead_funnel_dashboard::table::{SortDirection, TableSorts};
use lead_funnel_dashboard::{format, ingest, report};

#[derive(Parser)]
#[command(name = "funnel-dashboard")]
#[command(about = "Lead funnel, conversion and marketing ROI analytics over weekly snapshots", long_about = None)]
struct Cli {
    #[command(flatten)]
    data: DataArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline KPIs for the latest snapshot
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Compare stage counts between two snapshot dates
    Evolution {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Print the course x stage pivot table
    Pivot {
        #[command(flatten)]
        filters: FilterArgs,
        /// Column header to sort by
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    /// Write the full dashboard as markdown
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
    /// Write the full dashboard view as JSON
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "dashboard.json")]
        out: PathBuf,
    },
}

impl Commands {
    fn filters(&self) -> &FilterArgs {
        match self {
            Commands::Summary { filters }
            | Commands::Evolution { filters, .. }
            | Commands::Pivot { filters, .. }
            | Commands::Report { filters, .. }
            | Commands::Export { filters, .. } => filters,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli.data, cli.command.filters());

    let (store, ingest_report) = ingest::load_store(&settings.snapshot_dir, &settings.investment_dir)
        .with_context(|| format!("failed to load snapshots from {}", settings.snapshot_dir.display()))?;
    if !ingest_report.rejected.is_empty() {
        warn!(rejected = ingest_report.rejected.len(), "some rows were rejected during ingestion");
    }
    info!(
        leads = ingest_report.leads,
        snapshots = store.dates().len(),
        investment = ingest_report.investment_file.as_deref().unwrap_or("none"),
        "records loaded"
    );

    let mut dashboard = Dashboard::with_filters(&store, settings.filters.clone());

    match cli.command {
        Commands::Summary { .. } => {
            let view = dashboard.view();
            if view.filtered_leads == 0 {
                println!("No leads match the current filters.");
                return Ok(());
            }
            let conversion = &view.metrics.conversion;
            let roi = &view.metrics.roi;
            println!(
                "Snapshot {} ({})",
                view.header.latest_date.map(format::date).unwrap_or_default(),
                report::describe_filters(&view.filters)
            );
            println!("- Leads: {} ({} marketing)", conversion.total_leads, conversion.marketing_leads);
            println!("- Registrations: {}", conversion.registrations);
            println!("- Global conversion: {}", format::percent(Some(conversion.global)));
            println!("- Marketing conversion: {}", format::percent(Some(conversion.marketing)));
            println!(
                "- CPL {} / CPI {} over {}/{} courses with investment",
                format::currency(roi.cpl),
                format::currency(roi.cpi),
                roi.courses_with_investment,
                roi.course_count
            );
            if !roi.courses_without_investment.is_empty() {
                println!("- No investment data: {}", roi.courses_without_investment.join(", "));
            }
            println!(
                "- Adjustment rate: {}",
                format::percent(view.metrics.adjustment.rate)
            );
        }
        Commands::Evolution { from, to, .. } => {
            if let (Some(from), Some(to)) = (from, to) {
                dashboard.select_comparison(from, to);
            } else if from.is_some() || to.is_some() {
                let current = dashboard.view().comparison;
                if let Some((first, last)) = current {
                    dashboard.select_comparison(from.unwrap_or(first), to.unwrap_or(last));
                }
            }
            let view = dashboard.view();
            match &view.evolution {
                Evolution::InsufficientHistory { snapshots } => {
                    println!("Insufficient history: {snapshots} snapshot(s), at least 2 are needed.");
                }
                Evolution::UnknownSnapshot { date } => {
                    println!("No snapshot for {}.", format::date(*date));
                }
                Evolution::Comparison(_) => {
                    if let Some(table) = report::evolution_table(&view.evolution) {
                        print!("{}", table.to_markdown());
                    }
                }
            }
        }
        Commands::Pivot { sort_by, desc, .. } => {
            let table = report::pivot_table(&dashboard.view().pivot);
            let table = match sort_by {
                Some(header) => {
                    let column = table
                        .column_index(&header)
                        .with_context(|| format!("unknown pivot column `{header}`"))?;
                    let direction = if desc {
                        SortDirection::Descending
                    } else {
                        SortDirection::Ascending
                    };
                    table.sorted(column, direction)
                }
                None => table,
            };
            print!("{}", table.to_markdown());
        }
        Commands::Report { out, .. } => {
            let output = report::build_report(dashboard.view(), &TableSorts::default());
            std::fs::write(&out, output).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out, .. } => {
            let json = serde_json::to_string_pretty(dashboard.view())?;
            std::fs::write(&out, json).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard exported to {}.", out.display());
        }
    }

    Ok(())
}
