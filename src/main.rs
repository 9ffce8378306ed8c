use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retention_forecast::config::MAX_REVENUE_MONTHS;
use retention_forecast::{dataset, projection, report, EngineConfig, RiskScorer};

#[derive(Parser)]
#[command(name = "retention-forecast")]
#[command(about = "Retention risk and revenue forecasting for membership businesses", long_about = None)]
struct Cli {
    /// JSON file overriding the default thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Project next month's revenue from a payments export
    Project {
        #[arg(long)]
        payments: PathBuf,
        /// Reference date (YYYY-MM-DD). Defaults to today's UTC date.
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Trailing window length (1-120); overrides the config value
        #[arg(long, value_parser = parse_months)]
        months: Option<usize>,
    },
    /// Score cancellation risk across active members
    Score {
        #[arg(long)]
        members: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate the full retention report
    Report {
        #[arg(long)]
        members: PathBuf,
        #[arg(long)]
        payments: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Project {
            payments,
            as_of,
            months,
        } => {
            let as_of = resolve_as_of(as_of);
            let window = months.unwrap_or(config.window.revenue_months);
            let records = dataset::load_payments(&payments)
                .with_context(|| format!("failed to load {}", payments.display()))?;
            let series = dataset::monthly_revenue(&records, as_of, window);
            let result = projection::project_next_month(&series);

            println!("Trailing {window} months through {as_of}:");
            for value in series.iter() {
                println!("- {value:.2}");
            }
            println!(
                "Projected next month: {:.2} ({:+.1}%)",
                result.projected, result.growth_percent
            );
        }
        Commands::Score {
            members,
            as_of,
            limit,
        } => {
            let as_of = resolve_as_of(as_of);
            let records = dataset::load_members(&members)
                .with_context(|| format!("failed to load {}", members.display()))?;
            let by_id: HashMap<_, _> = records.iter().map(|m| (m.id, m)).collect();
            let inputs = dataset::active_risk_inputs(&records, as_of);
            let ranked = RiskScorer::from_config(&config).rank_at_risk(&inputs);

            if ranked.is_empty() {
                println!("No active members at risk as of {as_of}.");
                return Ok(());
            }

            println!("Top members by cancellation risk:");
            for result in ranked.iter().take(limit) {
                let Some(member) = by_id.get(&result.id) else {
                    continue;
                };
                println!(
                    "- {} ({}) {}% {} risk: {}",
                    member.full_name,
                    member.email,
                    result.percent,
                    result.tier.as_str(),
                    result.reason
                );
            }
        }
        Commands::Report {
            members,
            payments,
            as_of,
            format,
            top,
            out,
        } => {
            let as_of = resolve_as_of(as_of);
            let member_records = dataset::load_members(&members)
                .with_context(|| format!("failed to load {}", members.display()))?;
            let payment_records = dataset::load_payments(&payments)
                .with_context(|| format!("failed to load {}", payments.display()))?;

            let analysis = report::analyze(&member_records, &payment_records, as_of, &config);
            let rendered = match format {
                Format::Markdown => report::render_markdown(&analysis, top),
                Format::Json => report::to_json(&analysis)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
    }

    Ok(())
}

fn parse_months(raw: &str) -> Result<usize, String> {
    let months: usize = raw.parse().map_err(|_| format!("`{raw}` is not a month count"))?;
    if (1..=MAX_REVENUE_MONTHS).contains(&months) {
        Ok(months)
    } else {
        Err(format!("months must be between 1 and {MAX_REVENUE_MONTHS}"))
    }
}

fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}
