use std::sync::Arc;

use anyhow::{Context, Result};
use asset_tracker::{
    config::{self, AppConfig},
    db::{self, DbPool},
    handlers::AppServices,
    repositories::SuggestionFilter,
    services::{
        locations::LocationNode, replacement_suggestions::ReplacementSuggestionView,
        warranty_suggestions::WarrantyRunReport,
    },
};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::RunWarrantyJob(args) => handle_run_warranty_job(&context, args, cli.json).await?,
        Commands::Locations => handle_locations(&context, cli.json).await?,
        Commands::Suggestions(args) => handle_suggestions(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "tracker-cli",
    about = "Asset tracker operator tool: migrations, warranty job, read-only views",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Run the expired-warranty suggestion job once
    RunWarrantyJob(RunWarrantyJobArgs),
    /// Print the location hierarchy
    Locations,
    /// List replacement suggestions
    Suggestions(SuggestionsArgs),
}

#[derive(Args)]
struct RunWarrantyJobArgs {
    #[arg(long, value_parser = parse_date, help = "Run as if today were this date (YYYY-MM-DD)")]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct SuggestionsArgs {
    #[arg(long, help = "Only suggestions for this part type")]
    part_type_id: Option<i64>,
    #[arg(long, help = "Only suggestions in this status, e.g. pending")]
    status: Option<String>,
    #[arg(long, value_parser = parse_date, help = "Earliest suggestion date (YYYY-MM-DD)")]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date, help = "Latest suggestion date (YYYY-MM-DD)")]
    to: Option<NaiveDate>,
}

struct CliContext {
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config: AppConfig = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json, config.otel_enabled);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);
        let services = AppServices::new(db.clone(), &config);

        Ok(Self { db, services })
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_run_warranty_job(
    context: &CliContext,
    args: RunWarrantyJobArgs,
    json: bool,
) -> Result<()> {
    let generator = &context.services.warranty_generator;
    let report = match args.date {
        Some(date) => generator.run_for_date(date).await,
        None => generator.run().await,
    }
    .context("expired warranty run failed")?;

    if json {
        print_json(&report)?;
    } else {
        render_report(&report);
    }
    Ok(())
}

async fn handle_locations(context: &CliContext, json: bool) -> Result<()> {
    let tree = context
        .services
        .locations
        .location_tree()
        .await
        .context("failed to load locations")?;

    if json {
        print_json(&tree)?;
    } else if tree.is_empty() {
        println!("No locations");
    } else {
        render_tree(&tree);
    }
    Ok(())
}

async fn handle_suggestions(context: &CliContext, args: SuggestionsArgs, json: bool) -> Result<()> {
    let filter = SuggestionFilter {
        part_type_id: args.part_type_id,
        status: normalize_optional_string(args.status),
        date_from: args.from,
        date_to: args.to,
    };
    let suggestions = context
        .services
        .suggestions
        .find(filter)
        .await
        .context("failed to load replacement suggestions")?;

    if json {
        print_json(&suggestions)?;
    } else if suggestions.is_empty() {
        println!("No replacement suggestions");
    } else {
        for suggestion in &suggestions {
            render_suggestion(suggestion);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_report(report: &WarrantyRunReport) {
    println!("Expired warranty run for {}", report.run_date);
    println!("  devices scanned:     {}", report.devices_scanned);
    println!("  expired devices:     {}", report.expired_devices);
    println!("  suggestions created: {}", report.created.len());
    println!("  already suggested:   {}", report.skipped_existing);
    println!("  unresolved type:     {}", report.skipped_unresolved);
    println!("  failed:              {}", report.failed);
    for created in &report.created {
        println!(
            "  + suggestion {} for part type {}",
            created.id, created.part_type_id
        );
    }
}

/// Indented outline of the forest, walked with an explicit stack
fn render_tree(roots: &[LocationNode]) {
    let mut stack: Vec<(&LocationNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let devices = if node.devices.is_empty() {
            String::new()
        } else {
            format!(" [{} device(s)]", node.devices.len())
        };
        println!("{}- {} (#{}){}", "  ".repeat(depth), node.name, node.id, devices);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

fn render_suggestion(suggestion: &ReplacementSuggestionView) {
    let part_type = suggestion
        .part_type
        .as_ref()
        .map(|pt| pt.name.as_str())
        .unwrap_or("?");
    println!(
        "- #{} • {} • part type {} ({}) • forecast {} • {}",
        suggestion.id,
        suggestion.suggestion_date,
        suggestion.part_type_id,
        part_type,
        suggestion.forecast_replacement_date,
        suggestion.status
    );
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", raw))
}
