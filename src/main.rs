use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::{info, warn};

use lead_dashboard::buckets::Heatmap;
use lead_dashboard::config::AppConfig;
use lead_dashboard::display::{
    average_cents_to_currency, average_seconds_to_minutes, cents_to_currency, format_cost, format_date, format_duration,
    format_text, seconds_to_minutes, DisplayZone, MeetingBadge,
};
use lead_dashboard::export::{export_leads, write_leads};
use lead_dashboard::logging::{init_logging, OperationTimer};
use lead_dashboard::source::{ChangeFeed, JsonFileSource, JsonLinesFeed, LeadSource, RestSource};
use lead_dashboard::validation::InputValidator;
use lead_dashboard::{
    DashboardService, DashboardView, DateRange, Lead, LeadQuery, LeadSync, OutputFormat, SyncOptions, SyncStrategy,
};

#[derive(Parser)]
#[command(author, version, about = "Lead-qualification dashboard metrics", long_about = None)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read leads from a JSON array of raw rows instead of the backend
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// First day of the created-at range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last day of the created-at range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Case-insensitive text filter over name, emails and phone
    #[arg(short = 'q', long)]
    search: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HeatmapAxis {
    Hour,
    Weekday,
}

#[derive(Subcommand)]
enum Commands {
    /// Funnel metrics for the filtered leads
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Leads, meetings, cost and duration for the last 7 days
    Trend {
        #[command(flatten)]
        filter: FilterArgs,

        /// Last day of the window (defaults to today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Answer-rate heatmap by hour of day or weekday
    Heatmap {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, value_enum, default_value = "hour")]
        by: HeatmapAxis,
    },
    /// Autocomplete lookup by id, name, email or phone
    Search {
        term: String,

        /// Maximum results (defaults to dashboard.finder_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show the full detail of the first match
        #[arg(long)]
        detail: bool,
    },
    /// Keep the snapshot live and print metrics on every change
    Watch {
        #[command(flatten)]
        filter: FilterArgs,

        /// Read change events as JSON lines from stdin (push strategy)
        #[arg(long)]
        push_stdin: bool,
    },
    /// Export the filtered leads table
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output directory; stdout when omitted
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(snapshot) = &cli.snapshot {
        config.backend.snapshot_file = Some(snapshot.to_string_lossy().into_owned());
    }

    // Initialize logging
    let _guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(std::path::Path::new),
        &config.logging.format,
    )?;

    info!("Starting lead-dashboard");
    let zone = config.dashboard.display_zone()?;

    match cli.command {
        Commands::Summary { filter } => {
            let view = load_view(&config, &filter, None).await?;
            if cli.json {
                print_json(&view.metrics)?;
            } else {
                print_summary(&view);
            }
        },
        Commands::Trend { filter, today } => {
            let today = today.as_deref().map(InputValidator::parse_day).transpose()?;
            let view = load_view(&config, &filter, today).await?;
            if cli.json {
                print_json(&view.trend)?;
            } else {
                print_trend(&view);
            }
        },
        Commands::Heatmap { filter, by } => {
            let view = load_view(&config, &filter, None).await?;
            let heatmap = match by {
                HeatmapAxis::Hour => &view.hourly,
                HeatmapAxis::Weekday => &view.weekday,
            };
            if cli.json {
                print_json(heatmap)?;
            } else {
                print_heatmap(heatmap);
            }
        },
        Commands::Search { term, limit, detail } => {
            InputValidator::validate_search_term(&term)?;
            let limit = limit.unwrap_or(config.dashboard.finder_limit);
            InputValidator::validate_finder_limit(limit)?;
            let leads = load_leads(&config).await?;
            let matches = lead_dashboard::finder::search(&leads, &term, limit);
            if cli.json {
                print_json(&matches)?;
            } else if detail {
                match matches.first() {
                    Some(lead) => print_detail(lead, &zone),
                    None => println!("No leads match {term:?}"),
                }
            } else {
                print_matches(&matches);
            }
        },
        Commands::Watch { filter, push_stdin } => watch(&config, &filter, push_stdin, cli.json).await?,
        Commands::Export { filter, format, output_dir } => {
            let format: OutputFormat = format.parse()?;
            let view = load_view(&config, &filter, None).await?;
            match output_dir {
                Some(dir) => {
                    InputValidator::validate_file_path(&dir)?;
                    let path = export_leads(&view.leads, format, &dir, &zone)?;
                    println!("Exported {} leads to {}", view.leads.len(), path.display());
                },
                None => write_leads(&view.leads, format, std::io::stdout().lock(), &zone)?,
            }
        },
    }

    Ok(())
}

/// Lead source selected by configuration: snapshot file when set, else the REST backend
fn build_source(config: &AppConfig) -> Result<Arc<dyn LeadSource>> {
    if let Some(path) = &config.backend.snapshot_file {
        info!(path = %path, "Reading leads from snapshot file");
        return Ok(Arc::new(JsonFileSource::new(path)));
    }
    InputValidator::validate_backend_url(&config.backend.url)?;
    InputValidator::validate_table_name(&config.backend.table)?;
    Ok(Arc::new(RestSource::new(&config.backend)?))
}

fn build_query(filter: &FilterArgs, zone: &DisplayZone) -> Result<LeadQuery> {
    let from = filter.from.as_deref().map(InputValidator::parse_day).transpose()?;
    let to = filter.to.as_deref().map(InputValidator::parse_day).transpose()?;
    InputValidator::validate_date_range(from, to)?;

    let date_range = match (from, to) {
        (Some(from), Some(to)) => DateRange::from_days(from, to, zone),
        _ => DateRange::default(),
    };
    let search = match filter.search.as_deref() {
        Some(term) => {
            InputValidator::validate_search_term(term)?;
            Some(InputValidator::sanitize_text(term))
        },
        None => None,
    };
    Ok(LeadQuery { date_range, search })
}

/// One-shot load with the static strategy
async fn load_service(config: &AppConfig) -> Result<DashboardService> {
    let sync = LeadSync::create(build_source(config)?, SyncStrategy::Static, SyncOptions::from_config(&config.backend));
    sync.load_all().await.context("Failed to load leads")?;
    Ok(DashboardService::new(sync, config.dashboard.display_zone()?, config.dashboard.finder_limit))
}

async fn load_leads(config: &AppConfig) -> Result<Vec<Lead>> {
    let service = load_service(config).await?;
    Ok(service.sync().snapshot().to_vec())
}

async fn load_view(config: &AppConfig, filter: &FilterArgs, today: Option<NaiveDate>) -> Result<DashboardView> {
    let service = load_service(config).await?;
    let query = build_query(filter, service.zone())?;
    let timer = OperationTimer::new("dashboard_view");
    let view = match today {
        Some(today) => service.view_at(&query, today),
        None => service.view(&query),
    };
    timer.finish();
    Ok(view)
}

async fn watch(config: &AppConfig, filter: &FilterArgs, push_stdin: bool, json: bool) -> Result<()> {
    let feed: Option<Arc<dyn ChangeFeed>> = if push_stdin {
        Some(Arc::new(JsonLinesFeed::new(BufReader::new(tokio::io::stdin()), config.sync.feed_buffer)))
    } else {
        None
    };

    let mut effective = config.clone();
    if push_stdin {
        effective.sync.strategy = "push".to_string();
    } else if effective.sync.strategy == "push" {
        warn!("Push strategy needs --push-stdin here, falling back to polling");
        effective.sync.strategy = "poll".to_string();
    }

    let mut service = DashboardService::from_config(&effective, build_source(&effective)?, feed)?;
    let query = build_query(filter, service.zone())?;
    let status = service.start().await;
    info!(status = ?status, "Watching for changes (Ctrl-C to stop)");

    let mut updates = service.sync().watch();
    let mut live = status.is_live();
    emit_watch_line(&service.view(&query), json)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = service.view(&query);
                if live && !view.feed.is_live() {
                    warn!(feed = ?view.feed, "Live updates stopped, showing the last snapshot");
                }
                live = view.feed.is_live();
                emit_watch_line(&view, json)?;
            }
        }
    }

    service.stop().await;
    Ok(())
}

fn emit_watch_line(view: &DashboardView, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({
            "at": Utc::now(),
            "load": view.load,
            "feed": view.feed,
            "leads": view.leads.len(),
            "metrics": view.metrics,
        });
        println!("{line}");
    } else {
        let m = &view.metrics;
        println!(
            "[{}] leads={} attempts={} answered={} meetings={} answer_rate={:.1}% conversion={:.1}% feed={:?}",
            Utc::now().format("%H:%M:%S"),
            m.total_leads,
            m.total_attempts,
            m.answered_count,
            m.meetings_scheduled_count,
            m.answer_rate,
            m.conversion_rate,
            view.feed,
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(view: &DashboardView) {
    let m = &view.metrics;
    println!("Leads:            {} of {}", m.total_leads, view.snapshot_size);
    println!("Contacted:        {}", m.contacted_leads);
    println!("Attempts:         {} ({:.2} per lead)", m.total_attempts, m.avg_attempts_per_lead);
    println!("Answered:         {} ({:.1}%)", m.answered_count, m.answer_rate);
    println!("Meetings:         {} ({:.1}% of answered, {:.1}% of leads)", m.meetings_scheduled_count, m.conversion_rate, m.lead_conversion_rate);
    println!("Total cost:       ${:.2}", cents_to_currency(m.total_cost_cents));
    println!("Avg cost/call:    ${:.2}", average_cents_to_currency(m.avg_cost_cents_per_costed_call));
    println!("Total duration:   {:.1} min", seconds_to_minutes(m.total_duration_seconds));
    println!("Avg duration:     {:.1} min", average_seconds_to_minutes(m.avg_duration_seconds_per_timed_call));
    println!();
    for stage in &m.stages {
        println!(
            "{:<10} {:>6}  {:>5.1}% of attempts  {:>5.1}% of previous",
            stage.stage.label(),
            stage.count,
            stage.share_of_top,
            stage.from_previous
        );
    }
}

fn print_trend(view: &DashboardView) {
    println!("{:<12} {:>6} {:>9} {:>9} {:>10} {:>9}", "day", "leads", "meetings", "contacted", "cost", "minutes");
    for day in &view.trend {
        println!(
            "{:<12} {:>6} {:>9} {:>9} {:>10.2} {:>9.2}",
            day.key, day.leads, day.meetings, day.contacted, day.cost, day.duration_minutes
        );
    }
}

fn print_heatmap(heatmap: &Heatmap) {
    for cell in &heatmap.cells {
        println!(
            "{:<5} calls={:>5} answered={:>5} rate={:>5.1}% {:?}",
            cell.label, cell.calls, cell.answered, cell.rate, cell.tier
        );
    }
    if let Some(best) = heatmap.busiest() {
        println!("Best slot: {} ({:.1}%)", best.label, best.rate);
    }
}

fn print_matches(leads: &[Lead]) {
    if leads.is_empty() {
        println!("No matches");
        return;
    }
    for lead in leads {
        println!("#{:<6} {:<30} {:<25} {}", lead.id, format_text(&lead.name), lead.lead_email, lead.closer);
    }
}

fn print_detail(lead: &Lead, zone: &DisplayZone) {
    println!("Lead #{}", lead.id);
    println!("  Name:       {}", format_text(&lead.name));
    println!("  Email:      {}", lead.lead_email);
    println!("  Phone:      {}", format_text(&lead.phone_number));
    println!("  Closer:     {}", lead.closer);
    println!("  Created:    {}", format_date(Some(lead.created_at), zone));
    println!("  Attempts:   {}", lead.attempts);
    println!("  Answered:   {}", if lead.was_answered { "yes" } else { "no" });
    println!("  Meeting:    {}", MeetingBadge::from_status(lead.meeting).label());
    println!("  Meeting at: {}", format_date(lead.meeting_at, zone));
    println!("  Call at:    {}", format_date(lead.call_timestamp, zone));
    println!("  Duration:   {}", format_duration(lead.call_duration_seconds));
    println!("  Cost:       {}", format_cost(lead.call_cost_cents));
    println!("  Sentiment:  {}", format_text(&lead.sentiment));
    println!("  Summary:    {}", format_text(&lead.summary));
}
