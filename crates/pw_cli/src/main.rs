use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use pw_enrich::{create_client, Config};
use pw_pipeline::prelude::*;
use pw_pipeline::{ExportPayload, HistoryService, ImportReport, QueryEngine};

/// Deadline argument in `<value><unit>` segments, e.g. `30s` or `1m30s`.
/// A bare number is taken as seconds.
#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("duration must not be empty".to_string());
        }
        if let Ok(seconds) = s.parse::<u64>() {
            return Ok(HumanDuration(Duration::from_secs(seconds)));
        }

        let mut total = Duration::ZERO;
        let mut rest = s;
        while !rest.is_empty() {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if digits == 0 {
                return Err(format!("duration segment {:?} must start with a number", rest));
            }
            let (value, tail) = rest.split_at(digits);
            let value: u64 = value
                .parse()
                .map_err(|_| format!("duration value {} is out of range", value))?;
            let mut tail = tail.chars();
            let seconds = match tail.next() {
                Some('h') => value * 3600,
                Some('m') => value * 60,
                Some('s') => value,
                Some(other) => {
                    return Err(format!("duration unit {:?} is not one of h, m, s", other))
                }
                None => return Err("duration is missing a trailing unit".to_string()),
            };
            total += Duration::from_secs(seconds);
            rest = tail.as_str();
        }
        Ok(HumanDuration(total))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch article enrichment pipeline", long_about = None)]
struct Cli {
    #[arg(long, default_value = "memory")]
    storage: String,
    #[arg(long, default_value = "demo-user")]
    user: String,
    #[arg(
        long,
        default_value = "heuristic",
        help = "Enrichment client. Available: heuristic (default), remote"
    )]
    client: String,
    #[arg(long, help = "Base URL of the remote analysis service")]
    remote_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Import a set of articles, enrich them and print the results
    Run {
        /// JSON file holding an array of articles; a built-in sample is
        /// used when absent
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        /// Enrichment deadline, e.g. 30s or 1m30s
        #[arg(long)]
        timeout: Option<HumanDuration>,
        /// Re-process articles that are already enriched
        #[arg(long)]
        re_enrich: bool,
        /// Print an export of the batch afterwards (single, batch or list)
        #[arg(long)]
        export: Option<String>,
    },
    /// Run the enrichment client on one piece of content
    Analyze { content: String },
}

fn sample_items() -> Vec<NewArticle> {
    vec![
        NewArticle::from_content(
            "The city council approved the new transit plan. Supporters called it a \
             breakthrough for commuters. Construction starts next spring.",
        ),
        NewArticle::from_content(
            "Quarterly results showed a sharp decline in revenue. Analysts warned of \
             further risk ahead. The share price dropped on the news.",
        ),
        NewArticle::from_content(
            "Researchers published a study on urban birdsong. The findings were \
             described as promising. Follow-up work is planned.",
        ),
    ]
}

fn load_items(file: Option<&PathBuf>) -> Result<Vec<NewArticle>> {
    match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(sample_items()),
    }
}

fn print_import(report: &ImportReport) {
    println!(
        "Imported {} articles into batch {}",
        report.imported.len(),
        report.batch.update_id
    );
    for rejected in &report.rejected {
        eprintln!(
            "  ✗ item {} rejected ({}): {}",
            rejected.index, rejected.field, rejected.reason
        );
    }
}

fn print_enrichment(report: &EnrichmentReport) {
    println!(
        "Batch {} -> {} ({} succeeded, {} failed, {} skipped)",
        report.update_id,
        report.status,
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len()
    );
    for failed in &report.failed {
        eprintln!("  ✗ {}: {}", failed.article_id, failed.reason);
    }
}

fn print_export(payload: &ExportPayload) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    if !payload.unresolved.is_empty() {
        eprintln!("Unresolved ids: {}", payload.unresolved.join(", "));
    }
    Ok(())
}

async fn run_pipeline(
    cli: &Cli,
    file: Option<&PathBuf>,
    concurrency: usize,
    timeout: Option<Duration>,
    re_enrich: bool,
    export: Option<&str>,
) -> Result<()> {
    let store = pw_storage::create_store(&cli.storage)?;
    let client = create_client(Config {
        client_name: Some(cli.client.clone()),
        base_url: cli.remote_url.clone(),
        api_key: cli.api_key.clone(),
    })?;
    info!("🧠 Enrichment client initialized (using {})", client.name());

    let importer = ImportCoordinator::new(store.clone());
    let items = load_items(file)?;
    let report = importer.import_batch(&cli.user, items, None).await?;
    print_import(&report);

    let options = EnrichOptions {
        concurrency,
        deadline: timeout,
        re_enrich,
        ..EnrichOptions::default()
    };
    let coordinator = EnrichmentCoordinator::new(store.clone(), client).with_options(options);
    let enrichment = coordinator
        .enrich_batch(&cli.user, &report.batch.update_id)
        .await?;
    print_enrichment(&enrichment);

    let history = HistoryService::new(store.clone());
    let (batches, total) = history.list_batches(&cli.user, 1, 10).await?;
    println!("History ({} batches):", total);
    for batch in batches {
        println!(
            "  {} {} (created {})",
            batch.update_id, batch.status, batch.created_at
        );
    }

    if let Some(mode) = export {
        let mode: ExportMode = mode.parse()?;
        let engine = QueryEngine::new(store);
        let payload = match mode {
            ExportMode::Single => {
                let first = report
                    .imported
                    .first()
                    .ok_or_else(|| Error::NotFound("no imported articles".to_string()))?;
                engine
                    .export(&cli.user, Some(mode), Some(&first.article_id), None)
                    .await?
            }
            ExportMode::Batch => {
                engine
                    .export(&cli.user, Some(mode), Some(&report.batch.update_id), None)
                    .await?
            }
            ExportMode::List => {
                let ids: Vec<&str> = report
                    .imported
                    .iter()
                    .map(|a| a.article_id.as_str())
                    .collect();
                engine
                    .export(&cli.user, Some(mode), None, Some(&ids.join(",")))
                    .await?
            }
        };
        print_export(&payload)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            file,
            concurrency,
            timeout,
            re_enrich,
            export,
        } => {
            run_pipeline(
                &cli,
                file.as_ref(),
                *concurrency,
                timeout.as_ref().map(|t| t.0),
                *re_enrich,
                export.as_deref(),
            )
            .await
        }
        Commands::Analyze { content } => {
            let client = create_client(Config {
                client_name: Some(cli.client.clone()),
                base_url: cli.remote_url.clone(),
                api_key: cli.api_key.clone(),
            })?;
            let analysis = client.analyze(content).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
    }
}
