use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod dataset;
mod derive;
mod error;
mod filters;
mod models;
mod navigation;
mod normalize;
mod report;
mod session;
mod slides;

use config::DeckConfig;
use dataset::Dataset;
use filters::{resolve_key, Selection};
use slides::Deck;

#[derive(Parser)]
#[command(name = "lifestyle-deck")]
#[command(about = "Slide deck on student lifestyle, stress and GPA", long_about = None)]
struct Cli {
    /// Student lifestyle CSV
    #[arg(
        long,
        global = true,
        env = "LIFESTYLE_DECK_CSV",
        default_value = "student_lifestyle_dataset.csv"
    )]
    csv: PathBuf,
    /// JSON file overriding category orders, palettes and sizes
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seconds between autoplay advances
    #[arg(long, global = true)]
    autoplay_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every slide and write the deck to a file
    Render {
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Step through the deck interactively in the terminal
    Present,
    /// Resolve filter selections to the activity data they show
    Resolve {
        #[arg(long, default_value = "All Students")]
        gpa: String,
        #[arg(long, default_value = "All")]
        study_sleep: String,
        #[arg(long, default_value = "All")]
        physical: String,
    },
    /// Print dataset overview statistics
    Summary,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = DeckConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.autoplay_secs {
        config.autoplay_secs = secs;
    }

    let dataset = Dataset::load(&cli.csv);
    let deck = Deck::build(&dataset, &config);
    let source = cli.csv.display().to_string();

    match cli.command {
        Commands::Render { format, out } => {
            let generated_at = chrono::Utc::now();
            let (contents, default_out) = match format {
                Format::Markdown => (report::build_report(&deck, &source, generated_at), "deck.md"),
                Format::Json => (
                    report::build_json(
                        &deck,
                        &source,
                        dataset.error().map(|err| err.to_string()),
                        generated_at,
                    )
                    .context("failed to serialize deck")?,
                    "deck.json",
                ),
            };
            let out = out.unwrap_or_else(|| PathBuf::from(default_out));
            std::fs::write(&out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Deck of {} slides written to {}.", deck.len(), out.display());
        }
        Commands::Present => {
            session::run(&deck, config.autoplay_interval()).await?;
        }
        Commands::Resolve {
            gpa,
            study_sleep,
            physical,
        } => {
            let selection = Selection::parse(&gpa, &study_sleep, &physical)?;
            let key = resolve_key(&selection);
            println!("Resolved key: {key}");

            let Some(chart) = deck.interactive() else {
                println!("No data loaded from {source}.");
                return Ok(());
            };
            match chart.table.get(&key) {
                Some(series) => {
                    let mut output = String::new();
                    report::write_series(&mut output, &series.physical);
                    report::write_series(&mut output, &series.social);
                    println!("{} students", series.rows);
                    print!("{output}");
                }
                None => println!("No precomputed data for {key}; display unchanged."),
            }
        }
        Commands::Summary => {
            let (Some(path), Some(records)) = (dataset.path(), dataset.records()) else {
                println!("No data loaded from {source}.");
                return Ok(());
            };
            println!("Dataset: {}", path.display());
            println!("Rows loaded: {}", records.len());

            if let Some(slides::SlideBody::Overview(overview)) = deck.slides.first().map(|s| &s.body) {
                if let Some(stats) = &overview.stats {
                    println!("Students with GPA and stress: {}", stats.students);
                    for (level, share) in &stats.stress_share {
                        println!("- {level} stress: {share:.1}%");
                    }
                    println!(
                        "- GPA above mean ({:.2}): {:.1}%",
                        stats.mean_gpa, stats.above_mean_gpa_pct
                    );
                }
            }

            if let Some(chart) = deck.interactive() {
                let t = &chart.table.thresholds;
                println!(
                    "Thresholds: study {:.2} h, sleep {:.2} h, physical {:.2} h, GPA {:.2}",
                    t.study_median, t.sleep_median, t.physical_median, t.gpa_cut
                );
                println!("Filter groups with data: {}", chart.table.entries.len());
            }
        }
    }

    Ok(())
}
