//! lexflow CLI - runs the full three-mode comparison over a CSV column.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

use lexflow_core::{
    ComparisonReport, CsvReader, PartitionedExecutor, PipelineConfig, PipelineManager,
    ScopedTimer, Strategy,
};

#[derive(Parser)]
#[command(name = "lexflow")]
#[command(version, about = "Text pre-processing pipeline with comparative execution strategies", long_about = None)]
struct Cli {
    /// Input CSV file
    #[arg(short, long, value_name = "FILE", default_value = "docs.csv")]
    input: PathBuf,

    /// Column holding the document text
    #[arg(short = 'c', long, default_value = "text")]
    column: String,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker threads (default: detected hardware concurrency)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum tokens kept per document
    #[arg(long)]
    max_sequence_length: Option<usize>,

    /// Enable debug logging and result previews
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    config.num_workers = cli.workers.unwrap_or_else(|| num_cpus::get().max(1));
    if let Some(max_sequence_length) = cli.max_sequence_length {
        config.max_sequence_length = max_sequence_length;
    }
    config.enable_debug = config.enable_debug || cli.debug;

    tracing::info!(
        workers = config.num_workers,
        max_sequence_length = config.max_sequence_length,
        "pipeline configured"
    );

    let documents = {
        let _timer = ScopedTimer::new("data loading");
        CsvReader::new().read_column(&cli.input, &cli.column)?
    };
    if documents.is_empty() {
        return Err(eyre!(
            "no documents read from column '{}' of {}",
            cli.column,
            cli.input.display()
        ));
    }
    println!(
        "Loaded {} documents from column '{}' of {}",
        documents.len(),
        cli.column,
        cli.input.display()
    );

    let manager = PipelineManager::new(config.clone())?;
    let report = manager.run_full_comparison(&documents);

    if config.enable_debug {
        for strategy in Strategy::ALL {
            preview_results(&report, strategy);
        }
    }
    print_report(&report, config.num_workers);

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(eyre!("at least one execution mode failed"))
    }
}

fn preview_results(report: &ComparisonReport, strategy: Strategy) {
    let record = report.record(strategy);
    if !record.success {
        return;
    }
    println!("\n--- {strategy} results (first 5 entries) ---");
    for (i, document) in record.processed_documents.iter().take(5).enumerate() {
        let preview: String = if document.chars().count() > 150 {
            let head: String = document.chars().take(150).collect();
            format!("{head}...")
        } else {
            document.clone()
        };
        println!("  entry {}: {preview}", i + 1);
    }
}

fn print_report(report: &ComparisonReport, num_workers: usize) {
    println!("\n=== EXECUTION REPORT ===");

    for strategy in Strategy::ALL {
        let record = report.record(strategy);
        println!("\n{strategy} pipeline:");
        match (&record.error_message, record.success) {
            (_, true) => {
                println!("  documents processed: {}", record.processed_documents.len());
                println!("  stages completed:    {}", record.stages_completed);
                println!("  elapsed:             {:.3}s", record.elapsed_seconds);
                if strategy == Strategy::Partitioned {
                    let chunks =
                        PartitionedExecutor::chunk_count(report.batch_size, num_workers);
                    println!("  chunks processed:    {chunks}");
                }
            }
            (Some(message), false) => println!("  FAILED: {message}"),
            (None, false) => println!("  FAILED"),
        }
    }

    for strategy in [Strategy::Parallel, Strategy::Partitioned] {
        if let (Some(speedup), Some(efficiency)) = (
            report.speedup(strategy),
            report.efficiency(strategy),
        ) {
            println!("\n{strategy} vs sequential:");
            println!("  speedup:    {speedup:.2}x");
            println!("  efficiency: {:.1}%", efficiency * 100.0);
            println!("  workers:    {num_workers}");
        }
    }

    if let Some(best) = report.best_strategy() {
        let throughput = report
            .throughput(best)
            .map(|t| format!(" ({t:.0} docs/s)"))
            .unwrap_or_default();
        println!("\nBest strategy: {best}{throughput}");
    }
}
