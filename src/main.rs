use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use empreinte::config::Config;
use empreinte::constants;
use empreinte::logging;
use empreinte::pipeline::processing::selection::{self, Selection};
use empreinte::pipeline::{Pipeline, PipelineData};
use empreinte::types::CategoryPath;

#[derive(Parser)]
#[command(name = "empreinte")]
#[command(about = "Environmental footprint data pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to EMPREINTE_CONFIG, then config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every enabled export
    Run {
        /// Override the configured output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the category hierarchy
    Tree {
        /// Print as JSON instead of an indented outline
        #[arg(long)]
        json: bool,
    },
    /// Drill down to a category path and compare impacts
    Select {
        #[arg(long)]
        level1: Option<String>,
        #[arg(long)]
        level2: Option<String>,
        #[arg(long)]
        level3: Option<String>,
        #[arg(long)]
        level4: Option<String>,
        /// Impact categories to compare (repeatable); defaults to the first three
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Histogram bin count
        #[arg(long, default_value_t = constants::DEFAULT_HISTOGRAM_BINS)]
        bins: usize,
    },
    /// Impact profile of one process
    Process {
        #[arg(long, conflicts_with = "flow")]
        uuid: Option<String>,
        /// Look the process up by flow name instead
        #[arg(long)]
        flow: Option<String>,
    },
    /// List the process metadata columns
    Columns,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Config::load().context("loading configuration"),
    }
}

fn load_data(config: &Config) -> Result<PipelineData> {
    Pipeline::load(config).context("loading pipeline inputs")
}

fn print_select(
    data: &PipelineData,
    levels: [Option<String>; 4],
    categories: Vec<String>,
    bins: usize,
) -> Result<()> {
    let path = CategoryPath::from_levels(levels);

    // Options for the next level down, like the dashboard's cascading selects
    let given: Vec<&str> = path.levels().into_iter().map_while(|l| l).collect();
    if let Some(node) = data.tree.descend(&given) {
        if !node.is_empty() && given.len() < 4 {
            println!("📂 Options below {:?}:", given);
            for key in node.keys() {
                println!("   - {}", key);
            }
        }
    }

    let categories = if categories.is_empty() {
        selection::default_categories(&data.categories, constants::DEFAULT_SELECTED_CATEGORIES)
    } else {
        categories
    };
    let chosen = Selection::new(path, categories);
    println!("\n🎯 Categories: {}", chosen.categories.join(", "));

    let records = &data.enriched.records;
    let impacts = selection::select_impacts(&data.metadata.processes, records, &chosen);
    if impacts.is_empty() {
        println!("ℹ️  No impacts found for this selection");
    } else {
        println!("\n📊 Impacts ({} rows, ascending):", impacts.len());
        for record in impacts {
            println!(
                "   {:<50} {:<40} {}",
                record.process_name.as_deref().unwrap_or("-"),
                record.category_name.as_deref().unwrap_or("-"),
                record.value.map_or_else(|| "-".to_string(), |v| format!("{v:.6e}"))
            );
        }
    }

    let distribution = selection::category_distribution(records, &chosen);
    match selection::histogram(distribution.iter().map(|r| r.value), bins) {
        Some(hist) => {
            println!("\n📈 Histogram ({} values):", hist.total());
            let widest = hist.counts.iter().copied().max().unwrap_or(0).max(1);
            for (i, count) in hist.counts.iter().enumerate() {
                let bar = "█".repeat(count * 40 / widest);
                println!(
                    "   [{:>12.4e}, {:>12.4e}{} {:>6} {}",
                    hist.edges[i],
                    hist.edges[i + 1],
                    if i + 1 == hist.counts.len() { "]" } else { ")" },
                    count,
                    bar
                );
            }
        }
        None => println!("ℹ️  No values to plot for these categories"),
    }
    Ok(())
}

fn print_process(data: &PipelineData, uuid: Option<String>, flow: Option<String>) -> Result<()> {
    let processes = &data.metadata.processes;
    let uuid = match (uuid, flow) {
        (Some(uuid), _) => uuid,
        (None, Some(flow)) => match selection::find_process_by_flow_name(processes, &flow) {
            Some(process) => process.uuid.clone(),
            None => bail!("no process with flow name '{}'", flow),
        },
        (None, None) => bail!("either --uuid or --flow is required"),
    };

    if let Some(process) = data.metadata.find(&uuid) {
        println!("🏷️  {}", process.flow_name.as_deref().unwrap_or(&process.uuid));
        println!("{}", serde_json::to_string_pretty(process)?);
    }

    let profile = selection::process_profile(&data.enriched.records, &uuid);
    if profile.is_empty() {
        println!("ℹ️  No impacts found for process {}", uuid);
        return Ok(());
    }
    println!("\n📊 Impacts:");
    for entry in profile {
        println!(
            "   {:<60} {}",
            entry.category_name.as_deref().unwrap_or("-"),
            entry.value.map_or_else(|| "-".to_string(), |v| format!("{v:.6e}"))
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run { output_dir } => {
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            println!("🚀 Running pipeline...");
            match Pipeline::run(&config) {
                Ok(result) => {
                    info!("Pipeline finished");
                    println!("\n📊 Pipeline Results:");
                    println!("   Processes: {}", result.processes);
                    println!("   Impact categories: {}", result.categories);
                    println!("   Impact values: {}", result.impact_rows);
                    println!("   Merged rows: {}", result.merged_rows);
                    println!("   Global impact rows: {}", result.global_rows);
                    println!("   Unparseable values: {}", result.coercion_gaps);
                    println!(
                        "   Unmatched rows: {} process, {} category",
                        result.process_join_gaps, result.category_join_gaps
                    );
                    println!("   Output directory: {}", result.output_dir.display());
                    println!("   Files written: {}", result.files.len());
                    println!("✅ Done in {:.2}s", result.duration_secs);
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Tree { json } => {
            let data = load_data(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&data.tree)?);
            } else {
                for line in data.tree.outline() {
                    println!("{}", line);
                }
            }
        }
        Commands::Select {
            level1,
            level2,
            level3,
            level4,
            categories,
            bins,
        } => {
            let data = load_data(&config)?;
            print_select(&data, [level1, level2, level3, level4], categories, bins)?;
        }
        Commands::Process { uuid, flow } => {
            let data = load_data(&config)?;
            print_process(&data, uuid, flow)?;
        }
        Commands::Columns => {
            let data = load_data(&config)?;
            for column in &data.metadata.columns {
                println!("{}", column);
            }
        }
    }
    Ok(())
}
