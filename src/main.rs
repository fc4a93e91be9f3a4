use anyhow::{Context, Result};
use ap_synth::{
    reference_date_for, write_run_artifacts, CatalogIndex, GenerationRun, InvoiceRunProcessor,
    RuntimeConfig,
};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ap-synth", version, about = "Synthesize accounts-payable bills and payments from a sentence")]
struct Cli {
    /// Directory holding service_defaults.json and runtime_config.json
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan invoices and payments for a request and write run artifacts
    Generate {
        #[arg(short = 'q', long)]
        query: String,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_price_variation")]
        allow_price_variation: bool,

        #[arg(long, action = ArgAction::SetTrue)]
        no_price_variation: bool,

        #[arg(long)]
        price_variance_pct: Option<f64>,

        /// Never date invoices after today
        #[arg(long, action = ArgAction::SetTrue)]
        limit_to_current: bool,

        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long)]
        runs_dir: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(&cli.config_dir)
        .with_context(|| format!("loading config from {}", cli.config_dir.display()))?;

    match cli.command {
        Commands::Generate {
            query,
            seed,
            allow_price_variation,
            no_price_variation,
            price_variance_pct,
            limit_to_current,
            data_dir,
            runs_dir,
        } => {
            if allow_price_variation {
                config.generator.allow_price_variation = true;
            }
            if no_price_variation {
                config.generator.allow_price_variation = false;
            }
            if let Some(pct) = price_variance_pct {
                config.generator.price_variation_pct = pct;
            }
            if limit_to_current {
                config.generator.limit_to_reference_date = true;
            }
            if let Some(dir) = data_dir {
                config.service.data_dir = dir;
            }
            if let Some(dir) = runs_dir {
                config.service.runs_dir = dir;
            }
            config.validate()?;

            let catalog = CatalogIndex::load_dir(&config.service.data_dir).with_context(|| {
                format!("loading catalog from {}", config.service.data_dir.display())
            })?;

            let (reference_date, known_tz) = reference_date_for(&config.service.timezone);
            if !known_tz {
                warn!(
                    "Unknown timezone '{}'; using UTC for today's date",
                    config.service.timezone
                );
            }
            let seed = seed.unwrap_or(config.service.default_seed);
            info!("Reference date {} ({}), seed {}", reference_date, config.service.timezone, seed);

            let run = InvoiceRunProcessor::process(&query, &catalog, &config, reference_date, seed)
                .with_context(|| format!("generating from query '{}'", query))?;

            #[cfg(feature = "llm")]
            let run = describe_lines(run, &config)?;

            let artifacts = write_run_artifacts(&config.service.runs_dir, &run, &catalog, &config)?;
            print_summary(&run);
            println!("Artifacts: {}", artifacts.dir.display());
        }
    }

    Ok(())
}

#[cfg(feature = "llm")]
fn describe_lines(mut run: GenerationRun, config: &RuntimeConfig) -> Result<GenerationRun> {
    use ap_synth::llm::{enrich_descriptions_async, ChatCompletionsClient};

    if !(config.ai.enabled && config.ai.line_item_description_enabled) {
        return Ok(run);
    }
    let Some(client) = ChatCompletionsClient::from_env() else {
        warn!("Line item descriptions enabled but OPENAI_API_KEY is not set; keeping catalog names");
        return Ok(run);
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let warnings = runtime.block_on(enrich_descriptions_async(
        &client,
        &config.ai,
        &mut run.invoices,
        None,
    ));
    info!("Description enrichment finished with {} fallbacks", warnings.len());
    run.warnings.extend(warnings);
    Ok(run)
}

fn print_summary(run: &GenerationRun) {
    println!("Run {} (seed {})", run.run_id, run.seed);
    println!("Window: {}", run.window);
    println!(
        "Invoices: {}  Payments: {}",
        run.invoices.len(),
        run.payments.len()
    );
    for invoice in &run.invoices {
        println!(
            "  {}  {}  {}  due {}  {} {}",
            invoice.reference,
            invoice.vendor_id,
            invoice.invoice_date,
            invoice.due_date,
            invoice.total(),
            invoice.currency
        );
    }
    for warning in &run.warnings {
        println!("warning: {}", warning);
    }
}
