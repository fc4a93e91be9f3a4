//! # AP Synth
//!
//! Synthesizes realistic accounts-payable bills and payments from short
//! natural-language requests such as "Generate 6 bills for Q1 2023, pay for
//! only 2".
//!
//! ## Core Concepts
//!
//! - **Directive Parser**: free text to a [`GenerationIntent`] (count, date phrase, vendors, payments)
//! - **Date Window Resolver**: explicit, named fiscal and relative phrases to a [`DateWindow`]
//! - **Generation Planner**: intent + catalog + config to [`InvoiceSkeleton`]s
//! - **Payment Selector**: which invoices get a [`PaymentSelection`], and on what date
//! - **Validation**: staged invoices are checked against the catalog before anything is written
//! - **Reproducibility**: one seeded generator per run, threaded through planner and selector
//!
//! ## Example
//!
//! ```rust,ignore
//! use ap_synth::*;
//! use chrono::NaiveDate;
//!
//! let catalog = CatalogIndex::load_dir("./data".as_ref())?;
//! let config = RuntimeConfig::default();
//!
//! let run = InvoiceRunProcessor::process(
//!     "Generate 10 bills for last month and pay all",
//!     &catalog,
//!     &config,
//!     NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
//!     42,
//! )?;
//!
//! assert_eq!(run.invoices.len(), 10);
//! assert_eq!(run.payments.len(), 10);
//! write_run_artifacts(&config.service.runs_dir, &run, &catalog, &config)?;
//! ```

pub mod catalog;
pub mod config;
pub mod describe;
pub mod engine;
pub mod error;
pub mod parser;
pub mod payments;
pub mod periods;
pub mod report;
pub mod schema;
pub mod utils;
pub mod validation;

#[cfg(feature = "llm")]
pub mod llm;

pub use catalog::{CatalogDocument, CatalogIndex, Item, PaymentTerms, TaxCode, Vendor, VendorItems};
pub use config::{
    AiConfig, ArtifactConfig, GeneratorConfig, PaymentConfig, RuntimeConfig, ServiceConfig,
};
pub use describe::{enrich_descriptions, render_prompt, LineDescriber};
pub use engine::{plan, plan_with_seed, PlanOutcome, Planner};
pub use error::{Result, SynthError};
pub use parser::{parse, Directive, DirectiveParser, ParsedQuery, PhraseMatcher};
pub use payments::select;
pub use periods::{reference_date_for, resolve, DatePhrase, DateWindow, NamedPeriod, RelativePeriod};
pub use report::{write_run_artifacts, RunArtifacts};
pub use schema::*;
pub use validation::validate_invoices;

use chrono::NaiveDate;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Everything one generation run produced, ready for the artifact writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRun {
    pub run_id: String,
    pub query: String,
    pub seed: u64,
    pub reference_date: NaiveDate,
    pub intent: GenerationIntent,
    pub window: DateWindow,
    pub invoices: Vec<InvoiceSkeleton>,
    pub payments: Vec<PaymentSelection>,
    pub warnings: Vec<GenerationWarning>,
}

impl GenerationRun {
    pub fn run_id(reference_date: NaiveDate, seed: u64) -> String {
        format!("{}-{}", reference_date, seed)
    }
}

pub struct InvoiceRunProcessor;

impl InvoiceRunProcessor {
    /// Parse, plan and select payments for `query`.
    pub fn process(
        query: &str,
        catalog: &CatalogIndex,
        config: &RuntimeConfig,
        reference_date: NaiveDate,
        seed: u64,
    ) -> Result<GenerationRun> {
        let parsed = parser::parse(query, catalog)?;
        let mut run = Self::process_intent(parsed.intent, catalog, config, reference_date, seed)?;
        run.query = query.to_string();

        let mut warnings = parsed.warnings;
        warnings.append(&mut run.warnings);
        run.warnings = warnings;

        Ok(run)
    }

    /// Plans and selects payments for an already structured intent.
    pub fn process_intent(
        intent: GenerationIntent,
        catalog: &CatalogIndex,
        config: &RuntimeConfig,
        reference_date: NaiveDate,
        seed: u64,
    ) -> Result<GenerationRun> {
        config.validate()?;

        info!(
            "Generating {} invoices ({}) with seed {} as of {}",
            intent.invoice_count, intent.date_window, seed, reference_date
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = Planner::new(catalog, config).plan(&intent, reference_date, &mut rng)?;
        validation::validate_invoices(catalog, &outcome.invoices, config)?;
        let payments = payments::select(
            intent.payment_directive,
            &outcome.invoices,
            &config.payments,
            &mut rng,
        )?;

        debug!(
            "Run produced {} invoices, {} payments, {} warnings",
            outcome.invoices.len(),
            payments.len(),
            outcome.warnings.len()
        );

        Ok(GenerationRun {
            run_id: GenerationRun::run_id(reference_date, seed),
            query: String::new(),
            seed,
            reference_date,
            intent,
            window: outcome.window,
            invoices: outcome.invoices,
            payments,
            warnings: outcome.warnings,
        })
    }
}

pub fn generate(
    query: &str,
    catalog: &CatalogIndex,
    config: &RuntimeConfig,
    reference_date: NaiveDate,
    seed: u64,
) -> Result<GenerationRun> {
    InvoiceRunProcessor::process(query, catalog, config, reference_date, seed)
}
