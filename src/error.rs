use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Could not interpret an invoice count in query '{query}': {details}")]
    Parse { query: String, details: String },

    #[error("Unresolvable date phrase '{phrase}': {details}")]
    UnresolvableDate { phrase: String, details: String },

    #[error("Date window {start} to {end} has no eligible dates (business_days_only = {business_days_only})")]
    EmptyWindow {
        start: String,
        end: String,
        business_days_only: bool,
    },

    #[error("No eligible vendor: {0}")]
    NoEligibleVendor(String),

    #[error("Invalid payment window for invoice {reference}: due date {due_date} is before invoice date {invoice_date}")]
    InvalidPaymentWindow {
        reference: String,
        invoice_date: String,
        due_date: String,
    },

    #[error("Invalid invoice {reference}: {details}")]
    InvalidInvoice { reference: String, details: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid configuration value '{key}': {details}")]
    InvalidConfig { key: String, details: String },

    #[error("Description generation failed: {0}")]
    Description(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "llm")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl SynthError {
    pub(crate) fn config(key: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
