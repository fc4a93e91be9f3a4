use crate::error::{Result, SynthError};
use crate::utils::validate_fiscal_year_start_month;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVICE_DEFAULTS_FILE: &str = "service_defaults.json";
pub const RUNTIME_CONFIG_FILE: &str = "runtime_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AiConfig {
    #[schemars(description = "Allow model-backed enrichment when a client is configured.")]
    pub enabled: bool,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub system_prompt: Option<String>,
    #[schemars(description = "Upper bound on distinct vendors drawn when the request names none.")]
    pub max_vendors: usize,
    pub line_item_description_enabled: bool,
    #[schemars(description = "Prompt template; `{item_name}` is replaced with the catalog item name.")]
    pub line_item_description_prompt: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.15,
            top_p: 1.0,
            max_output_tokens: 1200,
            system_prompt: None,
            max_vendors: 6,
            line_item_description_enabled: false,
            line_item_description_prompt:
                "Write a short description for invoice line item '{item_name}'.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    pub allow_price_variation: bool,
    #[schemars(description = "Fractional unit price variation, e.g. 0.10 for ±10%.")]
    pub price_variation_pct: f64,
    pub currency: String,
    pub status: String,
    pub business_days_only: bool,
    pub min_lines_per_invoice: u32,
    pub max_lines_per_invoice: u32,
    pub default_quantity_range: (u32, u32),
    #[schemars(description = "Tax code applied to every line when force_no_tax is set.")]
    pub no_tax_code: String,
    #[schemars(description = "Clamp the resolved window so no invoice is dated after the reference date.")]
    pub limit_to_reference_date: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            allow_price_variation: false,
            price_variation_pct: 0.10,
            currency: "AUD".to_string(),
            status: "AUTHORISED".to_string(),
            business_days_only: true,
            min_lines_per_invoice: 1,
            max_lines_per_invoice: 3,
            default_quantity_range: (1, 12),
            no_tax_code: "EXEMPTEXPENSES".to_string(),
            limit_to_reference_date: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaymentConfig {
    pub pay_on_due_date: bool,
    pub allow_overdue: bool,
    pub overdue_slack_days: u32,
    #[schemars(description = "Pay a random subset when the request says nothing about payments.")]
    pub pay_when_unspecified: bool,
    pub account_code: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            pay_on_due_date: false,
            allow_overdue: false,
            overdue_slack_days: 14,
            pay_when_unspecified: false,
            account_code: "101".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ArtifactConfig {
    pub include_meta_json: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            include_meta_json: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServiceConfig {
    #[schemars(description = "`UTC`, `local`, or a fixed offset such as `+10:00`.")]
    pub timezone: String,
    pub default_seed: u64,
    pub fiscal_year_start_month: u32,
    pub data_dir: PathBuf,
    pub runs_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            default_seed: 42,
            fiscal_year_start_month: 7,
            data_dir: PathBuf::from("./data"),
            runs_dir: PathBuf::from("./runs"),
        }
    }
}

/// Every tunable that shapes a generation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RuntimeConfig {
    pub ai: AiConfig,
    pub generator: GeneratorConfig,
    pub payments: PaymentConfig,
    pub artifacts: ArtifactConfig,
    #[schemars(description = "Zero tax on every line, using generator.no_tax_code.")]
    pub force_no_tax: bool,
    pub service: ServiceConfig,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        validate_fiscal_year_start_month(self.service.fiscal_year_start_month)?;

        let g = &self.generator;
        if !(0.0..=1.0).contains(&g.price_variation_pct) {
            return Err(SynthError::config(
                "generator.price_variation_pct",
                format!("{} must be in [0, 1]", g.price_variation_pct),
            ));
        }
        if g.min_lines_per_invoice == 0 || g.min_lines_per_invoice > g.max_lines_per_invoice {
            return Err(SynthError::config(
                "generator.min_lines_per_invoice",
                format!(
                    "line bounds {}-{} must satisfy 1 <= min <= max",
                    g.min_lines_per_invoice, g.max_lines_per_invoice
                ),
            ));
        }
        let (lo, hi) = g.default_quantity_range;
        if lo == 0 || lo > hi {
            return Err(SynthError::config(
                "generator.default_quantity_range",
                format!("{}-{} must satisfy 1 <= low <= high", lo, hi),
            ));
        }
        if g.currency.trim().is_empty() {
            return Err(SynthError::config("generator.currency", "must not be empty"));
        }

        if self.ai.max_vendors == 0 {
            return Err(SynthError::config("ai.max_vendors", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(SynthError::config(
                "ai.temperature",
                format!("{} must be in [0, 2]", self.ai.temperature),
            ));
        }
        if !(self.ai.top_p > 0.0 && self.ai.top_p <= 1.0) {
            return Err(SynthError::config(
                "ai.top_p",
                format!("{} must be in (0, 1]", self.ai.top_p),
            ));
        }

        Ok(())
    }

    /// Loads `service_defaults.json` with `runtime_config.json` merged over
    /// it, then applies process environment overrides. Missing files are
    /// treated as empty.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let mut config = Self::load_files(config_dir)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_files(config_dir: &Path) -> Result<Self> {
        let mut merged = Value::Object(Default::default());
        for name in [SERVICE_DEFAULTS_FILE, RUNTIME_CONFIG_FILE] {
            let path = config_dir.join(name);
            if !path.exists() {
                debug!("Config layer {} not present", path.display());
                continue;
            }
            let layer: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
            json_patch::merge(&mut merged, &layer);
            info!("Loaded config layer {}", path.display());
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Applies recognised environment variables through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup("TIMEZONE") {
            self.service.timezone = tz;
        }
        if let Some(seed) = lookup("DEFAULT_SEED") {
            self.service.default_seed = seed
                .trim()
                .parse()
                .map_err(|_| SynthError::config("DEFAULT_SEED", format!("'{}' is not an integer", seed)))?;
        }
        if let Some(month) = lookup("FISCAL_YEAR_START_MONTH") {
            self.service.fiscal_year_start_month = month.trim().parse().map_err(|_| {
                SynthError::config(
                    "FISCAL_YEAR_START_MONTH",
                    format!("'{}' is not a month number", month),
                )
            })?;
        }
        if let Some(flag) = lookup("PAY_ON_DUE_DATE") {
            self.payments.pay_on_due_date = parse_flag("PAY_ON_DUE_DATE", &flag)?;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.service.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RUNS_DIR") {
            self.service.runs_dir = PathBuf::from(dir);
        }
        if let Some(code) = lookup("XERO_PAYMENT_ACCOUNT_CODE") {
            self.payments.account_code = code;
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RuntimeConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(SynthError::config(key, format!("'{}' is not a boolean", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.fiscal_year_start_month, 7);
        assert_eq!(config.generator.default_quantity_range, (1, 12));
        assert_eq!(config.payments.account_code, "101");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"generator": {"allow_price_variation": true}}"#).unwrap();
        assert!(config.generator.allow_price_variation);
        assert_eq!(config.generator.currency, "AUD");
        assert_eq!(config.ai.max_vendors, 6);
    }

    #[test]
    fn test_layers_merge_deeply() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SERVICE_DEFAULTS_FILE),
            r#"{"generator": {"currency": "NZD", "status": "DRAFT"}, "service": {"default_seed": 7}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(RUNTIME_CONFIG_FILE),
            r#"{"generator": {"status": "AUTHORISED"}, "force_no_tax": true}"#,
        )
        .unwrap();

        let config = RuntimeConfig::load_files(dir.path()).unwrap();
        assert_eq!(config.generator.currency, "NZD");
        assert_eq!(config.generator.status, "AUTHORISED");
        assert_eq!(config.service.default_seed, 7);
        assert!(config.force_no_tax);
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load_files(dir.path()).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FISCAL_YEAR_START_MONTH", "1"),
            ("PAY_ON_DUE_DATE", "true"),
            ("XERO_PAYMENT_ACCOUNT_CODE", "090"),
            ("DEFAULT_SEED", "1234"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.service.fiscal_year_start_month, 1);
        assert!(config.payments.pay_on_due_date);
        assert_eq!(config.payments.account_code, "090");
        assert_eq!(config.service.default_seed, 1234);
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "DEFAULT_SEED").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, SynthError::InvalidConfig { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RuntimeConfig::default();
        config.service.fiscal_year_start_month = 13;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.generator.min_lines_per_invoice = 4;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.generator.price_variation_pct = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = RuntimeConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("price_variation_pct"));
        assert!(schema_json.contains("fiscal_year_start_month"));
    }
}
