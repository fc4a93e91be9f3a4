//! Optional line-item description enrichment.
//!
//! A [`LineDescriber`] turns a catalog item name into prose. Enrichment only
//! ever replaces [`LineItem::description`](crate::schema::LineItem); a
//! failing describer leaves the catalog name in place and yields a
//! [`GenerationWarning::DescriptionFallback`].

use crate::error::Result;
use crate::schema::{GenerationWarning, InvoiceSkeleton};
use log::{debug, warn};
use std::collections::HashMap;

pub const ITEM_NAME_PLACEHOLDER: &str = "{item_name}";

pub trait LineDescriber {
    fn describe(&self, item_name: &str, prompt_template: &str) -> Result<String>;
}

impl<F> LineDescriber for F
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn describe(&self, item_name: &str, prompt_template: &str) -> Result<String> {
        self(item_name, prompt_template)
    }
}

pub fn render_prompt(template: &str, item_name: &str) -> String {
    template.replace(ITEM_NAME_PLACEHOLDER, item_name)
}

/// Trims model output to a single clean line, or `None` if nothing usable
/// remains.
pub fn clean_description(raw: &str) -> Option<String> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Replaces each line description via `describer`, one call per distinct
/// item name.
pub fn enrich_descriptions<D: LineDescriber + ?Sized>(
    invoices: &mut [InvoiceSkeleton],
    describer: &D,
    prompt_template: &str,
) -> Vec<GenerationWarning> {
    let mut cache: HashMap<String, Option<String>> = HashMap::new();
    let mut warnings = Vec::new();

    for line in invoices.iter_mut().flat_map(|i| i.line_items.iter_mut()) {
        let name = line.description.clone();
        let described = cache.entry(name.clone()).or_insert_with(|| {
            match describer.describe(&name, prompt_template) {
                Ok(text) => match clean_description(&text) {
                    Some(clean) => Some(clean),
                    None => {
                        warnings.push(GenerationWarning::DescriptionFallback {
                            item_name: name.clone(),
                            reason: "empty description".to_string(),
                        });
                        None
                    }
                },
                Err(e) => {
                    warn!("Description for '{}' failed: {}", name, e);
                    warnings.push(GenerationWarning::DescriptionFallback {
                        item_name: name.clone(),
                        reason: e.to_string(),
                    });
                    None
                }
            }
        });

        if let Some(text) = described {
            line.description = text.clone();
        }
    }

    debug!(
        "Described {} distinct items, {} fell back",
        cache.len(),
        warnings.len()
    );
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthError;
    use crate::schema::LineItem;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn line(name: &str) -> LineItem {
        LineItem {
            item_id: name.to_lowercase(),
            item_code: name.to_uppercase(),
            description: name.to_string(),
            quantity: 2,
            unit_price: Decimal::new(1050, 2),
            line_amount: Decimal::new(2100, 2),
            account_code: "453".to_string(),
            tax_code: "INPUT".to_string(),
            tax_amount: Decimal::new(210, 2),
        }
    }

    fn invoice(names: &[&str]) -> InvoiceSkeleton {
        InvoiceSkeleton {
            reference: "AP-1".to_string(),
            invoice_number: "X-1".to_string(),
            vendor_id: "V".to_string(),
            contact_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            currency: "AUD".to_string(),
            status: "AUTHORISED".to_string(),
            line_items: names.iter().map(|n| line(n)).collect(),
        }
    }

    #[test]
    fn test_render_prompt() {
        assert_eq!(
            render_prompt("Describe '{item_name}' briefly.", "Copper cable"),
            "Describe 'Copper cable' briefly."
        );
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(
            clean_description("\n  \"Heavy-duty copper cable\"  \nextra").as_deref(),
            Some("Heavy-duty copper cable")
        );
        assert_eq!(clean_description("   \n "), None);
    }

    #[test]
    fn test_enrichment_keeps_amounts() {
        let mut invoices = vec![invoice(&["Cable", "Switch", "Cable"])];
        let before = invoices[0].clone();
        let describer =
            |name: &str, template: &str| -> Result<String> { Ok(format!("{} ({})", render_prompt(template, name), "ok")) };

        let warnings = enrich_descriptions(&mut invoices, &describer, "Nice {item_name}");
        assert!(warnings.is_empty());
        assert_eq!(invoices[0].line_items[0].description, "Nice Cable (ok)");
        assert_eq!(invoices[0].line_items[1].description, "Nice Switch (ok)");
        assert_eq!(invoices[0].total(), before.total());
        assert_eq!(invoices[0].line_items[0].quantity, before.line_items[0].quantity);
    }

    #[test]
    fn test_failures_fall_back_to_catalog_name() {
        let mut invoices = vec![invoice(&["Cable", "Switch"])];
        let describer = |name: &str, _: &str| -> Result<String> {
            if name == "Cable" {
                Err(SynthError::Description("service unavailable".to_string()))
            } else {
                Ok(String::new())
            }
        };

        let warnings = enrich_descriptions(&mut invoices, &describer, "{item_name}");
        assert_eq!(invoices[0].line_items[0].description, "Cable");
        assert_eq!(invoices[0].line_items[1].description, "Switch");
        assert_eq!(warnings.len(), 2);
    }
}
