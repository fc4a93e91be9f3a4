use crate::catalog::CatalogIndex;
use crate::config::RuntimeConfig;
use crate::error::{Result, SynthError};
use crate::schema::InvoiceSkeleton;
use crate::utils::round_money;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Checks staged invoices against the catalog before they are written or
/// submitted.
///
/// Fails on the first invoice that has no lines, an unknown vendor or
/// contact, a due date before its invoice date, a duplicate reference, or a
/// line whose amount, quantity or tax code does not hold up.
pub fn validate_invoices(
    catalog: &CatalogIndex,
    invoices: &[InvoiceSkeleton],
    config: &RuntimeConfig,
) -> Result<()> {
    let mut references = HashSet::new();

    for invoice in invoices {
        let invalid = |details: String| SynthError::InvalidInvoice {
            reference: invoice.reference.clone(),
            details,
        };

        if !references.insert(invoice.reference.as_str()) {
            return Err(invalid("duplicate reference".to_string()));
        }

        let vendor = catalog
            .vendor(&invoice.vendor_id)
            .ok_or_else(|| invalid(format!("unknown vendor {}", invoice.vendor_id)))?;
        if let Some(contact) = &invoice.contact_id {
            if vendor.contact_id.as_deref() != Some(contact.as_str()) {
                return Err(invalid(format!(
                    "contact {} does not belong to vendor {}",
                    contact, vendor.id
                )));
            }
        }

        if invoice.line_items.is_empty() {
            return Err(invalid("no line items".to_string()));
        }
        if invoice.due_date < invoice.invoice_date {
            return Err(invalid(format!(
                "due date {} is before invoice date {}",
                invoice.due_date, invoice.invoice_date
            )));
        }

        for (idx, line) in invoice.line_items.iter().enumerate() {
            let line_no = idx + 1;
            if line.quantity == 0 {
                return Err(invalid(format!("line {} has zero quantity", line_no)));
            }

            let expected = round_money(line.unit_price * Decimal::from(line.quantity));
            if line.line_amount != expected {
                return Err(invalid(format!(
                    "line {} amount {} != {} x {}",
                    line_no, line.line_amount, line.quantity, line.unit_price
                )));
            }

            let exempt = config.force_no_tax && line.tax_code == config.generator.no_tax_code;
            if !exempt && !catalog.knows_tax_code(&line.tax_code) {
                return Err(invalid(format!(
                    "line {} has unknown tax code {}",
                    line_no, line.tax_code
                )));
            }
            if config.force_no_tax && !line.tax_amount.is_zero() {
                return Err(invalid(format!("line {} is taxed under force_no_tax", line_no)));
            }
        }
    }

    debug!("Validated {} invoices", invoices.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvoiceRunProcessor;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn catalog() -> CatalogIndex {
        CatalogIndex::from_json(
            r#"{
                "vendors": [
                    {"id": "VEND-SPARKY", "name": "Sparky Electricals", "contact_id": "c-1"},
                    {"id": "VEND-BUILD", "name": "BuildRight Cement"}
                ],
                "items": [
                    {"id": "i-1", "code": "CABLE", "name": "Copper cable", "unit_price": "12.50",
                     "account_code": "453", "tax_code": "INPUT"},
                    {"id": "i-2", "code": "CEMENT", "name": "Cement bag", "unit_price": "9.90",
                     "account_code": "453", "tax_code": "INPUT"}
                ],
                "tax_codes": [{"code": "INPUT", "rate": "0.10"}],
                "vendor_items": [
                    {"vendor_id": "VEND-SPARKY", "items": ["CABLE"]},
                    {"vendor_id": "VEND-BUILD", "items": ["CEMENT"]}
                ]
            }"#,
        )
        .unwrap()
    }

    fn planned() -> Vec<InvoiceSkeleton> {
        InvoiceRunProcessor::process(
            "Generate 4 bills last month",
            &catalog(),
            &RuntimeConfig::default(),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            9,
        )
        .unwrap()
        .invoices
    }

    fn rejection(invoices: &[InvoiceSkeleton]) -> String {
        match validate_invoices(&catalog(), invoices, &RuntimeConfig::default()) {
            Err(SynthError::InvalidInvoice { details, .. }) => details,
            other => panic!("expected InvalidInvoice, got {:?}", other),
        }
    }

    #[test]
    fn test_planned_invoices_pass() {
        assert!(validate_invoices(&catalog(), &planned(), &RuntimeConfig::default()).is_ok());
        assert!(validate_invoices(&catalog(), &[], &RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_vendor_and_contact() {
        let mut invoices = planned();
        invoices[0].vendor_id = "VEND-GHOST".to_string();
        assert!(rejection(&invoices).contains("unknown vendor"));

        let mut invoices = planned();
        invoices[0].vendor_id = "VEND-SPARKY".to_string();
        invoices[0].contact_id = Some("c-999".to_string());
        assert!(rejection(&invoices).contains("contact c-999"));
    }

    #[test]
    fn test_empty_lines_and_inverted_dates() {
        let mut invoices = planned();
        invoices[1].line_items.clear();
        assert_eq!(rejection(&invoices), "no line items");

        let mut invoices = planned();
        invoices[2].due_date = invoices[2].invoice_date.pred_opt().unwrap();
        assert!(rejection(&invoices).contains("before invoice date"));
    }

    #[test]
    fn test_line_amount_must_match_quantity_and_price() {
        let mut invoices = planned();
        invoices[0].line_items[0].line_amount += Decimal::from_str("0.01").unwrap();
        assert!(rejection(&invoices).contains("line 1 amount"));
    }

    #[test]
    fn test_unknown_tax_code_and_duplicate_reference() {
        let mut invoices = planned();
        invoices[0].line_items[0].tax_code = "GST".to_string();
        assert!(rejection(&invoices).contains("unknown tax code GST"));

        let mut invoices = planned();
        invoices[3].reference = invoices[0].reference.clone();
        assert_eq!(rejection(&invoices), "duplicate reference");
    }

    #[test]
    fn test_no_tax_code_is_accepted_under_force_no_tax() {
        let mut config = RuntimeConfig::default();
        config.force_no_tax = true;
        let run = InvoiceRunProcessor::process(
            "Generate 3 bills last month",
            &catalog(),
            &config,
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            4,
        )
        .unwrap();
        assert!(run
            .invoices
            .iter()
            .flat_map(|i| &i.line_items)
            .all(|l| l.tax_code == "EXEMPTEXPENSES"));
        assert!(validate_invoices(&catalog(), &run.invoices, &config).is_ok());
        assert!(rejection(&run.invoices).contains("unknown tax code EXEMPTEXPENSES"));
    }
}
