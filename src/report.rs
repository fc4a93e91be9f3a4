//! Run artifacts: CSV tables for review, ledger-shaped JSON payloads and a
//! generation report, all under `<runs_dir>/<run_id>/`.

use crate::catalog::CatalogIndex;
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::periods::DateWindow;
use crate::schema::{GenerationIntent, GenerationWarning, InvoiceSkeleton, PaymentDirective};
use crate::validation::validate_invoices;
use crate::GenerationRun;
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const INVOICES_CSV: &str = "invoices.csv";
pub const INVOICE_LINES_CSV: &str = "invoice_lines.csv";
pub const PLAN_JSON: &str = "plan.json";
pub const LEDGER_INVOICES_JSON: &str = "ledger_invoices.json";
pub const LEDGER_INVOICES_META_JSON: &str = "ledger_invoices_with_meta.json";
pub const TO_PAY_JSON: &str = "to_pay.json";
pub const PAYMENTS_JSON: &str = "payments.json";
pub const REPORT_JSON: &str = "generation_report.json";

#[derive(Debug, Serialize)]
struct InvoiceRow<'a> {
    reference: &'a str,
    invoice_number: &'a str,
    vendor_id: &'a str,
    contact_id: Option<&'a str>,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    currency: &'a str,
    status: &'a str,
    line_count: usize,
    subtotal: Decimal,
    tax_total: Decimal,
    total: Decimal,
}

#[derive(Debug, Serialize)]
struct InvoiceLineRow<'a> {
    reference: &'a str,
    line_no: usize,
    item_id: &'a str,
    item_code: &'a str,
    description: &'a str,
    quantity: u32,
    unit_price: Decimal,
    line_amount: Decimal,
    account_code: &'a str,
    tax_code: &'a str,
    tax_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerContact<'a> {
    #[serde(rename = "ContactID", skip_serializing_if = "Option::is_none")]
    contact_id: Option<&'a str>,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerLineItem<'a> {
    description: &'a str,
    quantity: u32,
    unit_amount: Decimal,
    item_code: &'a str,
    account_code: &'a str,
    tax_type: &'a str,
    tax_amount: Decimal,
    line_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerInvoice<'a> {
    #[serde(rename = "Type")]
    kind: &'static str,
    contact: LedgerContact<'a>,
    date: NaiveDate,
    due_date: NaiveDate,
    invoice_number: &'a str,
    reference: &'a str,
    currency_code: &'a str,
    status: &'a str,
    line_amount_types: &'static str,
    line_items: Vec<LedgerLineItem<'a>>,
}

#[derive(Debug, Serialize)]
struct InvoiceMeta<'a> {
    run_id: &'a str,
    seed: u64,
    vendor_id: &'a str,
    total: Decimal,
}

#[derive(Debug, Serialize)]
struct LedgerInvoiceWithMeta<'a> {
    #[serde(flatten)]
    invoice: LedgerInvoice<'a>,
    #[serde(rename = "_meta")]
    meta: InvoiceMeta<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerInvoices<T> {
    invoices: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InvoiceRef<'a> {
    invoice_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AccountRef<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerPayment<'a> {
    invoice: InvoiceRef<'a>,
    account: AccountRef<'a>,
    date: NaiveDate,
    amount: Decimal,
    reference: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LedgerPayments<'a> {
    payments: Vec<LedgerPayment<'a>>,
}

#[derive(Debug, Serialize)]
struct ToPay<'a> {
    run_id: &'a str,
    references: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct PlanRecord<'a> {
    run_id: &'a str,
    query: &'a str,
    seed: u64,
    reference_date: NaiveDate,
    intent: &'a GenerationIntent,
    window: DateWindow,
}

#[derive(Debug, Serialize)]
struct PaymentInstructions {
    directive: PaymentDirective,
    selected: usize,
    pay_on_due_date: bool,
    allow_overdue: bool,
    account_code: String,
}

#[derive(Debug, Serialize)]
struct GenerationReport<'a> {
    run_id: &'a str,
    query: &'a str,
    seed: u64,
    reference_date: NaiveDate,
    invoice_count: usize,
    window: DateWindow,
    grand_total: Decimal,
    config: &'a RuntimeConfig,
    payment_instructions: PaymentInstructions,
    warnings: &'a [GenerationWarning],
    artifacts: Vec<String>,
}

/// Files written for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn ledger_invoice<'a>(invoice: &'a InvoiceSkeleton, catalog: &'a CatalogIndex, no_tax: bool) -> LedgerInvoice<'a> {
    let name = catalog
        .vendor(&invoice.vendor_id)
        .map(|v| v.name.as_str())
        .unwrap_or(invoice.vendor_id.as_str());

    LedgerInvoice {
        kind: "ACCPAY",
        contact: LedgerContact {
            contact_id: invoice.contact_id.as_deref(),
            name,
        },
        date: invoice.invoice_date,
        due_date: invoice.due_date,
        invoice_number: &invoice.invoice_number,
        reference: &invoice.reference,
        currency_code: &invoice.currency,
        status: &invoice.status,
        line_amount_types: if no_tax { "NoTax" } else { "Exclusive" },
        line_items: invoice
            .line_items
            .iter()
            .map(|l| LedgerLineItem {
                description: &l.description,
                quantity: l.quantity,
                unit_amount: l.unit_price,
                item_code: &l.item_code,
                account_code: &l.account_code,
                tax_type: &l.tax_code,
                tax_amount: l.tax_amount,
                line_amount: l.line_amount,
            })
            .collect(),
    }
}

/// Writes every artifact for `run` into `<runs_dir>/<run_id>/`.
///
/// Nothing is written unless the run's invoices pass [`validate_invoices`].
pub fn write_run_artifacts(
    runs_dir: &Path,
    run: &GenerationRun,
    catalog: &CatalogIndex,
    config: &RuntimeConfig,
) -> Result<RunArtifacts> {
    validate_invoices(catalog, &run.invoices, config)?;

    let dir = runs_dir.join(&run.run_id);
    fs::create_dir_all(&dir)?;
    let mut files = Vec::new();

    let path = dir.join(INVOICES_CSV);
    let mut writer = csv::Writer::from_path(&path)?;
    for invoice in &run.invoices {
        writer.serialize(InvoiceRow {
            reference: &invoice.reference,
            invoice_number: &invoice.invoice_number,
            vendor_id: &invoice.vendor_id,
            contact_id: invoice.contact_id.as_deref(),
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            currency: &invoice.currency,
            status: &invoice.status,
            line_count: invoice.line_items.len(),
            subtotal: invoice.subtotal(),
            tax_total: invoice.tax_total(),
            total: invoice.total(),
        })?;
    }
    writer.flush()?;
    files.push(path);

    let path = dir.join(INVOICE_LINES_CSV);
    let mut writer = csv::Writer::from_path(&path)?;
    for invoice in &run.invoices {
        for (idx, line) in invoice.line_items.iter().enumerate() {
            writer.serialize(InvoiceLineRow {
                reference: &invoice.reference,
                line_no: idx + 1,
                item_id: &line.item_id,
                item_code: &line.item_code,
                description: &line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_amount: line.line_amount,
                account_code: &line.account_code,
                tax_code: &line.tax_code,
                tax_amount: line.tax_amount,
            })?;
        }
    }
    writer.flush()?;
    files.push(path);

    let path = dir.join(PLAN_JSON);
    write_json(
        &path,
        &PlanRecord {
            run_id: &run.run_id,
            query: &run.query,
            seed: run.seed,
            reference_date: run.reference_date,
            intent: &run.intent,
            window: run.window,
        },
    )?;
    files.push(path);

    let path = dir.join(LEDGER_INVOICES_JSON);
    write_json(
        &path,
        &LedgerInvoices {
            invoices: run
                .invoices
                .iter()
                .map(|i| ledger_invoice(i, catalog, config.force_no_tax))
                .collect(),
        },
    )?;
    files.push(path);

    if config.artifacts.include_meta_json {
        let path = dir.join(LEDGER_INVOICES_META_JSON);
        write_json(
            &path,
            &LedgerInvoices {
                invoices: run
                    .invoices
                    .iter()
                    .map(|i| LedgerInvoiceWithMeta {
                        invoice: ledger_invoice(i, catalog, config.force_no_tax),
                        meta: InvoiceMeta {
                            run_id: &run.run_id,
                            seed: run.seed,
                            vendor_id: &i.vendor_id,
                            total: i.total(),
                        },
                    })
                    .collect(),
            },
        )?;
        files.push(path);
    }

    let path = dir.join(TO_PAY_JSON);
    write_json(
        &path,
        &ToPay {
            run_id: &run.run_id,
            references: run
                .payments
                .iter()
                .map(|p| p.invoice_reference.as_str())
                .collect(),
        },
    )?;
    files.push(path);

    let numbers: HashMap<&str, &str> = run
        .invoices
        .iter()
        .map(|i| (i.reference.as_str(), i.invoice_number.as_str()))
        .collect();
    let path = dir.join(PAYMENTS_JSON);
    write_json(
        &path,
        &LedgerPayments {
            payments: run
                .payments
                .iter()
                .map(|p| LedgerPayment {
                    invoice: InvoiceRef {
                        invoice_number: numbers
                            .get(p.invoice_reference.as_str())
                            .copied()
                            .unwrap_or(p.invoice_reference.as_str()),
                    },
                    account: AccountRef {
                        code: &config.payments.account_code,
                    },
                    date: p.payment_date,
                    amount: p.amount,
                    reference: &p.invoice_reference,
                })
                .collect(),
        },
    )?;
    files.push(path);

    let path = dir.join(REPORT_JSON);
    let mut artifacts: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    artifacts.push(path.display().to_string());
    write_json(
        &path,
        &GenerationReport {
            run_id: &run.run_id,
            query: &run.query,
            seed: run.seed,
            reference_date: run.reference_date,
            invoice_count: run.invoices.len(),
            window: run.window,
            grand_total: run.invoices.iter().map(InvoiceSkeleton::total).sum(),
            config,
            payment_instructions: PaymentInstructions {
                directive: run.intent.payment_directive,
                selected: run.payments.len(),
                pay_on_due_date: config.payments.pay_on_due_date,
                allow_overdue: config.payments.allow_overdue,
                account_code: config.payments.account_code.clone(),
            },
            warnings: &run.warnings,
            artifacts,
        },
    )?;
    files.push(path);

    info!("Wrote {} artifacts to {}", files.len(), dir.display());
    Ok(RunArtifacts { dir, files })
}
