use crate::periods::{DatePhrase, DateWindow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "directive", content = "count", rename_all = "snake_case")]
pub enum PaymentDirective {
    #[default]
    #[schemars(description = "The request said nothing about payments; config decides.")]
    Unspecified,

    #[schemars(description = "Pay exactly this many of the generated invoices.")]
    PayCount(u32),

    PayAll,

    PayNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LineRange {
    pub min: u32,
    pub max: u32,
}

impl LineRange {
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

/// Structured form of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationIntent {
    #[schemars(description = "Number of invoices to generate.")]
    pub invoice_count: u32,

    #[schemars(description = "Date expression, resolved against the reference date at planning time.")]
    pub date_window: DatePhrase,

    #[serde(default)]
    #[schemars(description = "Vendor ids to draw from. Empty means every catalog vendor is eligible.")]
    pub vendor_filter: BTreeSet<String>,

    #[serde(default)]
    pub payment_directive: PaymentDirective,

    #[serde(default)]
    #[schemars(description = "Optional bounds on line items per invoice.")]
    pub line_range: Option<LineRange>,
}

impl GenerationIntent {
    pub fn new(invoice_count: u32, date_window: DatePhrase) -> Self {
        Self {
            invoice_count,
            date_window,
            vendor_filter: BTreeSet::new(),
            payment_directive: PaymentDirective::Unspecified,
            line_range: None,
        }
    }

    pub fn with_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_filter.insert(vendor_id.into());
        self
    }

    pub fn with_payment(mut self, directive: PaymentDirective) -> Self {
        self.payment_directive = directive;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LineItem {
    pub item_id: String,
    pub item_code: String,
    /// Catalog item name unless replaced by description enrichment.
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// `quantity × unit_price`, rounded to cents.
    pub line_amount: Decimal,
    pub account_code: String,
    pub tax_code: String,
    pub tax_amount: Decimal,
}

/// A staged invoice, not yet submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceSkeleton {
    pub reference: String,
    pub invoice_number: String,
    pub vendor_id: String,
    pub contact_id: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub status: String,
    pub line_items: Vec<LineItem>,
}

impl InvoiceSkeleton {
    pub fn subtotal(&self) -> Decimal {
        self.line_items.iter().map(|l| l.line_amount).sum()
    }

    pub fn tax_total(&self) -> Decimal {
        self.line_items.iter().map(|l| l.tax_amount).sum()
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax_total()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaymentSelection {
    pub invoice_reference: String,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
}

/// Non-fatal conditions resolved by a documented fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationWarning {
    UnmatchedVendor {
        name: String,
    },
    DefaultedDateWindow,
    PayCountClamped {
        requested: u32,
        available: u32,
    },
    VendorFilterWidened {
        requested: Vec<String>,
    },
    VendorWithoutItems {
        vendor_id: String,
    },
    LineRangeClamped {
        vendor_id: String,
        requested: LineRange,
        applied: LineRange,
    },
    WindowClampedToReference {
        original: DateWindow,
        clamped: DateWindow,
    },
    DescriptionFallback {
        item_name: String,
        reason: String,
    },
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationWarning::UnmatchedVendor { name } => {
                write!(f, "Vendor '{}' is not in the catalog; using all vendors", name)
            }
            GenerationWarning::DefaultedDateWindow => {
                write!(f, "No date phrase recognized; defaulting to today")
            }
            GenerationWarning::PayCountClamped {
                requested,
                available,
            } => write!(
                f,
                "Requested {} payments but only {} invoices exist; paying {}",
                requested, available, available
            ),
            GenerationWarning::VendorFilterWidened { requested } => write!(
                f,
                "Vendor filter [{}] matched no catalog vendor; widened to all vendors",
                requested.join(", ")
            ),
            GenerationWarning::VendorWithoutItems { vendor_id } => {
                write!(f, "Vendor {} has no assignable items and was skipped", vendor_id)
            }
            GenerationWarning::LineRangeClamped {
                vendor_id,
                requested,
                applied,
            } => write!(
                f,
                "Line range {}-{} clamped to {}-{} for vendor {}",
                requested.min, requested.max, applied.min, applied.max, vendor_id
            ),
            GenerationWarning::WindowClampedToReference { original, clamped } => write!(
                f,
                "Date window {} clamped to {}",
                original, clamped
            ),
            GenerationWarning::DescriptionFallback { item_name, reason } => write!(
                f,
                "Description for '{}' fell back to the catalog name: {}",
                item_name, reason
            ),
        }
    }
}
