use crate::error::{Result, SynthError};
use chrono::{Datelike, Days, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::utils::{last_day_of_month, shift_month};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTerms {
    #[serde(alias = "DAYSAFTERBILLDATE")]
    DaysAfterBillDate { days: u32 },

    #[schemars(description = "Due on `day_of_month` of the month after the bill date, clamped to that month's length.")]
    #[serde(alias = "OFFOLLOWINGMONTH")]
    OfFollowingMonth { day_of_month: u32 },
}

impl Default for PaymentTerms {
    fn default() -> Self {
        Self::DaysAfterBillDate { days: 30 }
    }
}

impl PaymentTerms {
    /// Due date for a bill issued on `issue`. Never earlier than `issue`.
    pub fn due_date(&self, issue: NaiveDate) -> NaiveDate {
        let due = match self {
            PaymentTerms::DaysAfterBillDate { days } => {
                issue.checked_add_days(Days::new(u64::from(*days)))
            }
            PaymentTerms::OfFollowingMonth { day_of_month } => {
                let (year, month) = shift_month(issue.year(), issue.month(), 1);
                last_day_of_month(year, month).and_then(|last| {
                    let day = (*day_of_month).clamp(1, last.day());
                    NaiveDate::from_ymd_opt(year, month, day)
                })
            }
        };
        due.unwrap_or(issue).max(issue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    #[schemars(description = "Billing currency; falls back to generator.currency.")]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    #[serde(default, alias = "xero_contact_id")]
    pub contact_id: Option<String>,
    #[serde(default, alias = "xero_account_number")]
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Item {
    pub id: String,
    pub code: String,
    pub name: String,
    pub unit_price: Decimal,
    pub account_code: String,
    pub tax_code: String,
    #[serde(default)]
    #[schemars(description = "Item-specific variation; the unit price range is unit_price × [1 − pct, 1 + pct].")]
    pub price_variance_pct: Option<f64>,
    #[serde(default)]
    pub quantity_range: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaxCode {
    pub code: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorItems {
    pub vendor_id: String,
    #[serde(alias = "item_codes")]
    pub items: Vec<String>,
}

/// Serialized shape of a catalog, either one document or one file per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub vendors: Vec<Vendor>,
    pub items: Vec<Item>,
    #[serde(default)]
    pub tax_codes: Vec<TaxCode>,
    #[serde(default)]
    pub vendor_items: Vec<VendorItems>,
}

/// Read-only view of vendors, items and their assignments for one run.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    vendors: Vec<Vendor>,
    items: Vec<Item>,
    tax_rates: HashMap<String, Decimal>,
    item_index: HashMap<String, usize>,
    assignments: BTreeMap<String, Vec<usize>>,
}

impl CatalogIndex {
    pub fn new(document: CatalogDocument) -> Result<Self> {
        let CatalogDocument {
            vendors,
            items,
            tax_codes,
            vendor_items,
        } = document;

        let mut vendor_ids = HashSet::new();
        for vendor in &vendors {
            if !vendor_ids.insert(vendor.id.as_str()) {
                return Err(SynthError::InvalidCatalog(format!(
                    "duplicate vendor id {}",
                    vendor.id
                )));
            }
        }

        let mut item_index = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            if item_index.insert(item.id.clone(), idx).is_some() {
                return Err(SynthError::InvalidCatalog(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(SynthError::InvalidCatalog(format!(
                    "item {} has a negative unit price",
                    item.code
                )));
            }
            if let Some((lo, hi)) = item.quantity_range {
                if lo == 0 || lo > hi {
                    return Err(SynthError::InvalidCatalog(format!(
                        "item {} has invalid quantity range {}-{}",
                        item.code, lo, hi
                    )));
                }
            }
        }
        // Codes resolve too, but never shadow an id.
        for (idx, item) in items.iter().enumerate() {
            item_index.entry(item.code.clone()).or_insert(idx);
        }

        let tax_rates: HashMap<String, Decimal> = tax_codes
            .into_iter()
            .map(|t| (t.code, t.rate))
            .collect();
        if !tax_rates.is_empty() {
            if let Some(item) = items.iter().find(|i| !tax_rates.contains_key(&i.tax_code)) {
                return Err(SynthError::InvalidCatalog(format!(
                    "item {} refers to missing tax code {}",
                    item.code, item.tax_code
                )));
            }
        }

        let mut assignments: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for entry in vendor_items {
            if !vendor_ids.contains(entry.vendor_id.as_str()) {
                return Err(SynthError::InvalidCatalog(format!(
                    "vendor_items: unknown vendor {}",
                    entry.vendor_id
                )));
            }
            let assigned = assignments.entry(entry.vendor_id.clone()).or_default();
            for key in &entry.items {
                let idx = *item_index.get(key).ok_or_else(|| {
                    SynthError::InvalidCatalog(format!(
                        "vendor_items[{}]: unknown item {}",
                        entry.vendor_id, key
                    ))
                })?;
                if !assigned.contains(&idx) {
                    assigned.push(idx);
                }
            }
        }

        debug!(
            "Catalog indexed: {} vendors, {} items, {} vendor assignments",
            vendors.len(),
            items.len(),
            assignments.len()
        );

        Ok(Self {
            vendors,
            items,
            tax_rates,
            item_index,
            assignments,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::new(document)
    }

    /// Loads `vendors.json`, `items.json`, `tax_codes.json` and
    /// `vendor_items.json` from `dir`. The last two are optional.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct Vendors {
            vendors: Vec<Vendor>,
        }
        #[derive(Deserialize)]
        struct Items {
            items: Vec<Item>,
        }
        #[derive(Deserialize)]
        struct TaxCodes {
            tax_codes: Vec<TaxCode>,
        }
        #[derive(Deserialize)]
        struct Assignments {
            vendor_items: Vec<VendorItems>,
        }

        let combined = dir.join("catalog.json");
        if combined.exists() {
            return Self::from_json(&fs::read_to_string(combined)?);
        }

        let vendors: Vendors = serde_json::from_str(&fs::read_to_string(dir.join("vendors.json"))?)?;
        let items: Items = serde_json::from_str(&fs::read_to_string(dir.join("items.json"))?)?;

        let tax_path = dir.join("tax_codes.json");
        let tax_codes = if tax_path.exists() {
            serde_json::from_str::<TaxCodes>(&fs::read_to_string(tax_path)?)?.tax_codes
        } else {
            Vec::new()
        };

        let assignment_path = dir.join("vendor_items.json");
        let vendor_items = if assignment_path.exists() {
            serde_json::from_str::<Assignments>(&fs::read_to_string(assignment_path)?)?
                .vendor_items
        } else {
            Vec::new()
        };

        Self::new(CatalogDocument {
            vendors: vendors.vendors,
            items: items.items,
            tax_codes,
            vendor_items,
        })
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn vendor(&self, id: &str) -> Option<&Vendor> {
        self.vendors.iter().find(|v| v.id == id)
    }

    /// Looks up an item by id or code.
    pub fn item(&self, key: &str) -> Option<&Item> {
        self.item_index.get(key).map(|idx| &self.items[*idx])
    }

    /// Items assignable to `vendor_id`, in assignment order.
    pub fn items_for_vendor(&self, vendor_id: &str) -> Vec<&Item> {
        self.assignments
            .get(vendor_id)
            .map(|indices| indices.iter().map(|idx| &self.items[*idx]).collect())
            .unwrap_or_default()
    }

    pub fn tax_rate(&self, tax_code: &str) -> Decimal {
        self.tax_rates.get(tax_code).copied().unwrap_or(Decimal::ZERO)
    }

    /// `true` when `tax_code` is listed, or when the catalog lists no tax
    /// codes at all.
    pub fn knows_tax_code(&self, tax_code: &str) -> bool {
        self.tax_rates.is_empty() || self.tax_rates.contains_key(tax_code)
    }

    /// Vendor whose name or id opens `text` at a word boundary, longest
    /// name first. "Sparky Electricals for May" resolves to Sparky
    /// Electricals.
    pub fn vendor_at_start(&self, text: &str) -> Option<&Vendor> {
        let haystack = text.trim().to_lowercase();
        let mut best: Option<(usize, &Vendor)> = None;

        for vendor in &self.vendors {
            for key in [vendor.name.to_lowercase(), vendor.id.to_lowercase()] {
                let Some(rest) = haystack.strip_prefix(key.as_str()) else {
                    continue;
                };
                let at_boundary = rest.chars().next().map_or(true, |c| !c.is_alphanumeric());
                if !key.is_empty() && at_boundary && best.map_or(true, |(len, _)| key.len() > len) {
                    best = Some((key.len(), vendor));
                }
            }
        }
        best.map(|(_, vendor)| vendor)
    }

    /// Resolves a user-supplied vendor name to a catalog vendor.
    ///
    /// Exact (case-insensitive) id or name match first, then a unique
    /// case-insensitive prefix match to absorb near misses such as a dropped
    /// trailing letter.
    pub fn find_vendor(&self, name: &str) -> Option<&Vendor> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(vendor) = self
            .vendors
            .iter()
            .find(|v| v.id.to_lowercase() == needle || v.name.to_lowercase() == needle)
        {
            return Some(vendor);
        }

        let mut prefixed = self
            .vendors
            .iter()
            .filter(|v| v.name.to_lowercase().starts_with(&needle));
        match (prefixed.next(), prefixed.next()) {
            (Some(vendor), None) => Some(vendor),
            _ => None,
        }
    }
}
