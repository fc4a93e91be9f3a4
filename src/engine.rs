use crate::catalog::{CatalogIndex, Item, Vendor};
use crate::config::RuntimeConfig;
use crate::error::{Result, SynthError};
use crate::periods::DateWindow;
use crate::schema::{GenerationIntent, GenerationWarning, InvoiceSkeleton, LineItem, LineRange};
use crate::utils::{round_money, slug};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Result of planning one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub window: DateWindow,
    pub invoices: Vec<InvoiceSkeleton>,
    pub warnings: Vec<GenerationWarning>,
}

/// Turns a [`GenerationIntent`] into invoice skeletons.
///
/// All randomness comes from the generator handed to [`Planner::plan`], in a
/// fixed draw order, so the same seed reproduces the same invoices.
pub struct Planner<'a> {
    catalog: &'a CatalogIndex,
    config: &'a RuntimeConfig,
}

// Per-run bookkeeping while invoices are drawn
struct PlanState {
    run_tag: String,
    next_number: BTreeMap<String, u32>,
    clamped_vendors: HashSet<String>,
    warnings: Vec<GenerationWarning>,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a CatalogIndex, config: &'a RuntimeConfig) -> Self {
        Self { catalog, config }
    }

    pub fn plan<R: Rng + ?Sized>(
        &self,
        intent: &GenerationIntent,
        reference_date: NaiveDate,
        rng: &mut R,
    ) -> Result<PlanOutcome> {
        let generator = &self.config.generator;
        let mut warnings = Vec::new();

        let mut window = intent
            .date_window
            .resolve(self.config.service.fiscal_year_start_month, reference_date)?;
        if generator.limit_to_reference_date {
            if let Some(clamped) = window.clamp_to(reference_date) {
                warnings.push(GenerationWarning::WindowClampedToReference {
                    original: window,
                    clamped,
                });
                window = clamped;
            }
        }

        if intent.invoice_count == 0 {
            info!("Invoice count is 0; nothing to plan for {}", window);
            return Ok(PlanOutcome {
                window,
                invoices: Vec::new(),
                warnings,
            });
        }

        let dates = window.eligible_dates(generator.business_days_only);
        if dates.is_empty() {
            return Err(SynthError::EmptyWindow {
                start: window.start.to_string(),
                end: window.end.to_string(),
                business_days_only: generator.business_days_only,
            });
        }

        let pool = self.vendor_pool(intent, rng, &mut warnings)?;

        info!(
            "Planning {} invoices across {} vendors, {} eligible dates in {}",
            intent.invoice_count,
            pool.len(),
            dates.len(),
            window
        );

        let mut state = PlanState {
            run_tag: format!("{:06X}", rng.gen_range(0..0x100_0000u32)),
            next_number: BTreeMap::new(),
            clamped_vendors: HashSet::new(),
            warnings,
        };

        let mut invoices = Vec::with_capacity(intent.invoice_count as usize);
        for seq in 0..intent.invoice_count as usize {
            let vendor = pool[seq % pool.len()];
            let invoice_date = dates[rng.gen_range(0..dates.len())];
            let invoice = self.build_invoice(intent, vendor, invoice_date, seq, &mut state, rng);
            debug!(
                "{} {} {} total {}",
                invoice.reference,
                invoice.vendor_id,
                invoice.invoice_date,
                invoice.total()
            );
            invoices.push(invoice);
        }

        for warning in &state.warnings {
            warn!("{}", warning);
        }

        Ok(PlanOutcome {
            window,
            invoices,
            warnings: state.warnings,
        })
    }

    /// Eligible vendors in draw order.
    ///
    /// Filter ∩ catalog (or the whole catalog when that is empty), minus
    /// vendors with nothing to sell. Without an explicit filter the pool is
    /// capped at `ai.max_vendors`. The pool is shuffled once and invoices
    /// take vendors round-robin from it.
    fn vendor_pool<R: Rng + ?Sized>(
        &self,
        intent: &GenerationIntent,
        rng: &mut R,
        warnings: &mut Vec<GenerationWarning>,
    ) -> Result<Vec<&'a Vendor>> {
        let catalog = self.catalog;
        let filtered: Vec<&Vendor> = catalog
            .vendors()
            .iter()
            .filter(|v| intent.vendor_filter.contains(&v.id))
            .collect();

        let explicit = !filtered.is_empty();
        let candidates: Vec<&Vendor> = if explicit {
            filtered
        } else {
            if !intent.vendor_filter.is_empty() {
                warnings.push(GenerationWarning::VendorFilterWidened {
                    requested: intent.vendor_filter.iter().cloned().collect(),
                });
            }
            catalog.vendors().iter().collect()
        };

        let mut pool: Vec<&Vendor> = Vec::with_capacity(candidates.len());
        for vendor in candidates {
            if catalog.items_for_vendor(&vendor.id).is_empty() {
                warnings.push(GenerationWarning::VendorWithoutItems {
                    vendor_id: vendor.id.clone(),
                });
            } else {
                pool.push(vendor);
            }
        }

        if pool.is_empty() {
            return Err(SynthError::NoEligibleVendor(if explicit {
                "none of the requested vendors has assignable items".to_string()
            } else {
                "no catalog vendor has assignable items".to_string()
            }));
        }

        let cap = self.config.ai.max_vendors.max(1);
        if !explicit && pool.len() > cap {
            let mut keep = index::sample(rng, pool.len(), cap).into_vec();
            keep.sort_unstable();
            pool = keep.into_iter().map(|idx| pool[idx]).collect();
        }

        pool.shuffle(rng);
        Ok(pool)
    }

    fn line_bounds(
        &self,
        intent: &GenerationIntent,
        vendor: &Vendor,
        available: usize,
        state: &mut PlanState,
    ) -> LineRange {
        let generator = &self.config.generator;
        let requested = intent.line_range.unwrap_or(LineRange {
            min: generator.min_lines_per_invoice,
            max: generator.max_lines_per_invoice,
        });

        let available = u32::try_from(available).unwrap_or(u32::MAX).max(1);
        let min = requested.min.clamp(1, available);
        let applied = LineRange {
            min,
            max: requested.max.clamp(min, available),
        };

        // Config bounds narrow silently; only an explicit request is reported.
        if intent.line_range.is_some()
            && applied != requested
            && state.clamped_vendors.insert(vendor.id.clone())
        {
            state.warnings.push(GenerationWarning::LineRangeClamped {
                vendor_id: vendor.id.clone(),
                requested,
                applied,
            });
        }
        applied
    }

    fn build_invoice<R: Rng + ?Sized>(
        &self,
        intent: &GenerationIntent,
        vendor: &Vendor,
        invoice_date: NaiveDate,
        seq: usize,
        state: &mut PlanState,
        rng: &mut R,
    ) -> InvoiceSkeleton {
        let generator = &self.config.generator;
        let items = self.catalog.items_for_vendor(&vendor.id);

        let bounds = self.line_bounds(intent, vendor, items.len(), state);
        let line_count = rng.gen_range(bounds.min..=bounds.max) as usize;
        let line_items: Vec<LineItem> = items
            .choose_multiple(rng, line_count)
            .cloned()
            .collect::<Vec<&Item>>()
            .into_iter()
            .map(|item| self.build_line(item, rng))
            .collect();

        let number = state
            .next_number
            .entry(vendor.id.clone())
            .or_insert_with(|| rng.gen_range(1000..=9999));
        *number += 1;
        let vendor_tag = vendor.id.strip_prefix("VEND-").unwrap_or(&vendor.id);
        let invoice_number =
            format!("{}-{}-{:04}", vendor_tag, invoice_date.format("%Y%m"), number);

        InvoiceSkeleton {
            reference: format!("AP-{}-{}-{:04}", state.run_tag, slug(&vendor.name, 10), seq + 1),
            invoice_number,
            vendor_id: vendor.id.clone(),
            contact_id: vendor.contact_id.clone(),
            invoice_date,
            due_date: vendor.payment_terms.due_date(invoice_date),
            currency: vendor
                .currency
                .clone()
                .unwrap_or_else(|| generator.currency.clone()),
            status: generator.status.clone(),
            line_items,
        }
    }

    fn build_line<R: Rng + ?Sized>(&self, item: &Item, rng: &mut R) -> LineItem {
        let generator = &self.config.generator;

        let (lo, hi) = item.quantity_range.unwrap_or(generator.default_quantity_range);
        let quantity = rng.gen_range(lo.max(1)..=hi.max(lo).max(1));

        let unit_price = if generator.allow_price_variation {
            let pct = item
                .price_variance_pct
                .unwrap_or(generator.price_variation_pct)
                .clamp(0.0, 1.0);
            let multiplier = Uniform::new_inclusive(1.0 - pct, 1.0 + pct).sample(rng);
            let factor = Decimal::from_f64(multiplier).unwrap_or(Decimal::ONE);
            round_money(item.unit_price * factor).max(Decimal::ZERO)
        } else {
            item.unit_price
        };

        let line_amount = round_money(unit_price * Decimal::from(quantity));

        let (tax_code, tax_amount) = if self.config.force_no_tax {
            (generator.no_tax_code.clone(), Decimal::ZERO)
        } else {
            let rate = self.catalog.tax_rate(&item.tax_code);
            (item.tax_code.clone(), round_money(line_amount * rate))
        };

        LineItem {
            item_id: item.id.clone(),
            item_code: item.code.clone(),
            description: item.name.clone(),
            quantity,
            unit_price,
            line_amount,
            account_code: item.account_code.clone(),
            tax_code,
            tax_amount,
        }
    }
}

pub fn plan<R: Rng + ?Sized>(
    intent: &GenerationIntent,
    catalog: &CatalogIndex,
    config: &RuntimeConfig,
    reference_date: NaiveDate,
    rng: &mut R,
) -> Result<PlanOutcome> {
    Planner::new(catalog, config).plan(intent, reference_date, rng)
}

/// Plans with a fresh generator seeded from `seed`.
pub fn plan_with_seed(
    intent: &GenerationIntent,
    catalog: &CatalogIndex,
    config: &RuntimeConfig,
    reference_date: NaiveDate,
    seed: u64,
) -> Result<PlanOutcome> {
    let mut rng = StdRng::seed_from_u64(seed);
    plan(intent, catalog, config, reference_date, &mut rng)
}
