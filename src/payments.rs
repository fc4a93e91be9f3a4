use crate::config::PaymentConfig;
use crate::error::{Result, SynthError};
use crate::schema::{InvoiceSkeleton, PaymentDirective, PaymentSelection};
use chrono::{Days, NaiveDate};
use log::{debug, info};
use rand::seq::index;
use rand::Rng;

/// Picks which invoices get paid and when.
///
/// `PayCount(n)` samples uniformly without replacement; selections come back
/// in invoice order.
pub fn select<R: Rng + ?Sized>(
    directive: PaymentDirective,
    invoices: &[InvoiceSkeleton],
    config: &PaymentConfig,
    rng: &mut R,
) -> Result<Vec<PaymentSelection>> {
    if invoices.is_empty() {
        return Ok(Vec::new());
    }

    let indices: Vec<usize> = match directive {
        PaymentDirective::PayNone => Vec::new(),
        PaymentDirective::PayAll => (0..invoices.len()).collect(),
        PaymentDirective::PayCount(n) => sample_indices(rng, invoices.len(), n as usize),
        PaymentDirective::Unspecified if config.pay_when_unspecified => {
            let k = rng.gen_range(0..=invoices.len());
            debug!("Payments unspecified; paying a random {} of {}", k, invoices.len());
            sample_indices(rng, invoices.len(), k)
        }
        PaymentDirective::Unspecified => Vec::new(),
    };

    let selections = indices
        .into_iter()
        .map(|idx| {
            let invoice = &invoices[idx];
            Ok(PaymentSelection {
                invoice_reference: invoice.reference.clone(),
                payment_date: payment_date(invoice, config, rng)?,
                amount: invoice.total(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Selected {} of {} invoices for payment ({:?})",
        selections.len(),
        invoices.len(),
        directive
    );
    Ok(selections)
}

fn sample_indices<R: Rng + ?Sized>(rng: &mut R, len: usize, amount: usize) -> Vec<usize> {
    let mut picked = index::sample(rng, len, amount.min(len)).into_vec();
    picked.sort_unstable();
    picked
}

/// Payment date for one invoice.
///
/// Due date when `pay_on_due_date`; otherwise uniform over
/// `[invoice_date, due_date]`, widened by `overdue_slack_days` past the due
/// date when `allow_overdue` is set.
pub fn payment_date<R: Rng + ?Sized>(
    invoice: &InvoiceSkeleton,
    config: &PaymentConfig,
    rng: &mut R,
) -> Result<NaiveDate> {
    if invoice.due_date < invoice.invoice_date {
        return Err(SynthError::InvalidPaymentWindow {
            reference: invoice.reference.clone(),
            invoice_date: invoice.invoice_date.to_string(),
            due_date: invoice.due_date.to_string(),
        });
    }

    if config.pay_on_due_date {
        return Ok(invoice.due_date);
    }

    let latest = if config.allow_overdue {
        invoice
            .due_date
            .checked_add_days(Days::new(u64::from(config.overdue_slack_days)))
            .unwrap_or(invoice.due_date)
    } else {
        invoice.due_date
    };

    let span = (latest - invoice.invoice_date).num_days();
    if span <= 0 {
        return Ok(invoice.due_date);
    }

    let offset = rng.gen_range(0..=span) as u64;
    Ok(invoice
        .invoice_date
        .checked_add_days(Days::new(offset))
        .unwrap_or(invoice.due_date))
}
