use crate::error::{Result, SynthError};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Returns `(year, month)` shifted by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

/// Full calendar month containing `(year, month)` as an inclusive range.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = last_day_of_month(year, month)?;
    Some((start, end))
}

/// Inclusive range spanning `months` calendar months starting at `(year, month)`.
pub fn months_span(year: i32, month: u32, months: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (end_year, end_month) = shift_month(year, month, months - 1);
    let end = last_day_of_month(end_year, end_month)?;
    Some((start, end))
}

pub fn validate_fiscal_year_start_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(SynthError::config(
            "service.fiscal_year_start_month",
            format!("{} must be between 1 and 12", month),
        ));
    }
    Ok(())
}

/// Year in which the fiscal year containing `date` starts.
pub fn fiscal_year_start_year(date: NaiveDate, fiscal_year_start_month: u32) -> i32 {
    if date.month() >= fiscal_year_start_month {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Returns the 0-based quarter index of `date` within its fiscal year.
///
/// # Examples
/// - FY starts Jan (1): Jan-Mar = 0, Oct-Dec = 3
/// - FY starts July (7): Jul-Sep = 0, Jan-Mar = 2
pub fn fiscal_quarter_index(date: NaiveDate, fiscal_year_start_month: u32) -> u32 {
    let offset = (date.month() + 12 - fiscal_year_start_month) % 12;
    offset / 3
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Rounds to cents with half-up (away from zero) semantics.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Uppercase ASCII slug of `name`, truncated to `max_len` characters.
pub fn slug(name: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let truncated: String = out.chars().take(max_len).collect();
    truncated.trim_end_matches('-').to_string()
}
