//! Date window resolution.
//!
//! Turns a recognized date phrase ("Q1 2023", "last month", "20-05-2025 to
//! 31-05-2025") into a concrete inclusive [`DateWindow`]. Resolution is a pure
//! function of the phrase, the fiscal year start month and an injected
//! reference date; nothing here reads the wall clock except
//! [`reference_date_for`], which the CLI uses to compute "today".

use crate::error::{Result, SynthError};
use crate::utils::{
    days_in_range, fiscal_quarter_index, fiscal_year_start_year, is_business_day, month_bounds,
    months_span, shift_month, validate_fiscal_year_start_month, week_start,
};
use chrono::{Datelike, Days, FixedOffset, Local, NaiveDate, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum NamedPeriod {
    /// Fiscal quarter `quarter` (1-4) of the fiscal year starting in `year`.
    Quarter { quarter: u32, year: i32 },
    /// Twelve months starting at the fiscal year start month of `year`.
    FinancialYear { year: i32 },
    CalendarYear { year: i32 },
    /// Calendar month; without a year the most recent occurrence is used.
    Month { month: u32, year: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum RelativePeriod {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisFinancialYear,
    LastFinancialYear,
    LastDays { days: u32 },
}

/// A recognized but not yet resolved date expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatePhrase {
    /// Calendar dates as written (`DD-MM-YYYY`, `DD/MM/YYYY` or `YYYY-MM-DD`).
    Explicit { from: String, to: Option<String> },
    Named(NamedPeriod),
    Relative(RelativePeriod),
}

impl Default for DatePhrase {
    fn default() -> Self {
        Self::Relative(RelativePeriod::Today)
    }
}

impl fmt::Display for DatePhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePhrase::Explicit { from, to: Some(to) } => write!(f, "{} to {}", from, to),
            DatePhrase::Explicit { from, to: None } => write!(f, "{}", from),
            DatePhrase::Named(NamedPeriod::Quarter { quarter, year }) => {
                write!(f, "Q{} {}", quarter, year)
            }
            DatePhrase::Named(NamedPeriod::FinancialYear { year }) => {
                write!(f, "financial year {}", year)
            }
            DatePhrase::Named(NamedPeriod::CalendarYear { year }) => {
                write!(f, "calendar year {}", year)
            }
            DatePhrase::Named(NamedPeriod::Month { month, year }) => {
                let name = MONTH_NAMES
                    .get(month.saturating_sub(1) as usize)
                    .copied()
                    .unwrap_or("month");
                match year {
                    Some(y) => write!(f, "{} {}", name, y),
                    None => write!(f, "{}", name),
                }
            }
            DatePhrase::Relative(RelativePeriod::LastDays { days }) => {
                write!(f, "last {} days", days)
            }
            DatePhrase::Relative(period) => {
                let label = match period {
                    RelativePeriod::Today => "today",
                    RelativePeriod::Yesterday => "yesterday",
                    RelativePeriod::ThisWeek => "this week",
                    RelativePeriod::LastWeek => "last week",
                    RelativePeriod::ThisMonth => "this month",
                    RelativePeriod::LastMonth => "last month",
                    RelativePeriod::ThisQuarter => "this quarter",
                    RelativePeriod::LastQuarter => "last quarter",
                    RelativePeriod::ThisFinancialYear => "this financial year",
                    RelativePeriod::LastFinancialYear => "last financial year",
                    RelativePeriod::LastDays { .. } => "last days",
                };
                write!(f, "{}", label)
            }
        }
    }
}

/// Resolved inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(SynthError::UnresolvableDate {
                phrase: format!("{} to {}", start, end),
                details: "range ends before it starts".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Dates invoices may be issued on, optionally excluding weekends.
    pub fn eligible_dates(&self, business_days_only: bool) -> Vec<NaiveDate> {
        let days = days_in_range(self.start, self.end);
        if business_days_only {
            days.into_iter().filter(|d| is_business_day(*d)).collect()
        } else {
            days
        }
    }

    /// Clamps the window so it does not extend past `reference`.
    /// Returns `None` when the window already ends on or before `reference`.
    pub fn clamp_to(&self, reference: NaiveDate) -> Option<DateWindow> {
        if self.end <= reference {
            return None;
        }
        let start = self.start.min(reference);
        Some(DateWindow {
            start,
            end: reference,
        })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Resolves free-form date text into a window.
///
/// Fails with [`SynthError::UnresolvableDate`] when the text contains no
/// recognized date expression.
pub fn resolve(
    phrase: &str,
    fiscal_year_start_month: u32,
    reference_date: NaiveDate,
) -> Result<DateWindow> {
    let recognized = recognize(phrase).ok_or_else(|| SynthError::UnresolvableDate {
        phrase: phrase.to_string(),
        details: "no recognized date expression".to_string(),
    })?;
    recognized.resolve(fiscal_year_start_month, reference_date)
}

impl DatePhrase {
    pub fn resolve(
        &self,
        fiscal_year_start_month: u32,
        reference_date: NaiveDate,
    ) -> Result<DateWindow> {
        validate_fiscal_year_start_month(fiscal_year_start_month)?;
        let fy = fiscal_year_start_month;

        match self {
            DatePhrase::Explicit { from, to } => {
                let start = parse_explicit_date(from)?;
                let end = match to {
                    Some(to) => parse_explicit_date(to)?,
                    None => start,
                };
                DateWindow::new(start, end).map_err(|_| SynthError::UnresolvableDate {
                    phrase: self.to_string(),
                    details: "range ends before it starts".to_string(),
                })
            }
            DatePhrase::Named(named) => resolve_named(self, *named, fy, reference_date),
            DatePhrase::Relative(relative) => {
                resolve_relative(self, *relative, fy, reference_date)
            }
        }
    }
}

fn resolve_named(
    phrase: &DatePhrase,
    period: NamedPeriod,
    fy: u32,
    reference_date: NaiveDate,
) -> Result<DateWindow> {
    let bounds = match period {
        NamedPeriod::Quarter { quarter, year } => {
            if !(1..=4).contains(&quarter) {
                return Err(unresolvable(phrase, "quarter must be between 1 and 4"));
            }
            let (y, m) = shift_month(year, fy, 3 * (quarter as i32 - 1));
            months_span(y, m, 3)
        }
        NamedPeriod::FinancialYear { year } => months_span(year, fy, 12),
        NamedPeriod::CalendarYear { year } => months_span(year, 1, 12),
        NamedPeriod::Month { month, year } => {
            if !(1..=12).contains(&month) {
                return Err(unresolvable(phrase, "month must be between 1 and 12"));
            }
            let year = year.unwrap_or_else(|| {
                if month <= reference_date.month() {
                    reference_date.year()
                } else {
                    reference_date.year() - 1
                }
            });
            month_bounds(year, month)
        }
    };

    let (start, end) = bounds.ok_or_else(|| unresolvable(phrase, "date out of range"))?;
    Ok(DateWindow { start, end })
}

fn resolve_relative(
    phrase: &DatePhrase,
    period: RelativePeriod,
    fy: u32,
    today: NaiveDate,
) -> Result<DateWindow> {
    let out_of_range = || unresolvable(phrase, "date out of range");

    let window = match period {
        RelativePeriod::Today => DateWindow::single(today),
        RelativePeriod::Yesterday => {
            DateWindow::single(today.checked_sub_days(Days::new(1)).ok_or_else(out_of_range)?)
        }
        RelativePeriod::ThisWeek => {
            let start = week_start(today);
            let end = start.checked_add_days(Days::new(6)).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::LastWeek => {
            let end = week_start(today)
                .checked_sub_days(Days::new(1))
                .ok_or_else(out_of_range)?;
            let start = end.checked_sub_days(Days::new(6)).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::ThisMonth => {
            let (start, end) = month_bounds(today.year(), today.month()).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::LastMonth => {
            let (y, m) = shift_month(today.year(), today.month(), -1);
            let (start, end) = month_bounds(y, m).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::ThisQuarter | RelativePeriod::LastQuarter => {
            let quarter = fiscal_quarter_index(today, fy) as i32;
            let back = if period == RelativePeriod::LastQuarter { 3 } else { 0 };
            let (y, m) = shift_month(fiscal_year_start_year(today, fy), fy, quarter * 3 - back);
            let (start, end) = months_span(y, m, 3).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::ThisFinancialYear | RelativePeriod::LastFinancialYear => {
            let mut year = fiscal_year_start_year(today, fy);
            if period == RelativePeriod::LastFinancialYear {
                year -= 1;
            }
            let (start, end) = months_span(year, fy, 12).ok_or_else(out_of_range)?;
            DateWindow { start, end }
        }
        RelativePeriod::LastDays { days } => {
            if days == 0 {
                return Err(unresolvable(phrase, "day count must be positive"));
            }
            let start = today
                .checked_sub_days(Days::new(u64::from(days) - 1))
                .ok_or_else(out_of_range)?;
            DateWindow { start, end: today }
        }
    };

    Ok(window)
}

fn unresolvable(phrase: &DatePhrase, details: &str) -> SynthError {
    SynthError::UnresolvableDate {
        phrase: phrase.to_string(),
        details: details.to_string(),
    }
}

pub fn parse_explicit_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| SynthError::UnresolvableDate {
            phrase: trimmed.to_string(),
            details: "expected DD-MM-YYYY, DD/MM/YYYY or YYYY-MM-DD".to_string(),
        })
}

const DATE_TOKEN: &str = r"(\d{1,2}[-/]\d{1,2}[-/]\d{4}|\d{4}-\d{1,2}-\d{1,2})";

struct DatePatterns {
    explicit_range: Regex,
    explicit_single: Regex,
    quarter: Regex,
    financial_year: Regex,
    calendar_year: Regex,
    payment_prefix: Regex,
    month: Regex,
    last_days: Regex,
}

fn patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let month_alt = MONTH_NAMES.join("|");
        DatePatterns {
            explicit_range: Regex::new(&format!(
                r"(?i)(?:\b(?:from|between)\s+)?{}\s*(?:to|until|through|and|-)\s*{}",
                DATE_TOKEN, DATE_TOKEN
            ))
            .expect("hardcoded regex should be valid"),
            explicit_single: Regex::new(DATE_TOKEN).expect("hardcoded regex should be valid"),
            quarter: Regex::new(r"(?i)\bq([1-4])\s*(?:of\s+|fy\s*)?(\d{4})\b")
                .expect("hardcoded regex should be valid"),
            financial_year: Regex::new(
                r"(?i)\b(?:(?:financial|fiscal)\s+year\s+(\d{4})|fy\s*(\d{4}))\b",
            )
            .expect("hardcoded regex should be valid"),
            calendar_year: Regex::new(
                r"(?i)\b(?:calendar\s+year|year|in|for|during)\s+(?:the\s+)?(?:year\s+)?(\d{4})\b",
            )
            .expect("hardcoded regex should be valid"),
            payment_prefix: Regex::new(r"\bpay(?:\s+only)?\s*$")
                .expect("hardcoded regex should be valid"),
            month: Regex::new(&format!(
                r"(?i)\b(?:(in|for|during|of)\s+)?({})\b(?:\s+(\d{{4}})\b)?",
                month_alt
            ))
            .expect("hardcoded regex should be valid"),
            last_days: Regex::new(r"(?i)\b(?:last|past|previous)\s+(\d+)\s+days?\b")
                .expect("hardcoded regex should be valid"),
        }
    })
}

/// Scans `text` for a date expression.
///
/// Explicit dates win over named periods, which win over relative phrases;
/// within a class the first match in the text is used.
pub fn recognize(text: &str) -> Option<DatePhrase> {
    let p = patterns();
    let lower = text.to_lowercase();

    if let Some(caps) = p.explicit_range.captures(&lower) {
        return Some(DatePhrase::Explicit {
            from: caps[1].to_string(),
            to: Some(caps[2].to_string()),
        });
    }
    if let Some(caps) = p.explicit_single.captures(&lower) {
        return Some(DatePhrase::Explicit {
            from: caps[1].to_string(),
            to: None,
        });
    }
    if let Some(caps) = p.quarter.captures(&lower) {
        let quarter = caps[1].parse().ok()?;
        let year = caps[2].parse().ok()?;
        return Some(DatePhrase::Named(NamedPeriod::Quarter { quarter, year }));
    }
    if let Some(caps) = p.financial_year.captures(&lower) {
        let year = caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()?;
        return Some(DatePhrase::Named(NamedPeriod::FinancialYear { year }));
    }
    if let Some(phrase) = recognize_month(&lower) {
        return Some(phrase);
    }
    // "pay for 1200" is a payment count, not a year
    if let Some(caps) = p
        .calendar_year
        .captures_iter(&lower)
        .find(|caps| {
            caps.get(0)
                .map_or(false, |m| !p.payment_prefix.is_match(&lower[..m.start()]))
        })
    {
        let year = caps[1].parse().ok()?;
        return Some(DatePhrase::Named(NamedPeriod::CalendarYear { year }));
    }
    if let Some(caps) = p.last_days.captures(&lower) {
        let days = caps[1].parse().ok()?;
        return Some(DatePhrase::Relative(RelativePeriod::LastDays { days }));
    }

    recognize_relative(&lower).map(DatePhrase::Relative)
}

fn recognize_month(lower: &str) -> Option<DatePhrase> {
    for caps in patterns().month.captures_iter(lower) {
        let name = &caps[2];
        let has_prefix = caps.get(1).is_some();
        let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok());

        // "may" is too common a word to accept on its own
        if name == "may" && !has_prefix && year.is_none() {
            continue;
        }
        let month = MONTH_NAMES.iter().position(|m| *m == name)? as u32 + 1;
        return Some(DatePhrase::Named(NamedPeriod::Month { month, year }));
    }
    None
}

fn recognize_relative(lower: &str) -> Option<RelativePeriod> {
    const PHRASES: [(&str, RelativePeriod); 14] = [
        ("last financial year", RelativePeriod::LastFinancialYear),
        ("last fiscal year", RelativePeriod::LastFinancialYear),
        ("this financial year", RelativePeriod::ThisFinancialYear),
        ("this fiscal year", RelativePeriod::ThisFinancialYear),
        ("last quarter", RelativePeriod::LastQuarter),
        ("this quarter", RelativePeriod::ThisQuarter),
        ("last month", RelativePeriod::LastMonth),
        ("this month", RelativePeriod::ThisMonth),
        ("last week", RelativePeriod::LastWeek),
        ("this week", RelativePeriod::ThisWeek),
        ("yesterday", RelativePeriod::Yesterday),
        ("today", RelativePeriod::Today),
        ("previous month", RelativePeriod::LastMonth),
        ("previous week", RelativePeriod::LastWeek),
    ];

    PHRASES
        .iter()
        .filter_map(|(phrase, period)| lower.find(phrase).map(|pos| (pos, *period)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, period)| period)
}

/// "Today" in the configured timezone label.
///
/// Accepts `UTC`/`Z`, `local`, or a fixed `±HH:MM` offset. Any other label
/// falls back to UTC; the second element is `false` in that case.
pub fn reference_date_for(timezone: &str) -> (NaiveDate, bool) {
    let label = timezone.trim();
    let now = Utc::now();
    match label.to_lowercase().as_str() {
        "utc" | "z" | "" => (now.date_naive(), true),
        "local" => (Local::now().date_naive(), true),
        _ => match parse_utc_offset(label) {
            Some(offset) => (now.with_timezone(&offset).date_naive(), true),
            None => (now.date_naive(), false),
        },
    }
}

fn parse_utc_offset(label: &str) -> Option<FixedOffset> {
    let (sign, rest) = match label.as_bytes().first()? {
        b'+' => (1, &label[1..]),
        b'-' => (-1, &label[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
        DateWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_quarter_calendar_fiscal_year() {
        let w = resolve("Q1 2023", 1, d(2024, 6, 15)).unwrap();
        assert_eq!(w, window(d(2023, 1, 1), d(2023, 3, 31)));
    }

    #[test]
    fn test_quarter_july_fiscal_year() {
        let q1 = resolve("q1 2023", 7, d(2024, 6, 15)).unwrap();
        assert_eq!(q1, window(d(2023, 7, 1), d(2023, 9, 30)));

        let q3 = resolve("Q3 2023", 7, d(2024, 6, 15)).unwrap();
        assert_eq!(q3, window(d(2024, 1, 1), d(2024, 3, 31)));
    }

    #[test]
    fn test_financial_year() {
        let fy = resolve("financial year 2023", 7, d(2024, 6, 15)).unwrap();
        assert_eq!(fy, window(d(2023, 7, 1), d(2024, 6, 30)));

        let fy = resolve("FY2023", 1, d(2024, 6, 15)).unwrap();
        assert_eq!(fy, window(d(2023, 1, 1), d(2023, 12, 31)));
    }

    #[test]
    fn test_last_month() {
        let w = resolve("last month", 7, d(2024, 6, 15)).unwrap();
        assert_eq!(w, window(d(2024, 5, 1), d(2024, 5, 31)));

        let w = resolve("last month", 7, d(2024, 1, 10)).unwrap();
        assert_eq!(w, window(d(2023, 12, 1), d(2023, 12, 31)));
    }

    #[test]
    fn test_yesterday_and_today() {
        assert_eq!(
            resolve("yesterday", 7, d(2024, 3, 1)).unwrap(),
            DateWindow::single(d(2024, 2, 29))
        );
        assert_eq!(
            resolve("today please", 7, d(2024, 3, 1)).unwrap(),
            DateWindow::single(d(2024, 3, 1))
        );
    }

    #[test]
    fn test_last_week() {
        // 2024-06-15 is a Saturday; previous week is Mon 3rd to Sun 9th
        let w = resolve("last week", 7, d(2024, 6, 15)).unwrap();
        assert_eq!(w, window(d(2024, 6, 3), d(2024, 6, 9)));
    }

    #[test]
    fn test_last_quarter_july_fiscal_year() {
        // May sits in Q4 (Apr-Jun); last quarter is Jan-Mar
        let w = resolve("last quarter", 7, d(2024, 5, 20)).unwrap();
        assert_eq!(w, window(d(2024, 1, 1), d(2024, 3, 31)));

        // August sits in Q1 (Jul-Sep); last quarter is Apr-Jun
        let w = resolve("last quarter", 7, d(2024, 8, 2)).unwrap();
        assert_eq!(w, window(d(2024, 4, 1), d(2024, 6, 30)));
    }

    #[test]
    fn test_this_quarter() {
        let w = resolve("this quarter", 1, d(2024, 6, 15)).unwrap();
        assert_eq!(w, window(d(2024, 4, 1), d(2024, 6, 30)));

        // February sits in Q3 (Jan-Mar) of the FY starting July 2023
        let w = resolve("this quarter", 7, d(2024, 2, 29)).unwrap();
        assert_eq!(w, window(d(2024, 1, 1), d(2024, 3, 31)));

        let w = resolve("last quarter", 7, d(2024, 7, 1)).unwrap();
        assert_eq!(w, window(d(2024, 4, 1), d(2024, 6, 30)));
    }

    #[test]
    fn test_this_financial_year() {
        let w = resolve("this financial year", 7, d(2024, 3, 1)).unwrap();
        assert_eq!(w, window(d(2023, 7, 1), d(2024, 6, 30)));

        let w = resolve("last financial year", 7, d(2024, 3, 1)).unwrap();
        assert_eq!(w, window(d(2022, 7, 1), d(2023, 6, 30)));
    }

    #[test]
    fn test_explicit_dates() {
        let w = resolve("on 20-05-2025", 7, d(2025, 6, 1)).unwrap();
        assert_eq!(w, DateWindow::single(d(2025, 5, 20)));

        let w = resolve("from 2025-05-01 to 2025-05-10", 7, d(2025, 6, 1)).unwrap();
        assert_eq!(w, window(d(2025, 5, 1), d(2025, 5, 10)));

        let w = resolve("between 01/02/2024 and 15/02/2024", 7, d(2025, 6, 1)).unwrap();
        assert_eq!(w, window(d(2024, 2, 1), d(2024, 2, 15)));
    }

    #[test]
    fn test_invalid_calendar_date_is_unresolvable() {
        let result = resolve("31-02-2025", 7, d(2025, 6, 1));
        assert!(matches!(result, Err(SynthError::UnresolvableDate { .. })));
    }

    #[test]
    fn test_inverted_range_is_unresolvable() {
        let result = resolve("from 10-05-2025 to 01-05-2025", 7, d(2025, 6, 1));
        assert!(matches!(result, Err(SynthError::UnresolvableDate { .. })));
    }

    #[test]
    fn test_unrecognized_text_is_unresolvable() {
        let result = resolve("sometime soon", 7, d(2025, 6, 1));
        assert!(matches!(result, Err(SynthError::UnresolvableDate { .. })));
    }

    #[test]
    fn test_month_names() {
        let w = resolve("in march 2024", 7, d(2025, 6, 1)).unwrap();
        assert_eq!(w, window(d(2024, 3, 1), d(2024, 3, 31)));

        // Without a year the most recent March is used
        let w = resolve("for march", 7, d(2025, 2, 1)).unwrap();
        assert_eq!(w, window(d(2024, 3, 1), d(2024, 3, 31)));

        assert_eq!(recognize("you may pay all"), None);
    }

    #[test]
    fn test_calendar_year_and_last_days() {
        let w = resolve("during 2022", 7, d(2025, 6, 1)).unwrap();
        assert_eq!(w, window(d(2022, 1, 1), d(2022, 12, 31)));

        let w = resolve("last 7 days", 7, d(2025, 6, 10)).unwrap();
        assert_eq!(w, window(d(2025, 6, 4), d(2025, 6, 10)));
    }

    #[test]
    fn test_payment_count_is_not_a_year() {
        assert_eq!(
            recognize("generate 1500 bills last week and pay for 1200"),
            Some(DatePhrase::Relative(RelativePeriod::LastWeek))
        );
        assert_eq!(recognize("pay only for 2023 of them"), None);
        assert_eq!(
            recognize("pay for 40, all for 2023"),
            Some(DatePhrase::Named(NamedPeriod::CalendarYear { year: 2023 }))
        );
    }

    #[test]
    fn test_eligible_business_days() {
        // 2024-06-15/16 is a weekend
        let weekend = window(d(2024, 6, 15), d(2024, 6, 16));
        assert!(weekend.eligible_dates(true).is_empty());
        assert_eq!(weekend.eligible_dates(false).len(), 2);

        let week = window(d(2024, 6, 10), d(2024, 6, 16));
        assert_eq!(week.eligible_dates(true).len(), 5);
    }

    #[test]
    fn test_clamp_to_reference() {
        let today = d(2024, 3, 15);
        let w = window(d(2024, 3, 1), d(2024, 4, 1));
        assert_eq!(w.clamp_to(today), Some(window(d(2024, 3, 1), today)));

        let future = window(d(2024, 4, 10), d(2024, 4, 20));
        assert_eq!(future.clamp_to(today), Some(DateWindow::single(today)));

        let past = window(d(2024, 1, 1), d(2024, 1, 31));
        assert_eq!(past.clamp_to(today), None);
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+10:00"), FixedOffset::east_opt(36_000));
        assert_eq!(parse_utc_offset("-05:30"), FixedOffset::east_opt(-19_800));
        assert_eq!(parse_utc_offset("Australia/Melbourne"), None);
        assert!(reference_date_for("UTC").1);
        assert!(!reference_date_for("Mars/Olympus").1);
    }

    #[test]
    fn test_invalid_fiscal_month() {
        let phrase = DatePhrase::Named(NamedPeriod::Quarter {
            quarter: 1,
            year: 2023,
        });
        assert!(phrase.resolve(13, d(2024, 1, 1)).is_err());
    }
}
