//! Directive parser: free-text request to [`GenerationIntent`].
//!
//! Recognition is split into independent [`PhraseMatcher`]s, each scanning
//! the whole query for one class of directive. Their partial results are
//! merged afterwards, so the order phrases appear in the sentence does not
//! matter and a new phrase class is one more matcher.

use crate::catalog::CatalogIndex;
use crate::error::{Result, SynthError};
use crate::periods::{self, DatePhrase};
use crate::schema::{GenerationIntent, GenerationWarning, LineRange, PaymentDirective};
use log::{debug, warn};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// One recognized fragment of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Count(u32),
    Date(DatePhrase),
    Vendors(Vec<String>),
    Payment(PaymentDirective),
    LineRange(LineRange),
}

pub trait PhraseMatcher: Send + Sync {
    fn label(&self) -> &'static str;

    /// Returns `Ok(None)` when the phrase class is absent from `query`.
    fn scan(&self, query: &str) -> Result<Option<Directive>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub intent: GenerationIntent,
    pub warnings: Vec<GenerationWarning>,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hardcoded regex should be valid")
}

fn parse_number(query: &str, raw: &str) -> Result<u32> {
    if raw.contains('.') {
        return Err(SynthError::Parse {
            query: query.to_string(),
            details: format!("'{}' is not a whole number", raw),
        });
    }
    raw.parse().map_err(|_| SynthError::Parse {
        query: query.to_string(),
        details: format!("'{}' is out of range", raw),
    })
}

/// Invoice count, preferring a number right after a generation verb
/// ("generate 6") over one right before a document noun ("6 bills").
pub struct CountMatcher {
    after_verb: Regex,
    before_noun: Regex,
    non_count_prefix: Regex,
}

impl Default for CountMatcher {
    fn default() -> Self {
        Self {
            after_verb: compile(
                r"(?i)\b(?:generate|create|make|need)\s+(?:me\s+|us\s+)?(\d+(?:\.\d+)?)\b",
            ),
            before_noun: compile(
                r"(?i)\b(\d+(?:\.\d+)?)\s+(?:[a-z]+\s+){0,2}?(?:bills?|invoices?)\b",
            ),
            non_count_prefix: compile(
                r"(?i)(?:\bpay(?:\s+for)?(?:\s+only)?|\bonly|\bq[1-4]|\bfy|\byear|\bquarter(?:\s+[1-4])?|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*|[-/])\s*$",
            ),
        }
    }
}

impl CountMatcher {
    fn is_date_fragment(query: &str, end: usize) -> bool {
        matches!(query[end..].chars().next(), Some('-') | Some('/'))
    }
}

impl PhraseMatcher for CountMatcher {
    fn label(&self) -> &'static str {
        "count"
    }

    fn scan(&self, query: &str) -> Result<Option<Directive>> {
        for caps in self.after_verb.captures_iter(query) {
            let Some(m) = caps.get(1) else { continue };
            if Self::is_date_fragment(query, m.end()) {
                continue;
            }
            return parse_number(query, m.as_str()).map(|n| Some(Directive::Count(n)));
        }

        for caps in self.before_noun.captures_iter(query) {
            let Some(m) = caps.get(1) else { continue };
            if Self::is_date_fragment(query, m.end())
                || self.non_count_prefix.is_match(&query[..m.start()])
            {
                continue;
            }
            return parse_number(query, m.as_str()).map(|n| Some(Directive::Count(n)));
        }

        Ok(None)
    }
}

#[derive(Default)]
pub struct DateMatcher;

impl PhraseMatcher for DateMatcher {
    fn label(&self) -> &'static str {
        "date"
    }

    fn scan(&self, query: &str) -> Result<Option<Directive>> {
        Ok(periods::recognize(query).map(Directive::Date))
    }
}

/// "for vendor X", "from vendors A, B and C".
pub struct VendorMatcher {
    phrase: Regex,
    separator: Regex,
}

impl Default for VendorMatcher {
    fn default() -> Self {
        Self {
            phrase: compile(
                r"(?i)\b(?:for|from|by)\s+(?:the\s+)?(vendors?|suppliers?)\s+(.+?)(?:\s+(?:and\s+)?(?:pay|with|in|for|to|at|during|between|from|on|over|dated|last|this|next|yesterday|today|q[1-4]|fy|financial|fiscal|calendar)\b|[;.!?]|$)",
            ),
            separator: compile(r"(?i)\s*,\s*(?:and\s+)?|\s+(?:and|&)\s+"),
        }
    }
}

impl PhraseMatcher for VendorMatcher {
    fn label(&self) -> &'static str {
        "vendor"
    }

    fn scan(&self, query: &str) -> Result<Option<Directive>> {
        let mut names = Vec::new();
        for caps in self.phrase.captures_iter(query) {
            let plural = caps[1].to_lowercase().ends_with('s');
            let raw = caps[2].trim();
            if plural {
                names.extend(
                    self.separator
                        .split(raw)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            } else {
                names.push(raw.trim_end_matches(',').to_string());
            }
        }
        Ok((!names.is_empty()).then_some(Directive::Vendors(names)))
    }
}

pub struct PaymentMatcher {
    none: Regex,
    all: Regex,
    count: Regex,
}

impl Default for PaymentMatcher {
    fn default() -> Self {
        Self {
            none: compile(
                r"(?i)\b(?:pay\s+(?:for\s+)?(?:none|nothing|no\s+(?:bills|invoices))|don'?t\s+pay|do\s+not\s+pay|no\s+payments?)\b",
            ),
            all: compile(
                r"(?i)\bpay\s+(?:for\s+)?(?:all|every(?:thing)?|each|(?:them|these)\s+all)\b",
            ),
            count: compile(r"(?i)\bpay\s+(?:for\s+)?(?:only\s+)?(\d+(?:\.\d+)?)\b"),
        }
    }
}

impl PhraseMatcher for PaymentMatcher {
    fn label(&self) -> &'static str {
        "payment"
    }

    fn scan(&self, query: &str) -> Result<Option<Directive>> {
        let mut hits: Vec<(usize, PaymentDirective)> = Vec::new();
        if let Some(m) = self.none.find(query) {
            hits.push((m.start(), PaymentDirective::PayNone));
        }
        if let Some(m) = self.all.find(query) {
            hits.push((m.start(), PaymentDirective::PayAll));
        }
        if let Some(caps) = self.count.captures(query) {
            let n = parse_number(query, &caps[1])?;
            let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
            hits.push((start, PaymentDirective::PayCount(n)));
        }

        Ok(hits
            .into_iter()
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, directive)| Directive::Payment(directive)))
    }
}

/// "with 2-4 line items", "with between 2 and 4 lines", "with 3 items".
pub struct LineRangeMatcher {
    range: Regex,
    single: Regex,
}

impl Default for LineRangeMatcher {
    fn default() -> Self {
        Self {
            range: compile(
                r"(?i)\bwith\s+(?:between\s+)?(\d+)\s*(?:-|to|and)\s*(\d+)\s+(?:line\s*items?|lines?|items?)\b",
            ),
            single: compile(r"(?i)\bwith\s+(\d+)\s+(?:line\s*items?|lines?|items?)\b"),
        }
    }
}

impl PhraseMatcher for LineRangeMatcher {
    fn label(&self) -> &'static str {
        "line_range"
    }

    fn scan(&self, query: &str) -> Result<Option<Directive>> {
        let bound = |caps: &Captures, idx: usize| caps[idx].parse::<u32>().ok();

        if let Some(caps) = self.range.captures(query) {
            if let (Some(a), Some(b)) = (bound(&caps, 1), bound(&caps, 2)) {
                return Ok(Some(Directive::LineRange(LineRange::new(a, b))));
            }
        }
        if let Some(caps) = self.single.captures(query) {
            if let Some(n) = bound(&caps, 1) {
                return Ok(Some(Directive::LineRange(LineRange::new(n, n))));
            }
        }
        Ok(None)
    }
}

pub struct DirectiveParser {
    matchers: Vec<Box<dyn PhraseMatcher>>,
}

impl Default for DirectiveParser {
    fn default() -> Self {
        Self {
            matchers: vec![
                Box::new(CountMatcher::default()),
                Box::new(DateMatcher),
                Box::new(VendorMatcher::default()),
                Box::new(PaymentMatcher::default()),
                Box::new(LineRangeMatcher::default()),
            ],
        }
    }
}

impl DirectiveParser {
    pub fn with_matcher(mut self, matcher: Box<dyn PhraseMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Runs every matcher over `query`. The first matcher to report a given
    /// directive class wins.
    pub fn scan(&self, query: &str) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();
        for matcher in &self.matchers {
            if let Some(directive) = matcher.scan(query)? {
                debug!("Matcher '{}' recognized {:?}", matcher.label(), directive);
                directives.push(directive);
            }
        }
        Ok(directives)
    }

    pub fn parse(&self, query: &str, catalog: &CatalogIndex) -> Result<ParsedQuery> {
        let mut count = None;
        let mut date = None;
        let mut vendor_names: Option<Vec<String>> = None;
        let mut payment = None;
        let mut line_range = None;

        for directive in self.scan(query)? {
            match directive {
                Directive::Count(n) => {
                    count.get_or_insert(n);
                }
                Directive::Date(phrase) => {
                    date.get_or_insert(phrase);
                }
                Directive::Vendors(names) => {
                    vendor_names.get_or_insert(names);
                }
                Directive::Payment(p) => {
                    payment.get_or_insert(p);
                }
                Directive::LineRange(r) => {
                    line_range.get_or_insert(r);
                }
            }
        }

        let invoice_count = count.ok_or_else(|| SynthError::Parse {
            query: query.to_string(),
            details: "no number next to generate/create/make/need or bills/invoices".to_string(),
        })?;

        let mut warnings = Vec::new();

        let date_window = date.unwrap_or_else(|| {
            warnings.push(GenerationWarning::DefaultedDateWindow);
            DatePhrase::default()
        });

        let mut intent = GenerationIntent::new(invoice_count, date_window);
        intent.line_range = line_range;

        for name in vendor_names.unwrap_or_default() {
            let vendor = catalog
                .find_vendor(&name)
                .or_else(|| catalog.vendor_at_start(&name));
            match vendor {
                Some(vendor) => {
                    intent.vendor_filter.insert(vendor.id.clone());
                }
                None => warnings.push(GenerationWarning::UnmatchedVendor { name }),
            }
        }

        intent.payment_directive = match payment.unwrap_or_default() {
            PaymentDirective::PayCount(n) if n > invoice_count => {
                warnings.push(GenerationWarning::PayCountClamped {
                    requested: n,
                    available: invoice_count,
                });
                PaymentDirective::PayCount(invoice_count)
            }
            other => other,
        };

        for warning in &warnings {
            warn!("{}", warning);
        }
        debug!("Parsed intent: {:?}", intent);

        Ok(ParsedQuery { intent, warnings })
    }
}

/// Parses `query` with the default matcher set.
pub fn parse(query: &str, catalog: &CatalogIndex) -> Result<ParsedQuery> {
    static PARSER: OnceLock<DirectiveParser> = OnceLock::new();
    PARSER.get_or_init(DirectiveParser::default).parse(query, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::{NamedPeriod, RelativePeriod};

    fn catalog() -> CatalogIndex {
        CatalogIndex::from_json(
            r#"{
                "vendors": [
                    {"id": "VEND-SPARKY", "name": "Sparky Electricals"},
                    {"id": "VEND-BUILD", "name": "BuildRight Cement"}
                ],
                "items": [
                    {"id": "i-1", "code": "CABLE", "name": "Copper cable", "unit_price": "12.50",
                     "account_code": "453", "tax_code": "INPUT"}
                ],
                "vendor_items": [{"vendor_id": "VEND-SPARKY", "items": ["CABLE"]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_quarter_with_pay_count() {
        let parsed = parse("Generate 6 bills for the Q1 2023 pay for only 2", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 6);
        assert_eq!(
            parsed.intent.date_window,
            DatePhrase::Named(NamedPeriod::Quarter {
                quarter: 1,
                year: 2023
            })
        );
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayCount(2));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_last_month_pay_all() {
        let parsed = parse("Generate 10 bills for last month and pay all", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 10);
        assert_eq!(
            parsed.intent.date_window,
            DatePhrase::Relative(RelativePeriod::LastMonth)
        );
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayAll);
    }

    #[test]
    fn test_order_independence() {
        let a = parse("pay for 3 of them, generate 8 invoices last week", &catalog()).unwrap();
        let b = parse("Last week: 8 invoices please, pay for 3", &catalog()).unwrap();
        assert_eq!(a.intent, b.intent);
        assert_eq!(a.intent.invoice_count, 8);
        assert_eq!(a.intent.payment_directive, PaymentDirective::PayCount(3));
    }

    #[test]
    fn test_case_and_whitespace() {
        let parsed = parse("  GENERATE   4   INVOICES   YESTERDAY  ", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 4);
        assert_eq!(
            parsed.intent.date_window,
            DatePhrase::Relative(RelativePeriod::Yesterday)
        );
    }

    #[test]
    fn test_count_keywords() {
        for query in [
            "I need 12 invoices",
            "create 12 bills",
            "make 12 supplier invoices",
            "12 vendor bills for this month",
        ] {
            assert_eq!(parse(query, &catalog()).unwrap().intent.invoice_count, 12, "{query}");
        }
    }

    #[test]
    fn test_missing_or_decimal_count_is_error() {
        assert!(matches!(
            parse("Generate some bills for last month", &catalog()),
            Err(SynthError::Parse { .. })
        ));
        assert!(matches!(
            parse("Generate 10.1 bills", &catalog()),
            Err(SynthError::Parse { .. })
        ));
    }

    #[test]
    fn test_year_is_not_a_count() {
        let parsed = parse("bills for Q1 2023: generate 5", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 5);

        assert!(parse("show me the Q1 2023 bills", &catalog()).is_err());
        assert!(parse("bills for March 2024", &catalog()).is_err());
    }

    #[test]
    fn test_vendor_resolution() {
        let parsed = parse(
            "Generate 3 bills for vendor sparky electrical last month and pay none",
            &catalog(),
        )
        .unwrap();
        assert!(parsed.intent.vendor_filter.contains("VEND-SPARKY"));
        assert_eq!(parsed.intent.vendor_filter.len(), 1);
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayNone);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_multiple_vendors() {
        let parsed = parse(
            "Generate 4 bills for vendors Sparky Electricals and BuildRight Cement",
            &catalog(),
        )
        .unwrap();
        assert_eq!(parsed.intent.vendor_filter.len(), 2);
    }

    #[test]
    fn test_vendor_followed_by_for_phrase() {
        for query in [
            "Generate 3 bills for vendor Sparky Electricals for last month",
            "Generate 3 bills for vendor Sparky Electricals for Q1 2023",
            "Generate 3 bills from supplier Sparky Electricals to be paid: pay all",
            "Generate 3 bills for vendor Sparky Electricals at random, pay none",
        ] {
            let parsed = parse(query, &catalog()).unwrap();
            assert_eq!(
                parsed.intent.vendor_filter.iter().map(String::as_str).collect::<Vec<_>>(),
                vec!["VEND-SPARKY"],
                "{query}"
            );
            assert!(
                !parsed
                    .warnings
                    .iter()
                    .any(|w| matches!(w, GenerationWarning::UnmatchedVendor { .. })),
                "{query}"
            );
        }

        let parsed = parse(
            "Generate 3 bills for vendor Sparky Electricals for last month",
            &catalog(),
        )
        .unwrap();
        assert_eq!(parsed.intent.date_window, DatePhrase::Relative(RelativePeriod::LastMonth));
    }

    #[test]
    fn test_vendor_name_with_trailing_words_resolves() {
        let parsed = parse(
            "Generate 2 bills for vendor BuildRight Cement please thanks",
            &catalog(),
        )
        .unwrap();
        assert!(parsed.intent.vendor_filter.contains("VEND-BUILD"));
    }

    #[test]
    fn test_multi_digit_pay_count_beside_date() {
        let parsed = parse("Generate 1500 bills last week and pay for 1200", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 1500);
        assert_eq!(parsed.intent.date_window, DatePhrase::Relative(RelativePeriod::LastWeek));
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayCount(1200));
        assert!(parsed.warnings.is_empty());

        let parsed = parse("pay for 2024 of them; generate 3000 invoices in March 2024", &catalog()).unwrap();
        assert_eq!(
            parsed.intent.date_window,
            DatePhrase::Named(NamedPeriod::Month {
                month: 3,
                year: Some(2024)
            })
        );
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayCount(2024));
    }

    #[test]
    fn test_unmatched_vendor_warns() {
        let parsed = parse("Generate 3 bills for vendor Acme Widgets", &catalog()).unwrap();
        assert!(parsed.intent.vendor_filter.is_empty());
        assert!(parsed.warnings.contains(&GenerationWarning::UnmatchedVendor {
            name: "Acme Widgets".to_string()
        }));
    }

    #[test]
    fn test_defaulted_date_window() {
        let parsed = parse("Generate 2 bills", &catalog()).unwrap();
        assert_eq!(parsed.intent.date_window, DatePhrase::Relative(RelativePeriod::Today));
        assert_eq!(parsed.warnings, vec![GenerationWarning::DefaultedDateWindow]);
    }

    #[test]
    fn test_pay_count_is_clamped() {
        let parsed = parse("Generate 3 bills today and pay for 7", &catalog()).unwrap();
        assert_eq!(parsed.intent.payment_directive, PaymentDirective::PayCount(3));
        assert!(parsed.warnings.contains(&GenerationWarning::PayCountClamped {
            requested: 7,
            available: 3
        }));
    }

    #[test]
    fn test_payment_phrases() {
        let cases = [
            ("Generate 5 bills today, pay only 2", PaymentDirective::PayCount(2)),
            ("Generate 5 bills today, don't pay", PaymentDirective::PayNone),
            ("Generate 5 bills today with no payments", PaymentDirective::PayNone),
            ("Generate 5 bills today, pay nothing", PaymentDirective::PayNone),
            ("Generate 5 bills today and pay for all", PaymentDirective::PayAll),
            ("Generate 5 bills today", PaymentDirective::Unspecified),
        ];
        for (query, expected) in cases {
            assert_eq!(parse(query, &catalog()).unwrap().intent.payment_directive, expected, "{query}");
        }
    }

    #[test]
    fn test_line_range_hints() {
        let parsed = parse("Generate 5 bills with 4-2 line items", &catalog()).unwrap();
        assert_eq!(parsed.intent.line_range, Some(LineRange { min: 2, max: 4 }));

        let parsed = parse("Generate 5 bills with between 1 and 3 lines", &catalog()).unwrap();
        assert_eq!(parsed.intent.line_range, Some(LineRange { min: 1, max: 3 }));

        let parsed = parse("Generate 5 bills with 3 line items", &catalog()).unwrap();
        assert_eq!(parsed.intent.line_range, Some(LineRange { min: 3, max: 3 }));
    }

    #[test]
    fn test_explicit_date_range_is_not_a_count() {
        let parsed = parse(
            "generate 7 invoices from 01-03-2024 to 15-03-2024",
            &catalog(),
        )
        .unwrap();
        assert_eq!(parsed.intent.invoice_count, 7);
        assert_eq!(
            parsed.intent.date_window,
            DatePhrase::Explicit {
                from: "01-03-2024".to_string(),
                to: Some("15-03-2024".to_string())
            }
        );
    }

    #[test]
    fn test_custom_matcher_extends_parser() {
        struct Dozen;
        impl PhraseMatcher for Dozen {
            fn label(&self) -> &'static str {
                "dozen"
            }
            fn scan(&self, query: &str) -> Result<Option<Directive>> {
                Ok(query.contains("a dozen").then_some(Directive::Count(12)))
            }
        }

        let parser = DirectiveParser::default().with_matcher(Box::new(Dozen));
        let parsed = parser.parse("generate a dozen bills", &catalog()).unwrap();
        assert_eq!(parsed.intent.invoice_count, 12);
    }
}
