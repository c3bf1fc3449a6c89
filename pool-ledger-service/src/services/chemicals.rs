//! Chemical usage scraped from free-text visit notes.
//!
//! Technicians write notes such as `Add 2.5 lbs chlorine`, one dose per line.
//! This adapter is best effort: only lines containing `Add <number> lbs <word>`
//! count and the first such match on a line wins. The amount is the longest
//! leading number in the captured digits, so `Add 1..2 lbs shock` counts as
//! 1 lb. Anything else (other units, typos, a bare `.`) is silently ignored.
//! Totals are therefore a lower bound, not an audited figure.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

static DOSE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Add ([0-9.]+) lbs ([A-Za-z0-9_]+)").expect("Failed to compile dose pattern")
});

/// Longest decimal prefix of a run of digits and dots: `1..2` → 1, `.5` → 0.5.
fn leading_amount(raw: &str) -> Option<Decimal> {
    let end = raw
        .match_indices('.')
        .nth(1)
        .map_or(raw.len(), |(index, _)| index);
    let number = raw[..end].trim_end_matches('.');
    if number.is_empty() {
        return None;
    }
    Decimal::from_str(number).ok()
}

/// One chemical addition recovered from a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChemicalDose {
    pub chemical: String,
    pub pounds: Decimal,
}

/// Extract every recognisable dose from a note.
pub fn parse_doses(notes: &str) -> Vec<ChemicalDose> {
    notes
        .lines()
        .filter_map(|line| {
            let captures = DOSE_LINE.captures(line)?;
            let pounds = leading_amount(&captures[1])?;
            Some(ChemicalDose {
                chemical: captures[2].to_string(),
                pounds,
            })
        })
        .collect()
}

/// Pounds used per chemical across many notes.
pub fn summarize<'a, I>(notes: I) -> BTreeMap<String, Decimal>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut totals = BTreeMap::new();
    for dose in notes.into_iter().flat_map(parse_doses) {
        *totals.entry(dose.chemical).or_insert(Decimal::ZERO) += dose.pounds;
    }
    totals
}
