//! Numeric aggregates derived from the business dataset.
//!
//! These formulas are part of the external contract: downstream clients
//! display the rounded values verbatim.

use super::{FinancialQuarter, RegionSales, SatisfactionMonth};

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Growth percentage over an ordered series: (last - first) / first * 100,
/// one decimal. Returns None for series shorter than two entries or a zero
/// first value.
pub fn growth_pct(series: &[f64]) -> Option<f64> {
    let first = *series.first()?;
    let last = *series.last()?;
    if series.len() < 2 || first == 0.0 {
        return None;
    }
    Some(round1((last - first) / first * 100.0))
}

pub fn revenue_growth(financials: &[FinancialQuarter]) -> Option<f64> {
    growth_pct(&financials.iter().map(|q| q.revenue).collect::<Vec<_>>())
}

pub fn profit_growth(financials: &[FinancialQuarter]) -> Option<f64> {
    growth_pct(&financials.iter().map(|q| q.profit).collect::<Vec<_>>())
}

pub fn expense_growth(financials: &[FinancialQuarter]) -> Option<f64> {
    growth_pct(&financials.iter().map(|q| q.expenses).collect::<Vec<_>>())
}

/// Volatility bucket from the revenue series, using the coefficient of
/// variation (population stddev / mean * 100): <10 Low, <20 Medium, else High.
pub fn volatility_bucket(financials: &[FinancialQuarter]) -> &'static str {
    let revenues: Vec<f64> = financials.iter().map(|q| q.revenue).collect();
    if revenues.is_empty() {
        return "Low";
    }
    let mean = revenues.iter().sum::<f64>() / revenues.len() as f64;
    if mean == 0.0 {
        return "Low";
    }
    let variance =
        revenues.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / revenues.len() as f64;
    let coefficient = variance.sqrt() / mean * 100.0;
    if coefficient < 10.0 {
        "Low"
    } else if coefficient < 20.0 {
        "Medium"
    } else {
        "High"
    }
}

/// Overall satisfaction rate: sum(satisfied) / sum(surveyed) * 100, one
/// decimal. None when nobody was surveyed.
pub fn satisfaction_rate(months: &[SatisfactionMonth]) -> Option<f64> {
    let surveyed: f64 = months.iter().map(|m| m.surveyed).sum();
    let satisfied: f64 = months.iter().map(|m| m.satisfied).sum();
    if surveyed == 0.0 {
        return None;
    }
    Some(round1(satisfied / surveyed * 100.0))
}

/// Region with maximal sales; ties resolve to the first occurrence.
pub fn top_region(regions: &[RegionSales]) -> Option<&RegionSales> {
    regions.iter().reduce(|max, r| if r.sales > max.sales { r } else { max })
}

/// Active-user ratio (e.g. DAU/MAU) as a percentage, one decimal. None when
/// the denominator is zero, which callers treat as "no engagement data".
pub fn active_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    Some(round1(numerator / denominator * 100.0))
}

/// Format a growth value with an explicit sign, e.g. "+15.2%" or "-3.4%".
pub fn format_signed_pct(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.1}%")
    } else {
        format!("{value:.1}%")
    }
}
