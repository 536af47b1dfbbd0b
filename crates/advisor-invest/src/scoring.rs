//! Deterministic scoring of fundamentals and news sentiment
//!
//! All scoring functions are pure and total: missing or malformed metrics
//! fall back to documented defaults and every result lands in [0, 1].

use crate::model::NarrativeInsight;
use serde_json::Value;
use tracing::debug;

/// Blend weight of the quantitative score
pub const QUANTITATIVE_WEIGHT: f64 = 0.50;
/// Blend weight of the qualitative score
pub const QUALITATIVE_WEIGHT: f64 = 0.35;
/// Blend weight of the stability score
pub const STABILITY_WEIGHT: f64 = 0.15;

/// Read a named metric from a fundamentals object
///
/// Accepts JSON numbers and string-encoded numbers; anything else (missing
/// key, null, garbage string, non-finite value) yields the default.
fn metric(fundamentals: &Value, key: &str, default: f64) -> f64 {
    match fundamentals.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(default),
        _ => default,
    }
}

/// Dividend and profitability score in [0, 1]
///
/// Weighted sum of normalized sub-metrics: dividend yield (capped at 6%),
/// payout-ratio closeness to 50%, net margin (capped at 30%), ROA (capped at
/// 15%), and ROE (capped at 20%). Missing metrics default to 0.
pub fn score_quantitative(fundamentals: &Value) -> f64 {
    let dividend_yield = metric(fundamentals, "DividendYield", 0.0);
    let payout_ratio = metric(fundamentals, "PayoutRatio", 0.0);
    let net_margin = metric(fundamentals, "NetProfitMargin", 0.0);
    let roa = metric(fundamentals, "ReturnOnAssetsTTM", 0.0);
    let roe = metric(fundamentals, "ReturnOnEquityTTM", 0.0);

    let mut score = 0.0;
    score += (dividend_yield / 6.0).min(1.0) * 0.3;
    score += (1.0 - ((payout_ratio - 50.0).abs() / 50.0).min(1.0)) * 0.2;
    score += (net_margin.max(0.0) / 30.0).min(1.0) * 0.2;
    score += (roa.max(0.0) / 15.0).min(1.0) * 0.15;
    score += (roe.max(0.0) / 20.0).min(1.0) * 0.15;
    debug!(score, "Quantitative score computed");
    score.clamp(0.0, 1.0)
}

/// News sentiment score in [0, 1]
///
/// Each insight maps to a fixed scalar (positive 0.75, negative 0.25,
/// anything else 0.5) and the scalars are averaged. No insights at all is a
/// neutral prior of exactly 0.5, not an error.
pub fn score_qualitative(insights: &[NarrativeInsight]) -> f64 {
    if insights.is_empty() {
        return 0.5;
    }
    let total: f64 = insights
        .iter()
        .map(|item| match item.sentiment.as_str() {
            "positive" => 0.75,
            "negative" => 0.25,
            _ => 0.5,
        })
        .sum();
    (total / insights.len() as f64).clamp(0.0, 1.0)
}

/// Balance-sheet stability score in [0, 1]
///
/// Combines a debt-to-equity penalty (decays to 0 as debt/equity approaches
/// 2.0), a beta-closeness-to-0.8 penalty (decays over a 1.2-wide band), and
/// an earnings-stability passthrough. Missing debt defaults to 100 (worst
/// case), missing beta to 1.5, missing earnings stability to 0.5.
pub fn score_stability(fundamentals: &Value) -> f64 {
    let debt_to_equity = metric(fundamentals, "DebtToEquity", 100.0);
    let beta = metric(fundamentals, "Beta", 1.5);
    let earnings_stability = metric(fundamentals, "EarningsStability", 0.5);

    let debt_score = (1.0 - (debt_to_equity / 2.0).min(1.0)).max(0.0);
    let beta_score = (1.0 - ((beta - 0.8).abs() / 1.2).min(1.0)).max(0.0);
    let score = debt_score * 0.4 + beta_score * 0.4 + earnings_stability * 0.2;
    debug!(score, debt_to_equity, beta, "Stability score computed");
    score.clamp(0.0, 1.0)
}

/// Fixed-weight conviction blend of the three component scores
pub fn blend_conviction(quantitative: f64, qualitative: f64, stability: f64) -> f64 {
    QUANTITATIVE_WEIGHT * quantitative + QUALITATIVE_WEIGHT * qualitative + STABILITY_WEIGHT * stability
}
