//! Deterministic recommendation engine
//!
//! Blends quantitative, qualitative, and stability scores into a conviction
//! level and maps it onto a buy/hold/trim/exit recommendation. The model
//! summarizes news; every number that feeds the recommendation is computed
//! here, not by the model.

use crate::audit::AuditLog;
use crate::error::{AdvisorError, Result};
use crate::model::{NarrativeInsight, Position, Recommendation, Thesis};
use crate::scoring;
use crate::summarizer::NewsSummarizer;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Days a position must be held before a trim or exit is considered
const MIN_HOLDING_DAYS: i64 = 90;

/// Produces an investment thesis for a single ticker
pub struct DecisionEngine {
    summarizer: Arc<dyn NewsSummarizer>,
    positions: HashMap<String, Position>,
    thesis_log: AuditLog,
}

impl DecisionEngine {
    pub fn new(
        summarizer: Arc<dyn NewsSummarizer>,
        positions: Vec<Position>,
        thesis_log: AuditLog,
    ) -> Self {
        let positions = positions
            .into_iter()
            .map(|p| (p.ticker.clone(), p))
            .collect();
        Self {
            summarizer,
            positions,
            thesis_log,
        }
    }

    /// Evaluate a ticker and produce a full thesis
    ///
    /// `fundamentals` is the raw metric map from the market data provider and
    /// `news` the raw article list. The thesis is returned to the caller; it
    /// is not appended to the log here, so the same engine serves both the
    /// tool registry and the screening run with their own logging rules.
    #[instrument(skip(self, fundamentals, news))]
    pub async fn evaluate(
        &self,
        ticker: &str,
        fundamentals: &Value,
        news: &[Value],
    ) -> Result<Thesis> {
        if ticker.trim().is_empty() {
            return Err(AdvisorError::InvalidInput(
                "ticker must not be empty".to_string(),
            ));
        }

        let payloads = self.summarizer.summarize(ticker, news).await?;
        let mut insights = Vec::with_capacity(payloads.len());
        let mut catalysts = Vec::new();
        let mut risks = Vec::new();
        for payload in payloads {
            if let Some(catalyst) = payload.catalyst.filter(|s| !s.is_empty()) {
                catalysts.push(catalyst);
            }
            if let Some(risk) = payload.risk.filter(|s| !s.is_empty()) {
                risks.push(risk);
            }
            insights.push(NarrativeInsight {
                headline: payload.headline,
                sentiment: payload.sentiment,
                summary: payload.summary,
            });
        }

        let quantitative_score = scoring::score_quantitative(fundamentals);
        let qualitative_score = scoring::score_qualitative(&insights);
        let stability_score = scoring::score_stability(fundamentals);
        let conviction =
            scoring::blend_conviction(quantitative_score, qualitative_score, stability_score);

        let position = self.positions.get(ticker);
        let is_held = position.is_some();
        let holding_days = if is_held { self.holding_days(ticker) } else { None };
        let recommendation = derive_recommendation(ticker, conviction, is_held, holding_days);
        info!(
            ticker,
            conviction,
            recommendation = recommendation.as_str(),
            "Evaluated security"
        );

        let rationale = build_rationale(
            ticker,
            position,
            quantitative_score,
            qualitative_score,
            stability_score,
            conviction,
            holding_days,
        );
        Ok(Thesis {
            ticker: ticker.to_string(),
            recommendation,
            conviction,
            quantitative_score,
            qualitative_score,
            stability_score,
            rationale,
            risks,
            catalysts,
            insights,
            suggested_action: None,
        })
    }

    pub fn thesis_log(&self) -> &AuditLog {
        &self.thesis_log
    }

    fn holding_days(&self, ticker: &str) -> Option<i64> {
        let first_buy = self.thesis_log.find_first_buy(ticker)?;
        let days = (Utc::now() - first_buy).num_days();
        info!(ticker, days, "Found first buy record");
        Some(days)
    }
}

/// Map conviction onto a recommendation for a held or unheld security
fn derive_recommendation(
    ticker: &str,
    conviction: f64,
    is_held: bool,
    holding_days: Option<i64>,
) -> Recommendation {
    if is_held {
        // A held position with no recorded buy counts as day zero
        let days = holding_days.unwrap_or(0);
        if days < MIN_HOLDING_DAYS {
            if conviction < 0.35 {
                warn!(
                    ticker,
                    days, conviction, "Weak conviction inside the minimum holding period"
                );
            }
            return Recommendation::Hold;
        }
        if conviction >= 0.65 {
            // Strong conviction keeps the position; never adds to it
            return Recommendation::Hold;
        }
        if conviction >= 0.45 {
            return Recommendation::Hold;
        }
        if conviction >= 0.35 {
            return Recommendation::Trim;
        }
        return Recommendation::Exit;
    }
    if conviction >= 0.75 {
        Recommendation::Buy
    } else {
        Recommendation::Hold
    }
}

fn build_rationale(
    ticker: &str,
    position: Option<&Position>,
    quantitative: f64,
    qualitative: f64,
    stability: f64,
    conviction: f64,
    holding_days: Option<i64>,
) -> String {
    let mut lines = vec![format!("Long-term investment analysis for {ticker}:")];
    match position {
        Some(p) => lines.push(format!(
            "Currently held: {} shares at avg ${:.2}.",
            p.quantity, p.average_price
        )),
        None => lines.push("Not currently held.".to_string()),
    }
    lines.push(format!(
        "Quantitative score: {quantitative:.2} (dividend yield, profitability, ROA/ROE)"
    ));
    lines.push(format!(
        "Qualitative score: {qualitative:.2} (recent news sentiment)"
    ));
    lines.push(format!(
        "Stability score: {stability:.2} (debt levels, beta, earnings consistency)"
    ));
    lines.push(format!("Blended conviction: {conviction:.2}"));
    if let Some(days) = holding_days {
        lines.push(format!(
            "Holding period: {days} days (min threshold: {MIN_HOLDING_DAYS} days)"
        ));
    }
    lines.join("\n")
}
