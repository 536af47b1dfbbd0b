//! Human-in-the-loop approval via the terminal
//!
//! Renders a thesis, asks for y/n/s, and records every decision in the
//! trade decision log. The input source is injectable so tests can script
//! the operator.

use crate::audit::AuditLog;
use crate::error::Result;
use crate::model::{ApprovalDecision, ApprovalOutcome, OrderTicket, Thesis};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::info;

type InputFn = Box<dyn FnMut(&str) -> String + Send>;

/// Terminal gate requiring a human decision per proposal
pub struct ApprovalGate {
    input: InputFn,
    decision_log: AuditLog,
}

impl ApprovalGate {
    /// Gate reading decisions from stdin
    pub fn new(decision_log: AuditLog) -> Self {
        Self::with_input(decision_log, Box::new(prompt_stdin))
    }

    /// Gate reading decisions from a custom input source
    pub fn with_input(decision_log: AuditLog, input: InputFn) -> Self {
        Self {
            input,
            decision_log,
        }
    }

    /// Show a proposal and block until the operator decides
    pub fn request(
        &mut self,
        thesis: &Thesis,
        proposed_order: Option<&OrderTicket>,
    ) -> Result<ApprovalOutcome> {
        render_thesis(thesis);
        if let Some(order) = proposed_order {
            println!("Proposed order: {}", serde_json::to_string(order)?);
        }
        loop {
            let response = (self.input)("Approve trade? (y/n/s): ");
            let response = response.trim().to_lowercase();
            let decision = match response.as_str() {
                "y" => ApprovalDecision::Approved,
                "n" => ApprovalDecision::Rejected,
                "s" => ApprovalDecision::Skipped,
                _ => {
                    println!("Enter y (approve), n (reject), or s (skip).");
                    continue;
                }
            };
            let record = json!({
                "ticker": thesis.ticker,
                "recommendation": thesis.recommendation.as_str(),
                "conviction": thesis.conviction,
                "decision": decision.as_str(),
                "proposed_order": proposed_order,
            });
            self.decision_log.append(&record)?;
            info!(
                ticker = %thesis.ticker,
                decision = decision.as_str(),
                "Recorded approval decision"
            );
            return Ok(ApprovalOutcome {
                thesis: thesis.clone(),
                approved: decision == ApprovalDecision::Approved,
                decision,
            });
        }
    }
}

fn render_thesis(thesis: &Thesis) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        "Recommendation".to_string(),
        thesis.recommendation.as_str().to_string(),
    ]);
    table.add_row(vec!["Conviction".to_string(), format!("{:.2}", thesis.conviction)]);
    table.add_row(vec![
        "Quantitative Score".to_string(),
        format!("{:.2}", thesis.quantitative_score),
    ]);
    table.add_row(vec![
        "Qualitative Score".to_string(),
        format!("{:.2}", thesis.qualitative_score),
    ]);
    table.add_row(vec![
        "Stability Score".to_string(),
        format!("{:.2}", thesis.stability_score),
    ]);
    table.add_row(vec!["Catalysts".to_string(), join_or_na(&thesis.catalysts)]);
    table.add_row(vec!["Risks".to_string(), join_or_na(&thesis.risks)]);
    println!("Proposal for {}", thesis.ticker);
    println!("{table}");
    println!("Rationale:\n{}", thesis.rationale);

    if !thesis.insights.is_empty() {
        let mut insights_table = Table::new();
        insights_table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Headline", "Sentiment", "Summary"]);
        for item in &thesis.insights {
            insights_table.add_row(vec![
                item.headline.clone(),
                item.sentiment.clone(),
                item.summary.clone(),
            ]);
        }
        println!("News Insights");
        println!("{insights_table}");
    }
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join("\n")
    }
}

fn prompt_stdin(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        // Treat EOF and read errors as a skip so unattended runs cannot hang
        Ok(0) | Err(_) => "s".to_string(),
        Ok(_) => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NarrativeInsight, Recommendation};
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn thesis(recommendation: Recommendation) -> Thesis {
        Thesis {
            ticker: "AAPL".to_string(),
            recommendation,
            conviction: 0.8,
            quantitative_score: 0.9,
            qualitative_score: 0.75,
            stability_score: 0.6,
            rationale: "Strong fundamentals".to_string(),
            risks: vec!["Regulatory pressure".to_string()],
            catalysts: vec!["New product cycle".to_string()],
            insights: vec![NarrativeInsight {
                headline: "Record quarter".to_string(),
                sentiment: "positive".to_string(),
                summary: "Margins up".to_string(),
            }],
            suggested_action: None,
        }
    }

    fn order() -> OrderTicket {
        OrderTicket {
            ticker: "AAPL".to_string(),
            side: crate::model::OrderSide::Buy,
            quantity: 5,
            price: 170.0,
        }
    }

    fn scripted(responses: &[&str]) -> InputFn {
        let mut queue: VecDeque<String> = responses.iter().map(|s| (*s).to_string()).collect();
        Box::new(move |_prompt| queue.pop_front().unwrap_or_else(|| "s".to_string()))
    }

    fn gate(dir: &TempDir, responses: &[&str]) -> (ApprovalGate, AuditLog) {
        let log = AuditLog::new(dir.path().join("decision_log.jsonl"));
        let gate = ApprovalGate::with_input(log.clone(), scripted(responses));
        (gate, log)
    }

    #[test]
    fn test_approval_is_logged_with_the_order() {
        let dir = TempDir::new().unwrap();
        let (mut gate, log) = gate(&dir, &["y"]);
        let outcome = gate.request(&thesis(Recommendation::Buy), Some(&order())).unwrap();
        assert!(outcome.approved);
        assert_eq!(outcome.decision, ApprovalDecision::Approved);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["ticker"], "AAPL");
        assert_eq!(records[0]["decision"], "approved");
        assert_eq!(records[0]["proposed_order"]["quantity"], 5);
        assert!(records[0]["ts"].is_string());
    }

    #[test]
    fn test_rejection_is_not_approved() {
        let dir = TempDir::new().unwrap();
        let (mut gate, log) = gate(&dir, &["n"]);
        let outcome = gate.request(&thesis(Recommendation::Buy), None).unwrap();
        assert!(!outcome.approved);
        assert_eq!(outcome.decision, ApprovalDecision::Rejected);
        assert_eq!(log.records()[0]["proposed_order"], serde_json::Value::Null);
    }

    #[test]
    fn test_skip_is_logged_but_not_approved() {
        let dir = TempDir::new().unwrap();
        let (mut gate, log) = gate(&dir, &["s"]);
        let outcome = gate.request(&thesis(Recommendation::Exit), None).unwrap();
        assert!(!outcome.approved);
        assert_eq!(outcome.decision, ApprovalDecision::Skipped);
        assert_eq!(log.records()[0]["decision"], "skipped");
    }

    #[test]
    fn test_garbage_input_reprompts_until_valid() {
        let dir = TempDir::new().unwrap();
        let (mut gate, log) = gate(&dir, &["maybe", "", "Y"]);
        let outcome = gate.request(&thesis(Recommendation::Buy), None).unwrap();
        assert!(outcome.approved);
        // Only the final valid answer reaches the log
        assert_eq!(log.records().len(), 1);
    }
}
