//! Plain-text report rendering and delivery

use crate::error::Result;
use crate::model::{Position, Recommendation, Thesis};
use advisor_agent::{AgentRunReport, RunOutcome};
use async_trait::async_trait;
use chrono::Utc;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use std::collections::BTreeMap;
use tracing::info;

/// Render one agent run as the analysis report body
pub fn render_agent_report(report: &AgentRunReport) -> String {
    let banner = "=".repeat(60);
    let mut lines = vec![
        banner.clone(),
        "AI INVESTOR - AGENT ANALYSIS REPORT".to_string(),
        banner.clone(),
        String::new(),
        format!("Analysis Date: {}", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        format!("Agent Iterations: {}", report.iterations),
        format!("Tools Used: {}", report.tool_calls.len()),
    ];
    match &report.outcome {
        RunOutcome::Done { .. } => {}
        RunOutcome::Errored { error } => lines.push(format!("Outcome: errored ({error})")),
        RunOutcome::MaxIterations => {
            lines.push("Outcome: stopped at the iteration limit".to_string());
        }
    }
    lines.extend([
        String::new(),
        banner.clone(),
        "AGENT REASONING AND DECISIONS:".to_string(),
        banner.clone(),
        String::new(),
        report.content.clone(),
        String::new(),
        banner.clone(),
        "TOOL EXECUTION SUMMARY:".to_string(),
        banner.clone(),
        String::new(),
    ]);

    if report.tool_calls.is_empty() {
        lines.push("  No tools were executed".to_string());
    } else {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for call in &report.tool_calls {
            *counts.entry(call.tool.as_str()).or_insert(0) += 1;
        }
        for (tool, count) in counts {
            lines.push(format!("  {tool}: {count} call(s)"));
        }
        let failed = report.failed_calls();
        if !failed.is_empty() {
            lines.push(String::new());
            lines.push("Failed Tool Calls:".to_string());
            for call in failed {
                lines.push(format!(
                    "  - {}: {}",
                    call.tool,
                    call.error.as_deref().unwrap_or("Unknown error")
                ));
            }
        }
    }

    lines.extend([
        String::new(),
        banner.clone(),
        "This is an automated investment analysis report.".to_string(),
        "All trades are MOCKED for testing purposes - no real transactions occurred.".to_string(),
        banner,
    ]);
    lines.join("\n")
}

/// Render the screening run's theses as the daily summary body
pub fn render_daily_summary(theses: &[Thesis]) -> String {
    let banner = "=".repeat(60);
    let divider = "-".repeat(60);
    let mut lines = vec![
        banner.clone(),
        "AI INVESTOR - DAILY SUMMARY".to_string(),
        banner.clone(),
        String::new(),
        format!("Analysis Date: {}", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        format!("Total Securities Evaluated: {}", theses.len()),
        String::new(),
    ];

    let mut buys: Vec<&Thesis> = by_recommendation(theses, Recommendation::Buy);
    let holds: Vec<&Thesis> = by_recommendation(theses, Recommendation::Hold);
    let trims: Vec<&Thesis> = by_recommendation(theses, Recommendation::Trim);
    let mut exits: Vec<&Thesis> = by_recommendation(theses, Recommendation::Exit);

    if !buys.is_empty() {
        lines.push("BUY RECOMMENDATIONS:".to_string());
        lines.push(divider.clone());
        buys.sort_by(|a, b| b.conviction.total_cmp(&a.conviction));
        for thesis in buys {
            lines.push(format!(
                "\n{} - Conviction: {:.2}",
                thesis.ticker, thesis.conviction
            ));
            lines.push(format!(
                "  Quantitative: {:.2} | Qualitative: {:.2}",
                thesis.quantitative_score, thesis.qualitative_score
            ));
            lines.push(format!("  Catalysts: {}", join_or_none(&thesis.catalysts)));
            lines.push(format!("  Risks: {}", join_or_none(&thesis.risks)));
        }
    }

    if !exits.is_empty() {
        lines.push(String::new());
        lines.push("EXIT RECOMMENDATIONS:".to_string());
        lines.push(divider.clone());
        exits.sort_by(|a, b| a.conviction.total_cmp(&b.conviction));
        for thesis in exits {
            lines.push(format!(
                "\n{} - Conviction: {:.2}",
                thesis.ticker, thesis.conviction
            ));
            lines.push(format!(
                "  Quantitative: {:.2} | Qualitative: {:.2}",
                thesis.quantitative_score, thesis.qualitative_score
            ));
            lines.push(format!("  Risks: {}", join_or_none(&thesis.risks)));
        }
    }

    if !holds.is_empty() {
        lines.push(String::new());
        lines.push(format!("HOLD RECOMMENDATIONS: {} positions", holds.len()));
        lines.push(divider.clone());
        let mut ranked = holds;
        ranked.sort_by(|a, b| b.conviction.total_cmp(&a.conviction));
        for thesis in ranked.into_iter().take(5) {
            lines.push(format!(
                "  {}: {:.2} (Q:{:.2} QL:{:.2})",
                thesis.ticker,
                thesis.conviction,
                thesis.quantitative_score,
                thesis.qualitative_score
            ));
        }
    }

    if !trims.is_empty() {
        lines.push(String::new());
        lines.push(format!("TRIM RECOMMENDATIONS: {} positions", trims.len()));
        for thesis in trims {
            lines.push(format!("  {}: {:.2}", thesis.ticker, thesis.conviction));
        }
    }

    lines.extend([
        String::new(),
        banner.clone(),
        "This is an automated investment analysis report.".to_string(),
        "All recommendations require manual approval before execution.".to_string(),
        banner,
    ]);
    lines.join("\n")
}

/// Render the portfolio as a terminal table
pub fn render_positions_table(positions: &[Position]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Ticker",
        "Name",
        "Quantity",
        "Avg Price",
        "Current",
        "Market Value",
        "P&L",
        "P&L %",
    ]);
    for position in positions {
        table.add_row(vec![
            position.ticker.clone(),
            position.name.clone(),
            position.quantity.to_string(),
            format!("{:.2}", position.average_price),
            format!("{:.2}", position.current_price),
            format!("{:.2}", position.market_value),
            format!("{:.2}", position.unrealized_pnl),
            format!("{:.2}%", position.unrealized_pnl_percent),
        ]);
    }
    table.to_string()
}

fn by_recommendation(theses: &[Thesis], recommendation: Recommendation) -> Vec<&Thesis> {
    theses
        .iter()
        .filter(|t| t.recommendation == recommendation)
        .collect()
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Destination for finished report bodies
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()>;
}

/// Sink that prints the report to stdout
pub struct ConsoleSink;

#[async_trait]
impl ReportSink for ConsoleSink {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject, "Delivering report to the console");
        println!("{body}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_agent::ToolCallRecord;
    use advisor_llm::StopReason;
    use serde_json::json;

    fn thesis(ticker: &str, recommendation: Recommendation, conviction: f64) -> Thesis {
        Thesis {
            ticker: ticker.to_string(),
            recommendation,
            conviction,
            quantitative_score: 0.4,
            qualitative_score: 0.5,
            stability_score: 0.6,
            rationale: "test".to_string(),
            risks: vec![],
            catalysts: vec![],
            insights: vec![],
            suggested_action: None,
        }
    }

    fn done_report(tool_calls: Vec<ToolCallRecord>) -> AgentRunReport {
        AgentRunReport {
            content: "Final analysis".to_string(),
            iterations: 3,
            tool_calls,
            outcome: RunOutcome::Done {
                stop_reason: StopReason::EndTurn,
            },
        }
    }

    #[test]
    fn test_agent_report_counts_tools_alphabetically() {
        let report = done_report(vec![
            ToolCallRecord::success("news", json!({}), "[]".to_string()),
            ToolCallRecord::success("funds", json!({}), "{}".to_string()),
            ToolCallRecord::success("news", json!({}), "[]".to_string()),
        ]);
        let body = render_agent_report(&report);
        assert!(body.contains("Agent Iterations: 3"));
        assert!(body.contains("Tools Used: 3"));
        assert!(body.contains("  funds: 1 call(s)"));
        assert!(body.contains("  news: 2 call(s)"));
        let funds_at = body.find("  funds:").unwrap();
        let news_at = body.find("  news:").unwrap();
        assert!(funds_at < news_at);
        assert!(!body.contains("Outcome:"));
        assert!(!body.contains("Failed Tool Calls:"));
    }

    #[test]
    fn test_agent_report_without_tools() {
        let body = render_agent_report(&done_report(vec![]));
        assert!(body.contains("  No tools were executed"));
    }

    #[test]
    fn test_agent_report_itemizes_failures() {
        let mut report = done_report(vec![
            ToolCallRecord::success("positions", json!({}), "[]".to_string()),
            ToolCallRecord::failure("place_order", json!({}), "Invalid input".to_string()),
        ]);
        report.outcome = RunOutcome::Errored {
            error: "connection reset".to_string(),
        };
        let body = render_agent_report(&report);
        assert!(body.contains("Outcome: errored (connection reset)"));
        assert!(body.contains("Failed Tool Calls:"));
        assert!(body.contains("  - place_order: Invalid input"));
    }

    #[test]
    fn test_agent_report_marks_the_iteration_cap() {
        let mut report = done_report(vec![]);
        report.outcome = RunOutcome::MaxIterations;
        let body = render_agent_report(&report);
        assert!(body.contains("Outcome: stopped at the iteration limit"));
    }

    #[test]
    fn test_daily_summary_sections_and_ordering() {
        let theses = vec![
            thesis("LOWBUY", Recommendation::Buy, 0.76),
            thesis("TOPBUY", Recommendation::Buy, 0.91),
            thesis("BADEXIT", Recommendation::Exit, 0.10),
            thesis("OKEXIT", Recommendation::Exit, 0.30),
            thesis("TRIMME", Recommendation::Trim, 0.40),
            thesis("KEEP", Recommendation::Hold, 0.55),
        ];
        let body = render_daily_summary(&theses);
        assert!(body.contains("Total Securities Evaluated: 6"));
        assert!(body.contains("BUY RECOMMENDATIONS:"));
        assert!(body.contains("EXIT RECOMMENDATIONS:"));
        assert!(body.contains("HOLD RECOMMENDATIONS: 1 positions"));
        assert!(body.contains("TRIM RECOMMENDATIONS: 1 positions"));
        assert!(body.contains("All recommendations require manual approval before execution."));

        // Buys descend by conviction, exits ascend
        let top = body.find("TOPBUY - Conviction: 0.91").unwrap();
        let low = body.find("LOWBUY - Conviction: 0.76").unwrap();
        assert!(top < low);
        let bad = body.find("BADEXIT - Conviction: 0.10").unwrap();
        let ok = body.find("OKEXIT - Conviction: 0.30").unwrap();
        assert!(bad < ok);
    }

    #[test]
    fn test_daily_summary_caps_holds_at_five() {
        let theses: Vec<Thesis> = (0..7)
            .map(|i| {
                thesis(
                    &format!("HOLD{i}"),
                    Recommendation::Hold,
                    0.50 + f64::from(i) * 0.01,
                )
            })
            .collect();
        let body = render_daily_summary(&theses);
        assert!(body.contains("HOLD RECOMMENDATIONS: 7 positions"));
        // Strongest five listed, weakest two dropped
        assert!(body.contains("HOLD6: 0.56"));
        assert!(body.contains("HOLD2: 0.52"));
        assert!(!body.contains("HOLD1: 0.51"));
        assert!(!body.contains("HOLD0: 0.50"));
    }

    #[test]
    fn test_positions_table_renders_each_row() {
        let positions = vec![Position {
            ticker: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            quantity: 10,
            average_price: 150.5,
            current_price: 175.2,
            market_value: 1752.0,
            unrealized_pnl: 247.0,
            unrealized_pnl_percent: 16.41,
        }];
        let table = render_positions_table(&positions);
        assert!(table.contains("AAPL"));
        assert!(table.contains("150.50"));
        assert!(table.contains("16.41%"));
    }
}
