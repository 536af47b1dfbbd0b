//! Run-level orchestration
//!
//! Two entry points cover the two ways the advisor runs:
//!
//! - [`AgentOrchestrator`] hands the full toolbox to the model and lets it
//!   drive a bounded analysis loop
//! - [`DailyScreening`] walks the cached shortlist mechanically, gating every
//!   buy or exit through manual approval
//!
//! Both share the same engine, logs, and broker plumbing.

use crate::approval::ApprovalGate;
use crate::audit::AuditLog;
use crate::broker::{Broker, MockBroker};
use crate::config::Settings;
use crate::engine::DecisionEngine;
use crate::error::Result;
use crate::market::{EodhdClient, MarketData};
use crate::model::{OrderSide, OrderTicket, Recommendation, Thesis};
use crate::prompts::{AGENT_SYSTEM_PROMPT, initial_analysis_message};
use crate::report::{ConsoleSink, ReportSink, render_daily_summary};
use crate::shortlist::{ShortlistPipeline, entry_symbol};
use crate::summarizer::{LlmNewsSummarizer, NewsSummarizer};
use crate::tools::InvestmentToolbox;
use advisor_agent::{AgentDriver, AgentRunReport};
use advisor_llm::{AnthropicProvider, LLMProvider};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// News lookback window used during screening, in days
const SCREENING_NEWS_LOOKBACK_DAYS: i64 = 30;

/// Cash budget one screening-proposed buy may consume
const ORDER_BUDGET: f64 = 1000.0;

/// Runs one agent-driven analysis session over the full toolbox
pub struct AgentOrchestrator {
    provider: Arc<dyn LLMProvider>,
    broker: Arc<dyn Broker>,
    market: Arc<dyn MarketData>,
    settings: Settings,
}

impl AgentOrchestrator {
    /// Create an orchestrator over explicit collaborators
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        broker: Arc<dyn Broker>,
        market: Arc<dyn MarketData>,
        settings: Settings,
    ) -> Self {
        Self {
            provider,
            broker,
            market,
            settings,
        }
    }

    /// Wire up the production collaborators from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate_for_agent()?;
        settings.validate_for_market()?;

        let provider = AnthropicProvider::new(settings.anthropic_api_key.clone())?;
        let market = EodhdClient::new(&settings.market_api_key, settings.market_rate_limit)
            .with_base_url(&settings.market_base_url);

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(MockBroker::new()),
            Arc::new(market),
            settings.clone(),
        ))
    }

    /// Run one bounded agent session and return its report
    ///
    /// The loop itself never fails; only setup errors (broker authentication,
    /// position loading) propagate.
    pub async fn run(&self) -> Result<AgentRunReport> {
        self.broker.authenticate().await?;
        let positions = self.broker.list_positions().await?;
        info!(
            position_count = positions.len(),
            "Loaded portfolio for agent session"
        );

        let thesis_log = AuditLog::new(&self.settings.thesis_log_path);
        let summarizer: Arc<dyn NewsSummarizer> = Arc::new(LlmNewsSummarizer::new(
            self.provider.clone(),
            &self.settings.model,
        ));
        let engine = Arc::new(DecisionEngine::new(
            summarizer,
            positions,
            thesis_log.clone(),
        ));
        let shortlist = Arc::new(ShortlistPipeline::new(
            &self.settings.shortlist_cache_path,
            self.settings.shortlist_target_size,
            self.settings.shortlist_refresh_days,
            &self.settings.default_exchange,
        ));
        let toolbox = Arc::new(InvestmentToolbox::new(
            self.broker.clone(),
            self.market.clone(),
            engine,
            shortlist,
            thesis_log,
        ));

        let driver = AgentDriver::builder(self.provider.clone(), toolbox)
            .model(&self.settings.model)
            .system_prompt(AGENT_SYSTEM_PROMPT)
            .max_tokens(self.settings.agent_max_tokens)
            .max_iterations(self.settings.agent_max_iterations)
            .build();

        let report = driver.run(initial_analysis_message()).await;
        info!(
            iterations = report.iterations,
            tool_call_count = report.tool_calls.len(),
            outcome = report.outcome.label(),
            "Agent session finished"
        );
        Ok(report)
    }
}

/// Walks the shortlist once, evaluating every candidate and gating trades
pub struct DailyScreening {
    broker: Arc<dyn Broker>,
    market: Arc<dyn MarketData>,
    summarizer: Arc<dyn NewsSummarizer>,
    sink: Arc<dyn ReportSink>,
    settings: Settings,
}

impl DailyScreening {
    /// Create a screening run over explicit collaborators
    pub fn new(
        broker: Arc<dyn Broker>,
        market: Arc<dyn MarketData>,
        summarizer: Arc<dyn NewsSummarizer>,
        sink: Arc<dyn ReportSink>,
        settings: Settings,
    ) -> Self {
        Self {
            broker,
            market,
            summarizer,
            sink,
            settings,
        }
    }

    /// Wire up the production collaborators from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate_for_agent()?;
        settings.validate_for_market()?;

        let provider = AnthropicProvider::new(settings.anthropic_api_key.clone())?;
        let summarizer = LlmNewsSummarizer::new(Arc::new(provider), &settings.model);
        let market = EodhdClient::new(&settings.market_api_key, settings.market_rate_limit)
            .with_base_url(&settings.market_base_url);

        Ok(Self::new(
            Arc::new(MockBroker::new()),
            Arc::new(market),
            Arc::new(summarizer),
            Arc::new(ConsoleSink),
            settings.clone(),
        ))
    }

    /// Evaluate every shortlisted security, then deliver a daily summary
    ///
    /// A broker outage degrades to an empty portfolio rather than aborting the
    /// run; market data failures abort because every later step depends on
    /// them. Delivery failures are logged and swallowed so a broken sink never
    /// discards a finished analysis.
    pub async fn run(&self, gate: &mut ApprovalGate) -> Result<Vec<Thesis>> {
        let positions = match self.load_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "Could not load positions; screening an empty portfolio");
                Vec::new()
            }
        };

        let thesis_log = AuditLog::new(&self.settings.thesis_log_path);
        let engine = DecisionEngine::new(
            self.summarizer.clone(),
            positions,
            thesis_log.clone(),
        );
        let pipeline = ShortlistPipeline::new(
            &self.settings.shortlist_cache_path,
            self.settings.shortlist_target_size,
            self.settings.shortlist_refresh_days,
            &self.settings.default_exchange,
        );

        let shortlist = pipeline.ensure_shortlist(self.market.as_ref()).await?;
        println!("Evaluating {} shortlisted securities", shortlist.tickers.len());
        info!(
            candidate_count = shortlist.tickers.len(),
            "Starting shortlist evaluation"
        );

        let mut theses = Vec::new();
        for entry in &shortlist.tickers {
            let Some(ticker) = entry_symbol(entry) else {
                continue;
            };

            let fundamentals = self.market.get_fundamentals(&ticker).await?;
            let news = self
                .market
                .get_news(&ticker, SCREENING_NEWS_LOOKBACK_DAYS)
                .await?;
            let thesis = engine.evaluate(&ticker, &fundamentals, &news).await?;
            thesis_log.append(&serde_json::to_value(&thesis)?)?;

            if matches!(
                thesis.recommendation,
                Recommendation::Buy | Recommendation::Exit
            ) {
                let order = proposed_order(&thesis, entry);
                let outcome = gate.request(&thesis, order.as_ref())?;
                if outcome.approved {
                    if let Some(ticket) = order {
                        match self.broker.place_order(ticket).await {
                            Ok(confirmation) => {
                                info!(
                                    order_id = %confirmation.order_id,
                                    ticker = %confirmation.ticker,
                                    "Mock order placed"
                                );
                                println!("Order submitted (MOCK): {}", confirmation.order_id);
                            }
                            Err(e) => {
                                error!(ticker = %thesis.ticker, error = %e, "Order placement failed");
                            }
                        }
                    }
                }
            }

            theses.push(thesis);
        }

        if theses.is_empty() {
            info!("No securities evaluated; skipping the daily summary");
            return Ok(theses);
        }

        let body = render_daily_summary(&theses);
        if let Err(e) = self.sink.deliver("AI Investor Daily Summary", &body).await {
            error!(error = %e, "Report delivery failed");
        }

        Ok(theses)
    }

    async fn load_positions(&self) -> Result<Vec<crate::model::Position>> {
        self.broker.authenticate().await?;
        self.broker.list_positions().await
    }
}

/// Size a gate-ready order from the shortlist entry's price snapshot
///
/// Returns None when the recommendation is not tradeable or the entry carries
/// no usable price, in which case the approval is recorded without an order.
fn proposed_order(thesis: &Thesis, entry: &Value) -> Option<OrderTicket> {
    let side = match thesis.recommendation {
        Recommendation::Buy => OrderSide::Buy,
        Recommendation::Exit => OrderSide::Sell,
        _ => return None,
    };

    let price = ["close", "previousClose"]
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_f64))
        .filter(|price| *price > 0.0)?;

    let quantity = ((ORDER_BUDGET / price).floor() as u32).max(1);
    Some(OrderTicket {
        ticker: thesis.ticker.clone(),
        side,
        quantity,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::model::{AccountFunds, OrderConfirmation, Position};
    use crate::summarizer::InsightPayload;
    use advisor_llm::{
        CompletionRequest, CompletionResponse, ContentBlock, LLMError, Message, StopReason,
        TokenUsage,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<advisor_llm::Result<CompletionResponse>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<advisor_llm::Result<CompletionResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> advisor_llm::Result<CompletionResponse> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct StubMarket {
        entries: Vec<Value>,
    }

    #[async_trait]
    impl MarketData for StubMarket {
        async fn get_fundamentals(&self, _ticker: &str) -> Result<Value> {
            Ok(json!({
                "DividendYield": 6.0,
                "PayoutRatio": 50.0,
                "NetProfitMargin": 30.0,
                "ReturnOnAssetsTTM": 15.0,
                "ReturnOnEquityTTM": 20.0,
                "DebtToEquity": 0.0,
                "Beta": 0.8,
                "EarningsStability": 1.0,
            }))
        }

        async fn get_news(&self, _ticker: &str, _lookback_days: i64) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn screen_dividend_large_caps(&self, _exchange: &str) -> Result<Vec<Value>> {
            Ok(self.entries.clone())
        }
    }

    struct StubSummarizer;

    #[async_trait]
    impl NewsSummarizer for StubSummarizer {
        async fn summarize(&self, _ticker: &str, _articles: &[Value]) -> Result<Vec<InsightPayload>> {
            Ok(Vec::new())
        }
    }

    struct CaptureSink {
        deliveries: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ReportSink for CaptureSink {
        async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
            self.deliveries
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingBroker;

    #[async_trait]
    impl Broker for FailingBroker {
        async fn authenticate(&self) -> Result<()> {
            Err(AdvisorError::Broker("session expired".to_string()))
        }

        async fn list_positions(&self) -> Result<Vec<Position>> {
            Err(AdvisorError::Broker("session expired".to_string()))
        }

        async fn get_available_funds(&self) -> Result<AccountFunds> {
            Err(AdvisorError::Broker("session expired".to_string()))
        }

        async fn place_order(&self, _ticket: OrderTicket) -> Result<OrderConfirmation> {
            Err(AdvisorError::Broker("session expired".to_string()))
        }
    }

    fn test_settings(dir: &TempDir) -> Settings {
        Settings::builder()
            .anthropic_api_key("test-key")
            .market_api_key("test-token")
            .thesis_log_path(dir.path().join("thesis.jsonl"))
            .decision_log_path(dir.path().join("decisions.jsonl"))
            .shortlist_cache_path(dir.path().join("shortlist.json"))
            .shortlist_target_size(5)
            .agent_max_iterations(4)
            .build()
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_blocks(vec![ContentBlock::Text {
                text: text.to_string(),
            }]),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 0,
                output_tokens: 0,
            },
        }
    }

    fn tool_use_response(id: &str, name: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: json!({}),
            }]),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage {
                input_tokens: 0,
                output_tokens: 0,
            },
        }
    }

    fn buy_thesis(ticker: &str) -> Thesis {
        Thesis {
            ticker: ticker.to_string(),
            recommendation: Recommendation::Buy,
            conviction: 0.8,
            quantitative_score: 0.8,
            qualitative_score: 0.5,
            stability_score: 0.9,
            rationale: String::new(),
            risks: Vec::new(),
            catalysts: Vec::new(),
            insights: Vec::new(),
            suggested_action: None,
        }
    }

    #[tokio::test]
    async fn test_agent_run_round_trip() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_use_response("tu_1", "positions")),
            Ok(text_response("Portfolio reviewed; no changes recommended.")),
        ]));
        let orchestrator = AgentOrchestrator::new(
            provider,
            Arc::new(MockBroker::new()),
            Arc::new(StubMarket {
                entries: Vec::new(),
            }),
            test_settings(&dir),
        );

        let report = orchestrator.run().await.unwrap();
        assert!(report.is_done());
        assert_eq!(report.iterations, 2);
        assert_eq!(report.tool_calls.len(), 1);
        assert_eq!(report.tool_calls[0].tool, "positions");
        assert!(report.tool_calls[0].success);
        assert_eq!(report.content, "Portfolio reviewed; no changes recommended.");
    }

    #[tokio::test]
    async fn test_daily_screening_places_approved_orders() {
        let dir = TempDir::new().unwrap();
        let settings = test_settings(&dir);
        let broker = Arc::new(MockBroker::new());
        let market = Arc::new(StubMarket {
            entries: vec![
                json!({"code": "DIV1", "close": 120.0, "avg_volume": 5_000_000.0, "market_cap": 50_000.0}),
                json!({"code": "DIV2", "close": 80.0, "avg_volume": 4_000_000.0, "market_cap": 40_000.0}),
            ],
        });
        let sink = Arc::new(CaptureSink {
            deliveries: Mutex::new(Vec::new()),
        });
        let screening = DailyScreening::new(
            broker.clone(),
            market,
            Arc::new(StubSummarizer),
            sink.clone(),
            settings.clone(),
        );

        let mut inputs = VecDeque::from(vec!["y".to_string(), "n".to_string()]);
        let mut gate = ApprovalGate::with_input(
            AuditLog::new(&settings.decision_log_path),
            Box::new(move |_| inputs.pop_front().unwrap_or_else(|| "s".to_string())),
        );

        let theses = screening.run(&mut gate).await.unwrap();
        assert_eq!(theses.len(), 2);
        assert!(
            theses
                .iter()
                .all(|t| t.recommendation == Recommendation::Buy)
        );

        // The approved DIV1 buy lands in the mock portfolio; rejected DIV2 does not
        let positions = broker.list_positions().await.unwrap();
        assert!(positions.iter().any(|p| p.ticker == "DIV1"));
        assert!(!positions.iter().any(|p| p.ticker == "DIV2"));

        let decisions = AuditLog::new(&settings.decision_log_path).records();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0]["ticker"], "DIV1");
        assert_eq!(decisions[0]["decision"], "approved");
        assert_eq!(decisions[1]["decision"], "rejected");

        let thesis_records = AuditLog::new(&settings.thesis_log_path).records();
        assert_eq!(thesis_records.len(), 2);

        let deliveries = sink.deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "AI Investor Daily Summary");
        assert!(deliveries[0].1.contains("DIV1"));
        assert!(deliveries[0].1.contains("BUY RECOMMENDATIONS"));
    }

    #[tokio::test]
    async fn test_screening_tolerates_broker_outage() {
        let dir = TempDir::new().unwrap();
        let settings = test_settings(&dir);
        let screening = DailyScreening::new(
            Arc::new(FailingBroker),
            Arc::new(StubMarket {
                entries: vec![json!({"code": "DIV1", "close": 120.0})],
            }),
            Arc::new(StubSummarizer),
            Arc::new(CaptureSink {
                deliveries: Mutex::new(Vec::new()),
            }),
            settings.clone(),
        );

        let mut gate = ApprovalGate::with_input(
            AuditLog::new(&settings.decision_log_path),
            Box::new(|_| "n".to_string()),
        );

        let theses = screening.run(&mut gate).await.unwrap();
        assert_eq!(theses.len(), 1);
        assert_eq!(theses[0].recommendation, Recommendation::Buy);
    }

    #[tokio::test]
    async fn test_screening_skips_entries_without_symbols() {
        let dir = TempDir::new().unwrap();
        let settings = test_settings(&dir);
        let screening = DailyScreening::new(
            Arc::new(MockBroker::new()),
            Arc::new(StubMarket {
                entries: vec![
                    json!({"market_cap": 99_000.0}),
                    json!({"code": "DIV1", "close": 120.0}),
                ],
            }),
            Arc::new(StubSummarizer),
            Arc::new(CaptureSink {
                deliveries: Mutex::new(Vec::new()),
            }),
            settings.clone(),
        );

        let mut gate = ApprovalGate::with_input(
            AuditLog::new(&settings.decision_log_path),
            Box::new(|_| "s".to_string()),
        );

        let theses = screening.run(&mut gate).await.unwrap();
        assert_eq!(theses.len(), 1);
        assert_eq!(theses[0].ticker, "DIV1");
    }

    #[test]
    fn test_proposed_order_sizing() {
        let thesis = buy_thesis("DIV1");

        let order = proposed_order(&thesis, &json!({"close": 120.0})).unwrap();
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.quantity, 8);
        assert_eq!(order.price, 120.0);

        // previousClose fallback and the one-share floor for expensive names
        let order = proposed_order(&thesis, &json!({"previousClose": 2500.0})).unwrap();
        assert_eq!(order.quantity, 1);
    }

    #[test]
    fn test_proposed_order_requires_usable_price() {
        let thesis = buy_thesis("DIV1");
        assert!(proposed_order(&thesis, &json!({"close": 0.0})).is_none());
        assert!(proposed_order(&thesis, &json!({"close": "n/a"})).is_none());
        assert!(proposed_order(&thesis, &json!({})).is_none());
    }

    #[test]
    fn test_proposed_order_only_for_tradeable_recommendations() {
        let mut thesis = buy_thesis("DIV1");
        thesis.recommendation = Recommendation::Hold;
        assert!(proposed_order(&thesis, &json!({"close": 120.0})).is_none());

        thesis.recommendation = Recommendation::Exit;
        let order = proposed_order(&thesis, &json!({"close": 120.0})).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
    }
}
