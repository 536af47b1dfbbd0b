//! Closed tool registry exposed to the agent loop
//!
//! Every operation the model may invoke is one variant of [`ToolRequest`].
//! Unknown names and malformed arguments are rejected at the boundary and
//! fed back to the model as errors rather than crashing the run.

use crate::audit::AuditLog;
use crate::broker::Broker;
use crate::engine::DecisionEngine;
use crate::error::Result;
use crate::market::MarketData;
use crate::model::{OrderSide, OrderTicket};
use crate::shortlist::ShortlistPipeline;
use advisor_agent::{DispatchError, ToolDispatcher};
use advisor_llm::ToolDefinition;
use advisor_llm::tools::schema;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// One decoded tool call
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Positions,
    Funds,
    Fundamentals(FundamentalsArgs),
    News(NewsArgs),
    EvaluateDecision(EvaluateArgs),
    PlaceOrder(OrderArgs),
    Shortlist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundamentalsArgs {
    pub ticker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsArgs {
    pub ticker: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

fn default_lookback_days() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateArgs {
    pub ticker: String,
    pub fundamentals: Value,
    pub news: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderArgs {
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: f64,
}

impl ToolRequest {
    /// Decode a named tool call into a typed request
    pub fn parse(name: &str, input: &Value) -> std::result::Result<Self, DispatchError> {
        match name {
            "positions" => Ok(Self::Positions),
            "funds" => Ok(Self::Funds),
            "fundamentals" => decode(name, input).map(Self::Fundamentals),
            "news" => decode(name, input).map(Self::News),
            "evaluate_decision" => decode(name, input).map(Self::EvaluateDecision),
            "place_order" => decode(name, input).map(Self::PlaceOrder),
            "shortlist" => Ok(Self::Shortlist),
            other => Err(DispatchError::UnknownTool(other.to_string())),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    tool: &str,
    input: &Value,
) -> std::result::Result<T, DispatchError> {
    serde_json::from_value(input.clone()).map_err(|e| DispatchError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Schemas for the seven tools, in the order the model sees them
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "positions",
            "Fetch current stock positions held in the brokerage account. \
             Returns a list of positions with ticker, quantity, average price, \
             current price, market value, and unrealized P&L.",
            schema::object(json!({}), vec![]),
        ),
        ToolDefinition::new(
            "funds",
            "Fetch available cash and account value from the brokerage account. \
             Returns currency, available cash, total account value, and invested value.",
            schema::object(json!({}), vec![]),
        ),
        ToolDefinition::new(
            "fundamentals",
            "Fetch fundamental data for a stock from the market data provider. \
             Returns financial metrics including dividend yield, P/E ratio, \
             profit margins, ROA, ROE, debt ratios, and more.",
            schema::object(
                json!({
                    "ticker": schema::string("Stock ticker symbol (e.g., 'AAPL', 'MSFT')"),
                }),
                vec!["ticker"],
            ),
        ),
        ToolDefinition::new(
            "news",
            "Fetch recent news articles for a stock from the market data provider. \
             Returns news headlines, summaries, sentiment, and links from the past 30 days.",
            schema::object(
                json!({
                    "ticker": schema::string("Stock ticker symbol (e.g., 'AAPL', 'MSFT')"),
                    "lookback_days": schema::integer_default(
                        "Number of days to look back for news (default: 30)",
                        30,
                    ),
                }),
                vec!["ticker"],
            ),
        ),
        ToolDefinition::new(
            "evaluate_decision",
            "Analyze a stock and determine investment decision (BUY/HOLD/TRIM/EXIT). \
             This tool uses quantitative metrics, qualitative news analysis, and stability \
             indicators to generate a comprehensive investment thesis with conviction score, \
             rationale, risks, and catalysts. Takes into account current positions and \
             holding periods for long-term investment strategy.",
            schema::object(
                json!({
                    "ticker": schema::string("Stock ticker symbol to evaluate"),
                    "fundamentals": schema::object_property(
                        "Fundamental data object from the fundamentals tool",
                    ),
                    "news": schema::array(
                        "News articles array from the news tool",
                        json!({"type": "object"}),
                    ),
                }),
                vec!["ticker", "fundamentals", "news"],
            ),
        ),
        ToolDefinition::new(
            "place_order",
            "Execute a stock trade (buy/sell) through the brokerage account. \
             THIS IS MOCKED FOR TESTING. Simulates placing an order and updates mock \
             positions. Returns order details including order ID, ticker, side, \
             quantity, price, and status.",
            schema::object(
                json!({
                    "ticker": schema::string("Stock ticker symbol to trade"),
                    "side": schema::string_enum("Trade side: 'buy' or 'sell'", &["buy", "sell"]),
                    "quantity": schema::integer_min("Number of shares to trade", 1),
                    "price": schema::number_min("Price per share", 0.0),
                }),
                vec!["ticker", "side", "quantity", "price"],
            ),
        ),
        ToolDefinition::new(
            "shortlist",
            "Get the current shortlist of candidate stocks to analyze. \
             Returns dividend-paying large cap stocks that meet screening criteria.",
            schema::object(json!({}), vec![]),
        ),
    ]
}

/// Collaborator bundle behind the tool registry
pub struct InvestmentToolbox {
    broker: Arc<dyn Broker>,
    market: Arc<dyn MarketData>,
    engine: Arc<DecisionEngine>,
    shortlist: Arc<ShortlistPipeline>,
    thesis_log: AuditLog,
}

impl InvestmentToolbox {
    pub fn new(
        broker: Arc<dyn Broker>,
        market: Arc<dyn MarketData>,
        engine: Arc<DecisionEngine>,
        shortlist: Arc<ShortlistPipeline>,
        thesis_log: AuditLog,
    ) -> Self {
        Self {
            broker,
            market,
            engine,
            shortlist,
            thesis_log,
        }
    }

    async fn execute(&self, request: ToolRequest) -> Result<Value> {
        match request {
            ToolRequest::Positions => {
                Ok(serde_json::to_value(self.broker.list_positions().await?)?)
            }
            ToolRequest::Funds => Ok(serde_json::to_value(
                self.broker.get_available_funds().await?,
            )?),
            ToolRequest::Fundamentals(args) => self.market.get_fundamentals(&args.ticker).await,
            ToolRequest::News(args) => Ok(Value::Array(
                self.market
                    .get_news(&args.ticker, args.lookback_days)
                    .await?,
            )),
            ToolRequest::EvaluateDecision(args) => {
                let thesis = self
                    .engine
                    .evaluate(&args.ticker, &args.fundamentals, &args.news)
                    .await?;
                let value = serde_json::to_value(&thesis)?;
                self.thesis_log.append(&value)?;
                Ok(value)
            }
            ToolRequest::PlaceOrder(args) => {
                let ticket = OrderTicket {
                    ticker: args.ticker,
                    side: args.side,
                    quantity: args.quantity,
                    price: args.price,
                };
                Ok(serde_json::to_value(self.broker.place_order(ticket).await?)?)
            }
            ToolRequest::Shortlist => Ok(serde_json::to_value(
                self.shortlist.ensure_shortlist(self.market.as_ref()).await?,
            )?),
        }
    }
}

#[async_trait]
impl ToolDispatcher for InvestmentToolbox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    async fn dispatch(&self, name: &str, input: &Value) -> std::result::Result<Value, DispatchError> {
        let request = ToolRequest::parse(name, input)?;
        self.execute(request)
            .await
            .map_err(|e| DispatchError::ExecutionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccountFunds, OrderConfirmation, Position};
    use crate::summarizer::{InsightPayload, NewsSummarizer};
    use chrono::Utc;
    use tempfile::TempDir;

    struct StubBroker;

    #[async_trait]
    impl Broker for StubBroker {
        async fn authenticate(&self) -> Result<()> {
            Ok(())
        }

        async fn list_positions(&self) -> Result<Vec<Position>> {
            Ok(vec![Position {
                ticker: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
                quantity: 10,
                average_price: 150.0,
                current_price: 170.0,
                market_value: 1700.0,
                unrealized_pnl: 200.0,
                unrealized_pnl_percent: 13.33,
            }])
        }

        async fn get_available_funds(&self) -> Result<AccountFunds> {
            Ok(AccountFunds {
                currency: "USD".to_string(),
                available_cash: 500.0,
                total_value: 2200.0,
                invested_value: 1700.0,
            })
        }

        async fn place_order(&self, ticket: OrderTicket) -> Result<OrderConfirmation> {
            let total_value = ticket.total_value();
            Ok(OrderConfirmation {
                order_id: "TEST-1".to_string(),
                ticker: ticket.ticker,
                side: ticket.side,
                quantity: ticket.quantity,
                price: ticket.price,
                total_value,
                status: "simulated".to_string(),
                timestamp: Utc::now(),
            })
        }
    }

    struct StubMarket;

    #[async_trait]
    impl MarketData for StubMarket {
        async fn get_fundamentals(&self, _ticker: &str) -> Result<Value> {
            Ok(json!({"DividendYield": 3.0}))
        }

        async fn get_news(&self, _ticker: &str, lookback_days: i64) -> Result<Vec<Value>> {
            Ok(vec![json!({"title": "story", "lookback": lookback_days})])
        }

        async fn screen_dividend_large_caps(&self, _exchange: &str) -> Result<Vec<Value>> {
            Ok(vec![json!({"code": "KO"})])
        }
    }

    struct SilentSummarizer;

    #[async_trait]
    impl NewsSummarizer for SilentSummarizer {
        async fn summarize(
            &self,
            _ticker: &str,
            _articles: &[Value],
        ) -> Result<Vec<InsightPayload>> {
            Ok(Vec::new())
        }
    }

    fn toolbox(dir: &TempDir) -> (InvestmentToolbox, AuditLog) {
        let log = AuditLog::new(dir.path().join("thesis_log.jsonl"));
        let engine = Arc::new(DecisionEngine::new(
            Arc::new(SilentSummarizer),
            vec![],
            log.clone(),
        ));
        let shortlist = Arc::new(ShortlistPipeline::new(
            dir.path().join("shortlist.json"),
            5,
            7,
            "US",
        ));
        let toolbox = InvestmentToolbox::new(
            Arc::new(StubBroker),
            Arc::new(StubMarket),
            engine,
            shortlist,
            log.clone(),
        );
        (toolbox, log)
    }

    #[test]
    fn test_registry_exposes_exactly_seven_tools() {
        let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "positions",
                "funds",
                "fundamentals",
                "news",
                "evaluate_decision",
                "place_order",
                "shortlist",
            ]
        );
    }

    #[test]
    fn test_unknown_tool_is_rejected() {
        let result = ToolRequest::parse("transfer_funds", &json!({}));
        assert!(matches!(result, Err(DispatchError::UnknownTool(name)) if name == "transfer_funds"));
    }

    #[test]
    fn test_invalid_arguments_name_the_tool() {
        let result = ToolRequest::parse("place_order", &json!({"ticker": "AAPL"}));
        match result {
            Err(DispatchError::InvalidArguments { tool, .. }) => assert_eq!(tool, "place_order"),
            other => panic!("expected InvalidArguments, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_order_side_is_rejected() {
        let input = json!({"ticker": "AAPL", "side": "short", "quantity": 1, "price": 10.0});
        assert!(matches!(
            ToolRequest::parse("place_order", &input),
            Err(DispatchError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_news_lookback_defaults_to_thirty_days() {
        let request = ToolRequest::parse("news", &json!({"ticker": "AAPL"})).unwrap();
        match request {
            ToolRequest::News(args) => {
                assert_eq!(args.ticker, "AAPL");
                assert_eq!(args.lookback_days, 30);
            }
            other => panic!("expected News, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_positions_dispatch_returns_serialized_positions() {
        let dir = TempDir::new().unwrap();
        let (toolbox, _log) = toolbox(&dir);
        let value = toolbox.dispatch("positions", &json!({})).await.unwrap();
        assert_eq!(value[0]["ticker"], "AAPL");
        assert_eq!(value[0]["quantity"], 10);
    }

    #[tokio::test]
    async fn test_evaluate_decision_appends_one_audit_record() {
        let dir = TempDir::new().unwrap();
        let (toolbox, log) = toolbox(&dir);
        let input = json!({"ticker": "KO", "fundamentals": {}, "news": []});
        let value = toolbox.dispatch("evaluate_decision", &input).await.unwrap();
        assert_eq!(value["ticker"], "KO");
        assert_eq!(value["recommendation"], "hold");

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["ticker"], "KO");
        assert!(records[0]["ts"].is_string());
    }

    #[tokio::test]
    async fn test_evaluate_decision_requires_news() {
        let dir = TempDir::new().unwrap();
        let (toolbox, _log) = toolbox(&dir);
        let input = json!({"ticker": "KO", "fundamentals": {}});
        let result = toolbox.dispatch("evaluate_decision", &input).await;
        assert!(matches!(
            result,
            Err(DispatchError::InvalidArguments { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_ticker_surfaces_as_execution_failure() {
        let dir = TempDir::new().unwrap();
        let (toolbox, log) = toolbox(&dir);
        let input = json!({"ticker": "", "fundamentals": {}, "news": []});
        let result = toolbox.dispatch("evaluate_decision", &input).await;
        match result {
            Err(DispatchError::ExecutionFailed(message)) => {
                assert!(message.contains("Invalid input"));
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
        assert!(log.records().is_empty());
    }
}
