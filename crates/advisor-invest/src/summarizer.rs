//! News summarization via the model collaborator

use crate::error::Result;
use advisor_llm::{CompletionRequest, LLMProvider, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an equity analyst producing concise investment insights.";
const SUMMARY_MAX_TOKENS: usize = 800;

/// One insight parsed from the model's summary response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightPayload {
    #[serde(default)]
    pub headline: String,
    #[serde(default = "crate::model::neutral_sentiment")]
    pub sentiment: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub catalyst: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
}

/// Clusters raw news articles into narrative insights
#[async_trait]
pub trait NewsSummarizer: Send + Sync {
    async fn summarize(&self, ticker: &str, articles: &[Value]) -> Result<Vec<InsightPayload>>;
}

/// Summarizer backed by one model completion per ticker
pub struct LlmNewsSummarizer {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl LlmNewsSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl NewsSummarizer for LlmNewsSummarizer {
    async fn summarize(&self, ticker: &str, articles: &[Value]) -> Result<Vec<InsightPayload>> {
        let payload: Vec<Value> = articles
            .iter()
            .map(|article| {
                json!({
                    "headline": article.get("title").cloned().unwrap_or(Value::Null),
                    "summary": article.get("summary").cloned().unwrap_or(Value::Null),
                    "sentiment": article
                        .get("sentiment")
                        .cloned()
                        .unwrap_or_else(|| Value::String("neutral".to_string())),
                    "url": article.get("link").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        if payload.is_empty() {
            return Ok(Vec::new());
        }

        debug!(ticker, article_count = payload.len(), "Requesting news summary");
        let prompt = format!(
            "Summarise the following recent stories about {ticker} into 3 bullet points \
             with sentiment (positive/neutral/negative) and highlight implications for \
             long-term investors. Respond as JSON with fields headline, sentiment, \
             summary, catalyst, risk.\n\n{articles}",
            articles = serde_json::to_string_pretty(&json!({ "articles": payload }))?,
        );
        let request = CompletionRequest::builder(&self.model)
            .system(SUMMARY_SYSTEM_PROMPT)
            .max_tokens(SUMMARY_MAX_TOKENS)
            .add_message(Message::user(prompt))
            .build();
        let response = self.provider.complete(request).await?;

        let Some(text) = response.message.text() else {
            warn!(ticker, "Model summary response carried no text");
            return Ok(Vec::new());
        };
        Ok(parse_insights(ticker, text))
    }
}

/// Parse the model's response into insights
///
/// Accepts a bare JSON array or an object with an `insights` array, with or
/// without a surrounding code fence. Anything unparseable yields an empty
/// list with a warning; the evaluation still proceeds on a neutral prior.
fn parse_insights(ticker: &str, text: &str) -> Vec<InsightPayload> {
    let parsed: Value = match serde_json::from_str(strip_code_fence(text)) {
        Ok(value) => value,
        Err(e) => {
            warn!(ticker, error = %e, "Failed to parse model summary response");
            return Vec::new();
        }
    };
    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("insights") {
            Some(Value::Array(items)) => items,
            _ => {
                warn!(ticker, "Model summary response had no insights array");
                return Vec::new();
            }
        },
        _ => {
            warn!(ticker, "Model summary response was not an array or object");
            return Vec::new();
        }
    };
    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_llm::{
        CompletionResponse, ContentBlock, LLMError, StopReason, TokenUsage,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        reply: Mutex<Option<advisor_llm::Result<CompletionResponse>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn text(text: &str) -> Self {
            Self {
                reply: Mutex::new(Some(Ok(CompletionResponse {
                    message: Message::assistant_blocks(vec![ContentBlock::Text {
                        text: text.to_string(),
                    }]),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage {
                        input_tokens: 0,
                        output_tokens: 0,
                    },
                }))),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Mutex::new(Some(Err(LLMError::RequestFailed(
                    "connection reset".to_string(),
                )))),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> advisor_llm::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn article() -> Value {
        json!({
            "title": "Dividend raised",
            "summary": "Fifth consecutive annual increase",
            "link": "https://example.com/a",
        })
    }

    #[tokio::test]
    async fn test_no_articles_skips_the_model_call() {
        let provider = Arc::new(ScriptedProvider::text("[]"));
        let summarizer = LlmNewsSummarizer::new(provider.clone(), "test-model");
        let insights = summarizer.summarize("AAPL", &[]).await.unwrap();
        assert!(insights.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bare_array_response_parses() {
        let provider = Arc::new(ScriptedProvider::text(
            r#"[{"headline": "Dividend raised", "sentiment": "positive", "summary": "s", "catalyst": "buyback"}]"#,
        ));
        let summarizer = LlmNewsSummarizer::new(provider, "test-model");
        let insights = summarizer.summarize("AAPL", &[article()]).await.unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].sentiment, "positive");
        assert_eq!(insights[0].catalyst.as_deref(), Some("buyback"));
    }

    #[tokio::test]
    async fn test_wrapped_insights_object_parses() {
        let provider = Arc::new(ScriptedProvider::text(
            r#"{"insights": [{"headline": "h", "summary": "s"}, 42, {"headline": "h2", "sentiment": "negative", "summary": "s2"}]}"#,
        ));
        let summarizer = LlmNewsSummarizer::new(provider, "test-model");
        let insights = summarizer.summarize("AAPL", &[article()]).await.unwrap();
        // The bare 42 entry is skipped, defaults fill the rest
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].sentiment, "neutral");
        assert_eq!(insights[1].sentiment, "negative");
    }

    #[tokio::test]
    async fn test_fenced_response_parses() {
        let provider = Arc::new(ScriptedProvider::text(
            "```json\n[{\"headline\": \"h\", \"summary\": \"s\"}]\n```",
        ));
        let summarizer = LlmNewsSummarizer::new(provider, "test-model");
        let insights = summarizer.summarize("AAPL", &[article()]).await.unwrap();
        assert_eq!(insights.len(), 1);
    }

    #[tokio::test]
    async fn test_non_json_response_yields_empty() {
        let provider = Arc::new(ScriptedProvider::text(
            "I could not find anything notable.",
        ));
        let summarizer = LlmNewsSummarizer::new(provider, "test-model");
        let insights = summarizer.summarize("AAPL", &[article()]).await.unwrap();
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::failing());
        let summarizer = LlmNewsSummarizer::new(provider, "test-model");
        let result = summarizer.summarize("AAPL", &[article()]).await;
        assert!(result.is_err());
    }
}
