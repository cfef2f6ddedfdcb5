use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::common::{AiAnalysis, Message};
use crate::error::AiError;

const INVALID_RESPONSE: &str = "Invalid AI response";

/// Message shape accepted by the AI routes. The dashboard only fills
/// `text` and `sender`; the other fields are for the intent/priority routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recency_score: Option<f64>,
}

impl From<&Message> for AiMessage {
    fn from(message: &Message) -> Self {
        Self {
            text: message.text.clone(),
            sender: Some(message.sender.clone()),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    messages: &'a [AiMessage],
}

/// JSON client for the AI backend. Responses are opaque; every call degrades
/// to an `{"error": ...}` object instead of failing.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn health(&self) -> Value {
        match fetch_json(self.client.get(self.url("health"))).await {
            Ok(value) => value,
            Err(err) => {
                log::error!("AI health check failed: {err}");
                json!({ "status": "error", "error": err.to_string() })
            }
        }
    }

    pub async fn summarize(&self, messages: &[AiMessage]) -> Value {
        self.post("summarize", &MessagesBody { messages }, "Summarization")
            .await
    }

    pub async fn analyze_sentiment(&self, messages: &[AiMessage]) -> Value {
        self.post("sentiment", &MessagesBody { messages }, "Sentiment analysis")
            .await
    }

    pub async fn analyze_emotion(&self, messages: &[AiMessage]) -> Value {
        self.post("emotion", &MessagesBody { messages }, "Emotion analysis")
            .await
    }

    pub async fn analyze_intent(&self, message: &AiMessage) -> Value {
        self.post("analyze-intent", message, "Intent analysis").await
    }

    pub async fn prioritize(&self, messages: &[AiMessage]) -> Value {
        self.post("prioritize", &MessagesBody { messages }, "Prioritization")
            .await
    }

    pub async fn add_to_knowledge_base(&self, text: &str, metadata: Value) -> Value {
        let body = json!({ "text": text, "metadata": metadata });
        self.post("knowledge-base/add", &body, "KB add").await
    }

    pub async fn search_knowledge_base(&self, query: &str, top_k: usize) -> Value {
        let body = json!({ "query": query, "top_k": top_k });
        self.post("knowledge-base/search", &body, "KB search").await
    }

    pub async fn daily_report(&self, conversations: &[AiMessage], date: &str) -> Value {
        let body = json!({ "conversations": conversations, "date": date });
        self.post("daily-report", &body, "Daily report").await
    }

    /// Summarize, sentiment and emotion for one room, issued concurrently
    /// and merged.
    pub async fn analyze_room(&self, room_id: &str, messages: &[Message]) -> AiAnalysis {
        let batch: Vec<AiMessage> = messages.iter().map(AiMessage::from).collect();

        let (summary, sentiment, emotion) = tokio::join!(
            self.summarize(&batch),
            self.analyze_sentiment(&batch),
            self.analyze_emotion(&batch),
        );

        merge_analysis(room_id, batch.len(), &summary, &sentiment, &emotion)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B, operation: &str) -> Value {
        let request = self.client.post(self.url(path)).json(body);
        degrade(fetch_json(request).await, operation)
    }
}

async fn fetch_json(request: RequestBuilder) -> Result<Value, AiError> {
    let response = request.send().await?;
    let body = response.text().await?;
    parse_body(&body)
}

/// Bodies are taken as JSON whatever the status code.
pub fn parse_body(body: &str) -> Result<Value, AiError> {
    serde_json::from_str(body).map_err(|_| AiError::InvalidResponse)
}

fn degrade(result: Result<Value, AiError>, operation: &str) -> Value {
    match result {
        Ok(value) => value,
        Err(AiError::InvalidResponse) => {
            log::error!("{operation} returned a non-JSON body");
            json!({ "error": INVALID_RESPONSE })
        }
        Err(err) => {
            log::error!("{operation} failed: {err}");
            json!({ "error": format!("{operation} failed") })
        }
    }
}

fn merge_analysis(
    room_id: &str,
    message_count: usize,
    summary: &Value,
    sentiment: &Value,
    emotion: &Value,
) -> AiAnalysis {
    let field = |value: &Value, key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    let errors = [("summarize", summary), ("sentiment", sentiment), ("emotion", emotion)]
        .into_iter()
        .filter_map(|(endpoint, value)| field(value, "error").map(|err| format!("{endpoint}: {err}")))
        .collect();

    AiAnalysis {
        room_id: room_id.to_string(),
        summary: field(summary, "summary"),
        sentiment: field(sentiment, "sentiment"),
        emotion: field(emotion, "emotion"),
        message_count,
        errors,
    }
}
