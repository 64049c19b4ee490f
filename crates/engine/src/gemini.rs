use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{ChartSet, Error, Result, VisionClassifier};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Multimodal classifier backed by the Gemini `generateContent` endpoint.
pub struct GeminiClassifier {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: String, request_timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, model, BASE_URL, request_timeout)
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            model,
            base_url: base_url.into(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl VisionClassifier for GeminiClassifier {
    async fn classify(&self, prompt: &str, charts: &ChartSet) -> Result<String> {
        let request = build_request(prompt, charts);
        debug!(pair = %charts.symbol, model = %self.model, "Requesting classification");

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Classification(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Classification(format!("reading response failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Classification(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Classification(format!("undecodable response: {e}")))?;
        response_text(parsed)
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Prompt first, then one inline PNG per timeframe in analysis order.
fn build_request(prompt: &str, charts: &ChartSet) -> GenerateRequest {
    let mut parts = Vec::with_capacity(1 + charts.charts().len());
    parts.push(Part::Text {
        text: prompt.to_string(),
    });
    parts.extend(charts.charts().iter().map(|chart| Part::InlineData {
        inline_data: InlineData {
            mime_type: chart.mime_type.to_string(),
            data: STANDARD.encode(&chart.bytes),
        },
    }));
    GenerateRequest {
        contents: vec![Content { parts }],
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(resp: GenerateResponse) -> Result<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Classification("response contained no text".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{ChartImage, Timeframe};
    use serde_json::json;

    fn chart_set() -> ChartSet {
        let charts = Timeframe::ANALYSIS_ORDER.map(|timeframe| ChartImage {
            timeframe,
            mime_type: "image/png",
            bytes: timeframe.interval().as_bytes().to_vec(),
        });
        ChartSet::new("BTC/USDT".parse().unwrap(), Utc::now(), charts).unwrap()
    }

    #[test]
    fn request_carries_prompt_then_four_images_in_order() {
        let body = serde_json::to_value(build_request("analyze", &chart_set())).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], json!({"text": "analyze"}));

        let decoded: Vec<String> = parts[1..]
            .iter()
            .map(|p| {
                assert_eq!(p["inline_data"]["mime_type"], "image/png");
                let data = p["inline_data"]["data"].as_str().unwrap();
                String::from_utf8(STANDARD.decode(data).unwrap()).unwrap()
            })
            .collect();
        assert_eq!(decoded, vec!["4h", "1h", "15m", "5m"]);
    }

    #[test]
    fn text_parts_of_first_candidate_are_joined() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"decision\":"}, {"text": "\"WAIT\"}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response_text(resp).unwrap(), r#"{"decision":"WAIT"}"#);
    }

    #[test]
    fn empty_response_is_a_classification_error() {
        for body in [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]}),
        ] {
            let resp: GenerateResponse = serde_json::from_value(body).unwrap();
            assert!(matches!(response_text(resp), Err(Error::Classification(_))));
        }
    }

    #[test]
    fn endpoint_names_the_model() {
        let client = GeminiClassifier::with_base_url(
            "key".into(),
            "gemini-2.0-flash".into(),
            "http://localhost:9",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
