//! LibreTranslate HTTP client.

use super::Translator;
use crate::error::UpstreamError;
use crate::language::LanguageDetector;
use async_trait::async_trait;
use profiles_common::TranslationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "libretranslate";

/// Client for a LibreTranslate-compatible server.
pub struct LibreTranslateClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LibreTranslateClient {
    /// Create a client for `base_url` with a per-request timeout.
    ///
    /// Fails when the HTTP client cannot be built with that timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport {
                service: SERVICE.into(),
                message: format!("building HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn from_config(config: &TranslationConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, UpstreamError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                service: SERVICE.into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(UpstreamError::Status {
                service: SERVICE.into(),
                status: status.as_u16(),
                message,
            });
        }

        response.json::<R>().await.map_err(|e| UpstreamError::Decode {
            service: SERVICE.into(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, UpstreamError> {
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response: TranslateResponse = self.post("translate", &request).await?;
        tracing::debug!(source, target, "Translated message");
        Ok(response.translated_text)
    }
}

#[async_trait]
impl LanguageDetector for LibreTranslateClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn detect(&self, text: &str) -> Result<String, UpstreamError> {
        let request = DetectRequest {
            q: text,
            api_key: self.api_key.as_deref(),
        };

        let candidates: Vec<DetectCandidate> = self.post("detect", &request).await?;
        let best = candidates
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .ok_or_else(|| UpstreamError::Detection("no language candidates returned".into()))?;

        tracing::debug!(
            language = %best.language,
            confidence = best.confidence,
            "Detected language"
        );
        Ok(best.language.to_lowercase())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct DetectCandidate {
    language: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> LibreTranslateClient {
        LibreTranslateClient::new(
            server.uri(),
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_translate_sends_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_json(json!({
                "q": "me gusta",
                "source": "es",
                "target": "en",
                "format": "text"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translatedText": "I like it"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translated = client(&server, None)
            .translate("me gusta", "es", "en")
            .await
            .unwrap();
        assert_eq!(translated, "I like it");
    }

    #[tokio::test]
    async fn test_translate_includes_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(json!({ "api_key": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translatedText": "hola"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translated = client(&server, Some("secret"))
            .translate("hello", "en", "es")
            .await
            .unwrap();
        assert_eq!(translated, "hola");
    }

    #[tokio::test]
    async fn test_translate_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "xx is not supported"
            })))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .translate("hello", "xx", "en")
            .await
            .unwrap_err();
        match err {
            UpstreamError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "xx is not supported");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_translate_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "?" })))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .translate("hello", "en", "es")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_detect_picks_most_confident() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "language": "pt", "confidence": 40.0 },
                { "language": "ES", "confidence": 92.5 }
            ])))
            .mount(&server)
            .await;

        let lang = client(&server, None).detect("me gusta").await.unwrap();
        assert_eq!(lang, "es");
    }

    #[tokio::test]
    async fn test_detect_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client(&server, None).detect("...").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Detection(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = LibreTranslateClient::new(
            "http://127.0.0.1:1",
            None,
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.translate("hello", "en", "es").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client =
            LibreTranslateClient::new("http://localhost:5000/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_configured_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"translatedText": "hola"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            LibreTranslateClient::new(server.uri(), None, Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let err = client.translate("hello", "en", "es").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Transport { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
