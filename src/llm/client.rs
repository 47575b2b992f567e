use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{
    ErrorWrapper, GenerateContentRequest, GenerateContentResponse, WireContent,
    WireGenerationConfig,
};
use super::{within, GenerateRequest, TextGenerator, TextStream};
use crate::config::{GeminiConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig, request_config: RequestConfig) -> LlmResult<Self> {
        // No client-wide timeout: it would also cap the length of streamed replies.
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    /// Execute a single one-shot request (internal)
    async fn execute_request(&self, url: &str, body: &GenerateContentRequest) -> LlmResult<String> {
        debug!(
            model = %self.model,
            contents = body.contents.len(),
            "Calling Gemini generateContent"
        );

        let response = self
            .client
            .post(url)
            .timeout(Duration::from_millis(self.request_config.timeout_ms))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = check_status(response).await?;

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if let Some(err) = parsed.error {
            return Err(LlmError::Api {
                status: err.code.unwrap_or(500),
                message: err.describe(),
            });
        }

        parsed.text().ok_or_else(|| LlmError::InvalidResponse {
            message: "Gemini returned no text in the response candidates".to_string(),
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            LlmError::Http(e)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<String> {
        let url = self.endpoint("generateContent");
        let body = build_body(&request);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %self.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Gemini request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &body).await {
                Ok(text) => {
                    info!(
                        model = %self.model,
                        latency_ms = start.elapsed().as_millis(),
                        chars = text.len(),
                        "Gemini call succeeded"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    error!(
                        model = %self.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Gemini call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(LlmError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    async fn generate_stream(&self, request: GenerateRequest) -> LlmResult<TextStream> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let body = build_body(&request);

        debug!(
            model = %self.model,
            contents = body.contents.len(),
            "Opening Gemini stream"
        );

        // Bounded until the headers arrive; the body may stream for longer.
        let opening = async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;
            check_status(response).await
        };
        let response = within(
            Duration::from_millis(self.request_config.timeout_ms),
            opening,
        )
        .await?;
        info!(model = %self.model, "Gemini stream opened");

        Ok(sse_text_stream(response.bytes_stream()).boxed())
    }
}

/// Translate the crate-level request into the Gemini wire body
pub(crate) fn build_body(request: &GenerateRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: request.contents.iter().map(WireContent::from_content).collect(),
        system_instruction: request
            .system_instruction
            .as_deref()
            .map(WireContent::system),
        generation_config: WireGenerationConfig {
            max_output_tokens: request.options.max_output_tokens,
            temperature: request.options.temperature,
            response_mime_type: request
                .options
                .json_output
                .then(|| "application/json".to_string()),
        },
    }
}

async fn check_status(response: Response) -> LlmResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| wrapper.error.describe())
        .unwrap_or(body);

    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

struct SseState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<LlmResult<String>>,
    done: bool,
}

/// Turn a server-sent-event byte stream into the text fragments it carries.
///
/// Lines are split on raw bytes so multi-byte characters cut across network
/// chunks are decoded intact.
pub(crate) fn sse_text_stream<S, B, E>(bytes: S) -> impl Stream<Item = LlmResult<String>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<LlmError>,
{
    let state = SseState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                        if let Some(item) = parse_sse_line(&String::from_utf8_lossy(&line)) {
                            st.pending.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.pending.push_back(Err(e.into()));
                }
                None => {
                    st.done = true;
                    let rest = std::mem::take(&mut st.buffer);
                    if let Some(item) = parse_sse_line(&String::from_utf8_lossy(&rest)) {
                        st.pending.push_back(item);
                    }
                }
            }
        }
    })
}

/// Parse one SSE line; `None` for comments, blank lines, and textless events
fn parse_sse_line(line: &str) -> Option<LlmResult<String>> {
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?;
    let data = data.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(event) => {
            if let Some(err) = event.error {
                return Some(Err(LlmError::Api {
                    status: err.code.unwrap_or(500),
                    message: err.describe(),
                }));
            }
            event.text().map(Ok)
        }
        Err(e) => {
            warn!(error = %e, "Malformed stream event from Gemini");
            Some(Err(LlmError::InvalidResponse {
                message: format!("Malformed stream event: {}", e),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Content, GenerationOptions};

    fn event(text: &str) -> String {
        format!(
            "data: {}\r\n\r\n",
            serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
        )
    }

    async fn collect(chunks: Vec<Vec<u8>>) -> Vec<LlmResult<String>> {
        let source = futures::stream::iter(
            chunks
                .into_iter()
                .map(Ok::<Vec<u8>, LlmError>)
                .collect::<Vec<_>>(),
        );
        sse_text_stream(source).collect().await
    }

    #[test]
    fn test_client_creation() {
        let config = GeminiConfig {
            api_key: "test_key".to_string(),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            model: "gemini-test".to_string(),
        };

        let client = GeminiClient::new(&config, RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://generativelanguage.googleapis.com");
        assert_eq!(
            client.endpoint("generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_build_body_sets_json_mime_type() {
        let request = GenerateRequest {
            contents: vec![Content::user("a"), Content::model("b"), Content::user("c")],
            system_instruction: Some("sys".to_string()),
            options: GenerationOptions {
                max_output_tokens: Some(10),
                temperature: Some(0.5),
                json_output: true,
            },
        };
        let body = build_body(&request);
        assert_eq!(body.contents.len(), 3);
        assert_eq!(body.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            body.generation_config.response_mime_type.as_deref(),
            Some("application/json")
        );

        let plain = build_body(&GenerateRequest::prompt("x", GenerationOptions::default()));
        assert!(plain.generation_config.response_mime_type.is_none());
        assert!(plain.system_instruction.is_none());
    }

    #[tokio::test]
    async fn test_sse_events_split_across_chunks() {
        let payload = format!("{}{}", event("Hel"), event("lo"));
        let (a, b) = payload.as_bytes().split_at(17);
        let items = collect(vec![a.to_vec(), b.to_vec()]).await;
        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn test_sse_multibyte_character_split() {
        let payload = event("caf\u{e9}");
        let bytes = payload.as_bytes();
        let cut = payload.find('\u{e9}').unwrap() + 1;
        let items = collect(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_sse_final_line_without_newline() {
        let payload = event("tail");
        let trimmed = payload.trim_end().to_string();
        let items = collect(vec![trimmed.into_bytes()]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "tail");
    }

    #[tokio::test]
    async fn test_sse_skips_comments_and_empty_events() {
        let payload = format!(
            ": keep-alive\n\ndata: {}\n\n{}data: [DONE]\n\n",
            serde_json::json!({"candidates": [{"finishReason": "STOP"}]}),
            event("x")
        );
        let items = collect(vec![payload.into_bytes()]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_sse_error_event() {
        let payload = format!(
            "{}data: {}\n\n",
            event("partial"),
            serde_json::json!({"error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}})
        );
        let items = collect(vec![payload.into_bytes()]).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(LlmError::Api { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_sse_transport_error_ends_stream() {
        let source = futures::stream::iter(vec![
            Ok(event("one").into_bytes()),
            Err(LlmError::Timeout { timeout_ms: 5 }),
            Ok(event("never").into_bytes()),
        ]);
        let items: Vec<_> = sse_text_stream(source).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "one");
        assert!(matches!(items[1], Err(LlmError::Timeout { .. })));
    }
}
