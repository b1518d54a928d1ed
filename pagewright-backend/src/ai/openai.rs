use crate::ai::streaming::{create_default_stream_channel, StreamEvent, StreamReceiver, StreamSender};
use crate::ai::{AiError, Message};
use crate::config::GenerationConfig;
use futures_util::StreamExt;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat completions client (streaming only)
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

/// One decoded server-sent-events line
#[derive(Debug, PartialEq)]
enum SseFrame {
    /// Comments, blank keep-alives, non-data fields, chunks without choices
    Skip,
    /// `data: [DONE]`
    Done,
    Delta {
        content: Option<String>,
        finish_reason: Option<String>,
    },
    Malformed(String),
}

impl OpenAIClient {
    pub fn new(api_key: &str, endpoint: Option<&str>) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // Self-hosted compatible endpoints may run without a key
        if !api_key.is_empty() {
            let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key header: {}", e))?;
            auth_headers.insert(header::AUTHORIZATION, bearer);
        }

        Ok(Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the history and hand back a receiver of token events.
    ///
    /// The body is pumped by a background task; dropping the receiver makes
    /// that task stop at its next send.
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        generation: &GenerationConfig,
    ) -> Result<StreamReceiver, AiError> {
        let request = ChatCompletionRequest {
            model: &generation.model,
            messages,
            temperature: generation.temperature,
            stream: true,
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "[STREAM] Sending request to {}: {}",
                self.endpoint,
                serde_json::to_string_pretty(&request).unwrap_or_default()
            );
        }

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::new(format!("OpenAI API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(error_response) => error_response.error.message,
                Err(_) => error_text,
            };
            return Err(AiError::with_status(
                format!("OpenAI API error: {}", message),
                status.as_u16(),
            ));
        }

        let (tx, rx) = create_default_stream_channel();
        tokio::spawn(pump_event_stream(response, tx));
        Ok(rx)
    }
}

/// Read the SSE body and forward each token in order
async fn pump_event_stream(response: reqwest::Response, tx: StreamSender) {
    let mut body = response.bytes_stream();
    let mut decoder = SseLineDecoder::default();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[STREAM] Body read failed mid-stream: {}", e);
                let _ = tx
                    .send(StreamEvent::Error {
                        message: format!("Stream interrupted: {}", e),
                    })
                    .await;
                return;
            }
        };

        for line in decoder.push(&bytes) {
            if !forward_frame(&tx, parse_sse_line(&line)).await {
                return;
            }
        }
    }

    if let Some(line) = decoder.finish() {
        if !forward_frame(&tx, parse_sse_line(&line)).await {
            return;
        }
    }

    // Body ended without [DONE]; the sequence is still exhausted
    let _ = tx.send(StreamEvent::Done { stop_reason: None }).await;
}

/// Returns false once the stream is over (finished, or the consumer left)
async fn forward_frame(tx: &StreamSender, frame: SseFrame) -> bool {
    match frame {
        SseFrame::Skip => true,
        SseFrame::Malformed(error) => {
            log::warn!("[STREAM] Skipping malformed chunk: {}", error);
            true
        }
        SseFrame::Done => {
            let _ = tx.send(StreamEvent::Done { stop_reason: None }).await;
            false
        }
        SseFrame::Delta {
            content,
            finish_reason,
        } => {
            if let Some(content) = content {
                if tx.send(StreamEvent::ContentDelta { content }).await.is_err() {
                    log::debug!("[STREAM] Consumer dropped, abandoning stream");
                    return false;
                }
            }
            if finish_reason.is_some() {
                let _ = tx
                    .send(StreamEvent::Done {
                        stop_reason: finish_reason,
                    })
                    .await;
                return false;
            }
            true
        }
    }
}

fn parse_sse_line(line: &str) -> SseFrame {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseFrame::Skip;
    }
    let Some(payload) = line.strip_prefix("data:") else {
        return SseFrame::Skip;
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseFrame::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.choices.into_iter().next() {
            Some(choice) => SseFrame::Delta {
                content: choice.delta.content.filter(|c| !c.is_empty()),
                finish_reason: choice.finish_reason,
            },
            None => SseFrame::Skip,
        },
        Err(e) => SseFrame::Malformed(e.to_string()),
    }
}

/// Splits a byte stream into lines. Bytes are held until a newline arrives,
/// so a chunk boundary inside a UTF-8 sequence never corrupts a token.
#[derive(Debug, Default)]
struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&raw).trim_end().to_string())
    }
}
