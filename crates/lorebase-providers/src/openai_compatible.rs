//! Streaming chat-completions client for OpenAI-compatible endpoints.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;

use lorebase_core::error::{LorebaseError, Result};
use lorebase_core::traits::{ChatProvider, TokenStream};
use lorebase_core::types::Message;

/// Chat client that streams completions over server-sent events.
///
/// Fragments are yielded as soon as their line arrives off the wire; nothing
/// is buffered beyond the partial line at the end of the last read. Dropping
/// the returned stream drops the HTTP response, which aborts the request.
pub struct OpenAiCompatibleChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleChat {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleChat {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn stream_chat(
        &self,
        system: &str,
        history: &[Message],
        user_message: &str,
    ) -> Result<TokenStream> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_message));

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };
        tracing::debug!(model = %self.model, history = history.len(), "starting streamed completion");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LorebaseError::Http(format!("chat request to {} failed: {e}", self.endpoint))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LorebaseError::Provider(format!(
                "chat API error {status}: {body}"
            )));
        }

        let body: BoxStream<'static, std::result::Result<Vec<u8>, reqwest::Error>> = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        let state = SseState {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::try_unfold(state, |mut st| async move {
            loop {
                if let Some(token) = st.pending.pop_front() {
                    return Ok(Some((token, st)));
                }
                if st.done {
                    return Ok(None);
                }
                match st.body.next().await {
                    Some(Ok(bytes)) => {
                        st.buffer.extend_from_slice(&bytes);
                        // Newlines are single bytes, so draining at them never
                        // splits a UTF-8 sequence
                        while let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&line);
                            match parse_sse_line(line.trim_end()) {
                                SseEvent::Token(token) => st.pending.push_back(token),
                                SseEvent::Done => st.done = true,
                                SseEvent::Ignore => {}
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return Err(LorebaseError::Provider(format!(
                            "chat stream failed mid-read: {e}"
                        )));
                    }
                    None => return Ok(None),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

enum SseEvent {
    Token(String),
    Done,
    Ignore,
}

struct SseState {
    body: BoxStream<'static, std::result::Result<Vec<u8>, reqwest::Error>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

/// Interpret one server-sent-events line from a chat completion stream.
fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.strip_prefix("data: ") else {
        return SseEvent::Ignore;
    };
    if data.trim() == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(json) => json["choices"][0]["delta"]["content"]
            .as_str()
            .map(|content| SseEvent::Token(content.to_string()))
            .unwrap_or(SseEvent::Ignore),
        Err(_) => SseEvent::Ignore,
    }
}
