//! Shared test helpers

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use buildwise::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// Replays scripted replies in order and records every request
///
/// `None` entries (and an exhausted script) fail like a timed-out provider.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

#[allow(dead_code)]
impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Some(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// System prompt and messages of every request, concatenated per call
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                let mut text = r.system_prompt.clone();
                for m in &r.messages {
                    text.push('\n');
                    text.push_str(&m.content);
                }
                text
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(CompletionResponse::text(text)),
            _ => Err(LlmError::Timeout(Duration::from_secs(30))),
        }
    }
}

/// Answers every call with [`AUTO_REPLY`] after a fixed delay on the tokio clock
pub struct SlowLlm {
    delay: Duration,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl SlowLlm {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for SlowLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(CompletionResponse::text(AUTO_REPLY))
    }
}

/// A compliant auto-turn reply
#[allow(dead_code)]
pub const AUTO_REPLY: &str = r#"{"reply": "Context: You have been on this chapter for a while.\nInsight: The remaining answers decide the cost estimate.\nAction: Shall we go through the next question together?"}"#;
