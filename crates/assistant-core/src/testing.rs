//! Scripted provider used by the router and orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider};

/// One request as the provider saw it
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub options: GenerationOptions,
}

/// Replays queued replies in order and records every request.
/// An exhausted script fails the call like an unreachable API would.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, completion: Completion) -> Self {
        self.replies.lock().unwrap().push_back(Ok(completion));
        self
    }

    pub fn reply_text(self, content: &str) -> Self {
        self.reply(Completion::text("scripted", content))
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(AgentError::ProviderUnavailable(message.into())));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            options: options.clone(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::ProviderUnavailable("script exhausted".into())))
    }
}
