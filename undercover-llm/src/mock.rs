//! Scripted chat capability
//!
//! Returns queued replies in order, falling back to an optional responder
//! once the queue is empty. Every call is recorded for inspection.

use crate::provider::{ChatCapability, ChatOptions};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use undercover_error::{Error, Result};

/// A recorded chat call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub model: String,
    pub system: String,
    pub user: String,
    pub options: ChatOptions,
}

type Responder = dyn Fn(&ChatCall) -> Result<String> + Send + Sync;

pub struct MockChat {
    name: String,
    script: Mutex<VecDeque<Result<String>>>,
    responder: Option<Box<Responder>>,
    latency: Duration,
    calls: Mutex<Vec<ChatCall>>,
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            responder: None,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Simulated latency before each reply
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a raw text reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        lock(&self.script).push_back(Ok(text.into()));
        self
    }

    /// Queue a JSON reply
    pub fn reply_json(self, value: serde_json::Value) -> Self {
        self.reply(value.to_string())
    }

    /// Queue a failure
    pub fn fail(self, err: Error) -> Self {
        lock(&self.script).push_back(Err(err));
        self
    }

    /// Answer every call past the end of the script
    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&ChatCall) -> Result<String> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatCapability for MockChat {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<String> {
        vec!["mock".to_string()]
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<String> {
        let call = ChatCall {
            model: model.to_string(),
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
            options: options.clone(),
        };
        lock(&self.calls).push(call.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = lock(&self.script).pop_front();
        match (scripted, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => responder(&call),
            (None, None) => Err(Error::unexpected("mock script exhausted")
                .with_operation("mock::complete")
                .with_context("provider", self.name.clone())),
        }
    }
}
