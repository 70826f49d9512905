//! Mock Completion Provider for testing.
//!
//! Scripted implementation of the CompletionProvider port, so dialogue tests
//! run without calling a real model.
//!
//! # Features
//!
//! - Scripted responses consumed in order
//! - Simulated delays for timeout testing
//! - Error injection for resilience testing
//! - Prompt tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockCompletionProvider::new()
//!     .with_response(r#"{"next_state_suggestion": "GATHER_LOCATION"}"#)
//!     .with_error(CompletionError::Unavailable("down".into()));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{CompletionError, CompletionProvider};

/// Returned once the script runs out: a hint that suggests nothing.
pub const EMPTY_HINT: &str = "{}";

/// Mock completion provider for testing.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionProvider {
    /// Scripted outcomes (consumed in order).
    responses: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,
    /// Simulated latency per request.
    delay: Duration,
    /// Prompts received, for verification.
    prompts: Arc<Mutex<Vec<String>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockCompletionProvider {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw completion to the script.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.push_response(content);
        self
    }

    /// Adds an error to the script.
    pub fn with_error(self, error: CompletionError) -> Self {
        self.push_error(error);
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Appends a raw completion to a shared mock after construction.
    pub fn push_response(&self, content: impl Into<String>) {
        locked(&self.responses).push_back(Ok(content.into()));
    }

    /// Appends an error to a shared mock after construction.
    pub fn push_error(&self, error: CompletionError) {
        locked(&self.responses).push_back(Err(error));
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        locked(&self.prompts).len()
    }

    /// Returns every prompt received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }

    /// Number of scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        locked(&self.responses).len()
    }

    fn next_response(&self) -> Result<String, CompletionError> {
        locked(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(EMPTY_HINT.to_string()))
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        locked(&self.prompts).push(prompt.to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        self.next_response()
    }
}
