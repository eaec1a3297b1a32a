//! Scripted provider — deterministic completions for tests and local
//! development. Responses are popped in FIFO order.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;

use pl_domain::error::{Error, Result};

use crate::provider::{CompletionProvider, StructuredRequest};

#[derive(Default)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Value>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response.
    pub fn push(&self, response: Value) {
        self.queue.lock().push_back(response);
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, req: StructuredRequest) -> Result<Value> {
        self.queue.lock().pop_front().ok_or_else(|| {
            Error::Other(format!(
                "scripted provider has no response queued for {}",
                req.purpose
            ))
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pops_in_fifo_order() {
        let provider = ScriptedProvider::new();
        provider.push(json!({"n": 1}));
        provider.push(json!({"n": 2}));

        let req = |purpose| StructuredRequest {
            purpose,
            system_prompt: String::new(),
            user_input: String::new(),
            context: json!({}),
        };

        assert_eq!(provider.complete(req("a")).await.unwrap()["n"], 1);
        assert_eq!(provider.complete(req("b")).await.unwrap()["n"], 2);
        assert!(provider.complete(req("c")).await.is_err());
    }
}
