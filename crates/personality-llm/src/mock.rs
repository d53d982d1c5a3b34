//! Mock generation backend for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::backend::{GenerationBackend, GenerationRequest, GenerationResponse, LlmError};

/// What a matching rule does
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(LlmError),
}

/// A rule keyed on a substring of the system prompt
#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    reply: Option<Reply>,
    latency_ms: Option<u64>,
}

/// A mock backend that returns predefined responses.
///
/// Rules match on the system prompt, which is how a persona is recognised:
/// the first rule whose needle appears in the system prompt decides the reply
/// and the latency. Requests that match no rule cycle through the canned
/// responses.
#[derive(Debug)]
pub struct MockBackend {
    /// Name of this mock
    pub name: String,
    /// Canned responses (cycles through them)
    responses: Vec<String>,
    /// Current response index
    index: AtomicUsize,
    /// System-prompt rules, checked in insertion order
    rules: Vec<Rule>,
    /// Simulated latency in ms
    latency_ms: u64,
    /// Every request received, in arrival order
    log: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    /// Create a new mock backend with given responses
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            name: "mock".to_string(),
            responses,
            index: AtomicUsize::new(0),
            rules: Vec::new(),
            latency_ms: 0,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same response
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock with no canned responses; unmatched requests echo the prompt
    pub fn scripted() -> Self {
        Self::new(Vec::new())
    }

    /// Reply with `response` whenever the system prompt contains `needle`
    pub fn on_system(mut self, needle: &str, response: &str) -> Self {
        self.rule_mut(needle).reply = Some(Reply::Text(response.to_string()));
        self
    }

    /// Fail with `error` whenever the system prompt contains `needle`
    pub fn fail_on_system(mut self, needle: &str, error: LlmError) -> Self {
        self.rule_mut(needle).reply = Some(Reply::Fail(error));
        self
    }

    /// Delay replies for system prompts containing `needle`
    pub fn delay_on_system(mut self, needle: &str, latency_ms: u64) -> Self {
        self.rule_mut(needle).latency_ms = Some(latency_ms);
        self
    }

    /// Set the default simulated latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Rename this mock
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.lock_log().len()
    }

    /// Number of requests whose system prompt contains `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.lock_log()
            .iter()
            .filter(|r| r.system.contains(needle))
            .count()
    }

    /// Snapshot of all requests received, in arrival order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock_log().clone()
    }

    fn rule_mut(&mut self, needle: &str) -> &mut Rule {
        let pos = match self.rules.iter().position(|r| r.needle == needle) {
            Some(pos) => pos,
            None => {
                self.rules.push(Rule {
                    needle: needle.to_string(),
                    reply: None,
                    latency_ms: None,
                });
                self.rules.len() - 1
            }
        };
        &mut self.rules[pos]
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, Vec<GenerationRequest>> {
        // A poisoned log only means a test panicked mid-push; the data is still usable.
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn matching_rule(&self, system: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| system.contains(&r.needle))
    }

    fn canned_response(&self, request: &GenerationRequest) -> String {
        if self.responses.is_empty() {
            return format!("echo: {}", request.prompt);
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed);
        self.responses[idx % self.responses.len()].clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let start = Instant::now();
        self.lock_log().push(request.clone());

        let rule = self.matching_rule(&request.system);
        let latency_ms = rule.and_then(|r| r.latency_ms).unwrap_or(self.latency_ms);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        let content = match rule.and_then(|r| r.reply.clone()) {
            Some(Reply::Fail(error)) => return Err(error),
            Some(Reply::Text(text)) => text,
            None => self.canned_response(&request),
        };

        Ok(GenerationResponse {
            tokens_used: Some((request.prompt.len() / 4) as u32 + content.len() as u32 / 4),
            content,
            model: self.name.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SamplingConfig;

    #[tokio::test]
    async fn test_mock_backend() {
        let mock = MockBackend::constant("Hello, world!");
        let response = mock
            .generate("system", "test", &SamplingConfig::default())
            .await
            .unwrap();
        assert_eq!(response, "Hello, world!");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rules_match_on_system_prompt() {
        let mock = MockBackend::scripted()
            .on_system("Angel", "A-reply")
            .fail_on_system("Devil", LlmError::RateLimited);
        let sampling = SamplingConfig::default();

        let angel = mock.generate("You are Angel", "hi", &sampling).await;
        let devil = mock.generate("You are Devil", "hi", &sampling).await;
        let other = mock.generate("You are Ref", "hi", &sampling).await;

        assert_eq!(angel.unwrap(), "A-reply");
        assert_eq!(devil.unwrap_err(), LlmError::RateLimited);
        assert_eq!(other.unwrap(), "echo: hi");
        assert_eq!(mock.calls_matching("Devil"), 1);
    }

    #[tokio::test]
    async fn test_blank_completion_is_invalid() {
        let mock = MockBackend::constant("   ");
        let err = mock
            .generate("system", "test", &SamplingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rule_latency() {
        let mock = MockBackend::scripted()
            .on_system("slow", "done")
            .delay_on_system("slow", 500);
        let start = tokio::time::Instant::now();
        mock.generate("slow persona", "x", &SamplingConfig::default())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
