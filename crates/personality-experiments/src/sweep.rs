//! Referee sweeps
//!
//! A sweep holds the candidate answers fixed and asks the referee to choose
//! among them once per sampling override, so only referee variance shows up
//! in the results.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use personality_core::{ConfigError, PersonalityError};
use personality_llm::SamplingOverride;
use personality_runtime::Person;

/// Candidate answers for one prompt, as `(persona, text)`
pub type Choices = Vec<(String, String)>;

/// Parameters of a referee sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    /// User inputs, one referee call per prompt per label
    pub prompts: Vec<String>,
    /// Candidates per prompt. Required with `bypass`, ignored without it.
    #[serde(default)]
    pub choices: Option<Vec<Choices>>,
    /// Label → referee override, e.g. `"low" → temperature 0.2`
    pub overrides: BTreeMap<String, SamplingOverride>,
    /// Use `choices` as given instead of asking the Ordinary personas
    #[serde(default)]
    pub bypass: bool,
}

impl SweepRequest {
    pub fn new(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            ..Default::default()
        }
    }

    /// Add a label
    pub fn label(mut self, label: &str, overrides: SamplingOverride) -> Self {
        self.overrides.insert(label.to_string(), overrides);
        self
    }

    /// Add a label that only changes the referee temperature
    pub fn temperature(self, label: &str, temperature: f32) -> Self {
        self.label(label, SamplingOverride::temperature(temperature))
    }

    /// Use fixed candidates and skip the Ordinary personas
    pub fn bypass_with(mut self, choices: Vec<Choices>) -> Self {
        self.choices = Some(choices);
        self.bypass = true;
        self
    }

    /// Check the request shape before any backend call
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompts.is_empty() || self.prompts.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyInput);
        }
        if self.overrides.is_empty() {
            return Err(ConfigError::EmptySelection);
        }
        if self.bypass {
            let choices = self.choices.as_deref().unwrap_or_default();
            if choices.len() != self.prompts.len() {
                return Err(ConfigError::LengthMismatch {
                    prompts: self.prompts.len(),
                    choices: choices.len(),
                });
            }
            if choices.iter().any(|c| c.is_empty()) {
                return Err(ConfigError::EmptyInput);
            }
        }
        Ok(())
    }
}

/// Run the referee over fixed choices once per label.
///
/// Without `bypass` the Ordinary outputs are generated once per prompt and
/// reused for every label. Labels run concurrently; each label's outputs are
/// in prompt order. The person's history is never written.
pub async fn ref_response_collector(
    person: &Person,
    request: &SweepRequest,
) -> Result<BTreeMap<String, Vec<String>>, PersonalityError> {
    request.validate()?;

    let generated;
    let choices: &[Choices] = match (&request.choices, request.bypass) {
        (Some(choices), true) => choices,
        _ => {
            let mut fresh = Vec::with_capacity(request.prompts.len());
            for prompt in &request.prompts {
                fresh.push(person.think(prompt).await?);
            }
            generated = fresh;
            &generated
        }
    };

    tracing::info!(
        person = %person.name(),
        prompts = request.prompts.len(),
        labels = request.overrides.len(),
        bypass = request.bypass,
        "Starting referee sweep"
    );
    person.metrics().record_sweep();

    let runs = request.overrides.iter().map(|(label, overrides)| async move {
        let mut picks = Vec::with_capacity(request.prompts.len());
        for (prompt, candidates) in request.prompts.iter().zip(choices) {
            picks.push(person.referee_pick(prompt, candidates, overrides).await?);
        }
        tracing::debug!(label = %label, picks = picks.len(), "Sweep label finished");
        Ok::<_, PersonalityError>((label.clone(), picks))
    });

    Ok(try_join_all(runs).await?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<Choices> {
        vec![vec![
            ("Angel".to_string(), "Return it.".to_string()),
            ("Devil".to_string(), "Keep it.".to_string()),
        ]]
    }

    #[test]
    fn test_validate() {
        let ok = SweepRequest::new(vec!["Found a wallet".to_string()])
            .temperature("low", 0.2)
            .bypass_with(choices());
        assert_eq!(ok.validate(), Ok(()));

        let no_labels = SweepRequest::new(vec!["Found a wallet".to_string()]);
        assert_eq!(no_labels.validate(), Err(ConfigError::EmptySelection));

        let mismatch = SweepRequest::new(vec!["a".to_string(), "b".to_string()])
            .temperature("low", 0.2)
            .bypass_with(choices());
        assert_eq!(
            mismatch.validate(),
            Err(ConfigError::LengthMismatch {
                prompts: 2,
                choices: 1
            })
        );

        let mut missing = SweepRequest::new(vec!["a".to_string()]).temperature("low", 0.2);
        missing.bypass = true;
        assert_eq!(
            missing.validate(),
            Err(ConfigError::LengthMismatch {
                prompts: 1,
                choices: 0
            })
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: SweepRequest = serde_json::from_str(
            r#"{
                "prompts": ["Found a wallet"],
                "overrides": {"low": {"temperature": 0.2}, "high": {"temperature": 1.2}}
            }"#,
        )
        .unwrap();
        assert!(!request.bypass);
        assert_eq!(request.overrides["high"], SamplingOverride::temperature(1.2));
    }
}
