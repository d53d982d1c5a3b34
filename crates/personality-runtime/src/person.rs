//! Person - a composite agent made of Ordinary personas and one Referee
//!
//! Each turn moves through `Idle → Dispatching → AwaitingOrdinary →
//! Refereeing → Recorded → Idle`. Every Ordinary persona answers the same
//! input concurrently; the referee runs only once all of them have answered,
//! and the turn is appended only after the referee succeeds. A failure or a
//! dropped future at any point leaves the history untouched.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use personality_core::{
    ConfigError, GenerationError, HistoryStore, PersonConfig, Persona, PersonaDefaults,
    PersonaSpec, PersonalityError, Turn,
};
use personality_llm::{global_metrics, GenerationBackend, Metrics, SamplingOverride};

use crate::ballot::RefereeBallot;

/// Names an Ordinary persona can't take, since extraction selectors use them
const RESERVED_NAMES: [&str; 2] = ["user", "referee"];

/// Check the roster shape: exactly one Referee, at least two Ordinary
/// personas, unique names, no reserved names among the Ordinary ones.
pub fn validate_roster(specs: &[PersonaSpec]) -> Result<(), ConfigError> {
    let referees = specs.iter().filter(|s| s.is_referee()).count();
    let ordinary = specs.len() - referees;

    if referees == 0 {
        return Err(ConfigError::MissingReferee);
    }
    if referees > 1 {
        return Err(ConfigError::MultipleReferees { found: referees });
    }
    if ordinary < 2 {
        return Err(ConfigError::TooFewOrdinary { found: ordinary });
    }

    let mut seen = HashSet::new();
    for spec in specs {
        let key = spec.name.trim().to_lowercase();
        if !spec.is_referee() && RESERVED_NAMES.contains(&key.as_str()) {
            return Err(ConfigError::ReservedName {
                name: spec.name.clone(),
            });
        }
        if !key.is_empty() && !seen.insert(key) {
            return Err(ConfigError::DuplicatePersona {
                name: spec.name.clone(),
            });
        }
    }
    Ok(())
}

/// A composite agent
#[derive(Debug)]
pub struct Person {
    id: Uuid,
    name: String,
    description: String,
    ordinary: Vec<Persona>,
    referee: Persona,
    history: HistoryStore,
    carry_context: bool,
    metrics: Arc<Metrics>,
}

impl Person {
    /// Build a person from persona specs.
    ///
    /// Specs without their own backend use `default_backend`; if neither is
    /// present construction fails. The description becomes the prompt context
    /// of every persona that doesn't set its own.
    pub fn new(
        name: &str,
        description: &str,
        specs: Vec<PersonaSpec>,
        default_backend: Option<Arc<dyn GenerationBackend>>,
    ) -> Result<Self, ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        validate_roster(&specs)?;

        let mut ordinary = Vec::with_capacity(specs.len() - 1);
        let mut referee = None;
        for spec in specs {
            let persona = Persona::new(spec, default_backend.as_ref(), description)?;
            if persona.is_referee() {
                referee = Some(persona);
            } else {
                ordinary.push(persona);
            }
        }
        let referee = referee.ok_or(ConfigError::MissingReferee)?;

        tracing::debug!(
            person = %name,
            personas = ?ordinary.iter().map(|p| p.name()).collect::<Vec<_>>(),
            referee = %referee.name(),
            "Person created"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            ordinary,
            referee,
            history: HistoryStore::new(),
            carry_context: true,
            metrics: global_metrics(),
        })
    }

    /// Build a person from a roster document
    pub fn from_config(
        config: &PersonConfig,
        defaults: &PersonaDefaults,
        default_backend: Option<Arc<dyn GenerationBackend>>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            &config.name,
            &config.description,
            config.specs(defaults),
            default_backend,
        )
    }

    /// Record into `metrics` instead of the global collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.ordinary = std::mem::take(&mut self.ordinary)
            .into_iter()
            .map(|p| p.with_metrics(metrics.clone()))
            .collect();
        self.referee = self.referee.with_metrics(metrics.clone());
        self.metrics = metrics;
        self
    }

    /// Whether earlier turns are shown to personas as conversation context
    pub fn with_context_carry(mut self, carry: bool) -> Self {
        self.carry_context = carry;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ordinary personas, in declaration order
    pub fn personas(&self) -> &[Persona] {
        &self.ordinary
    }

    pub fn referee(&self) -> &Persona {
        &self.referee
    }

    /// Ordinary persona names, in declaration order
    pub fn persona_names(&self) -> Vec<&str> {
        self.ordinary.iter().map(|p| p.name()).collect()
    }

    pub fn referee_name(&self) -> &str {
        self.referee.name()
    }

    /// Collector this person records into
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn has_persona(&self, name: &str) -> bool {
        self.ordinary.iter().any(|p| p.name() == name)
    }

    /// Name, description and the Ordinary persona names
    pub fn about(&self) -> String {
        format!(
            "{}\n{}\n{} has {:?} personalities, refereed by {}.",
            self.name,
            self.description,
            self.name,
            self.persona_names(),
            self.referee.name()
        )
    }

    /// Run one turn and return the referee's pick
    pub async fn answer(&mut self, user_input: &str) -> Result<String, PersonalityError> {
        self.answer_with(user_input, &SamplingOverride::none()).await
    }

    /// Run one turn with `referee_overrides` applied to the referee call only
    pub async fn answer_with(
        &mut self,
        user_input: &str,
        referee_overrides: &SamplingOverride,
    ) -> Result<String, PersonalityError> {
        // Dispatching
        self.check_dispatch(user_input)?;
        let context = self.conversation_context();
        tracing::debug!(
            person = %self.name,
            turn = self.history.len(),
            personas = self.ordinary.len(),
            "Dispatching turn"
        );

        // AwaitingOrdinary
        let outputs = match self.fan_out(&context, user_input).await {
            Ok(outputs) => outputs,
            Err(e) => return Err(self.discard_turn(e)),
        };
        tracing::debug!(person = %self.name, "All personas answered, refereeing");

        // Refereeing
        let ballot = RefereeBallot::new(user_input, &outputs).with_context(&context);
        self.metrics.record_referee_call();
        let pick = match self
            .referee
            .generate_with(&ballot.render(), referee_overrides)
            .await
        {
            Ok(pick) => pick,
            Err(e) => return Err(self.discard_turn(e)),
        };

        // Recorded
        let referee_name = self.referee.name().to_string();
        let turn = self.history.append(user_input, outputs, &referee_name, &pick);
        tracing::info!(
            person = %self.name,
            turn = turn.index,
            turn_id = %turn.id,
            "Turn recorded"
        );
        self.metrics.record_turn(true);
        Ok(pick)
    }

    /// Ask every Ordinary persona concurrently without recording anything.
    ///
    /// Outputs come back as `(persona, text)` in declaration order.
    pub async fn think(&self, user_input: &str) -> Result<Vec<(String, String)>, PersonalityError> {
        self.check_dispatch(user_input)?;
        let context = self.conversation_context();
        Ok(self.fan_out(&context, user_input).await?)
    }

    /// Have the referee choose among caller-supplied candidates.
    ///
    /// No Ordinary persona is called and nothing is recorded.
    pub async fn referee_pick(
        &self,
        user_input: &str,
        candidates: &[(String, String)],
        overrides: &SamplingOverride,
    ) -> Result<String, PersonalityError> {
        if user_input.trim().is_empty() || candidates.is_empty() {
            return Err(ConfigError::EmptyInput.into());
        }
        let context = self.conversation_context();
        let ballot = RefereeBallot::new(user_input, candidates).with_context(&context);
        self.metrics.record_referee_call();
        Ok(self.referee.generate_with(&ballot.render(), overrides).await?)
    }

    /// Every recorded turn, oldest first
    pub fn thoughts(&self) -> &[Turn] {
        self.history.turns()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Text rendering of every turn, including each persona's output
    pub fn transcript(&self) -> String {
        self.history.transcript(&self.name)
    }

    /// Truncate the history to empty. Idempotent.
    pub fn clear_history(&mut self) {
        self.history.clear();
        tracing::info!(person = %self.name, "History cleared");
    }

    /// Replace the history with turns previously read from this person
    pub fn restore_history(&mut self, turns: Vec<Turn>) {
        self.history.restore(turns);
    }

    fn check_dispatch(&self, user_input: &str) -> Result<(), ConfigError> {
        if user_input.trim().is_empty() {
            return Err(ConfigError::EmptyInput);
        }
        if self.ordinary.len() < 2 {
            return Err(ConfigError::TooFewOrdinary {
                found: self.ordinary.len(),
            });
        }
        Ok(())
    }

    /// Earlier turns as `user:` / `<name>:` lines, empty when carry is off
    fn conversation_context(&self) -> String {
        if !self.carry_context {
            return String::new();
        }
        let mut out = String::new();
        for turn in &self.history {
            out.push_str(&format!("user: {}\n", turn.user_input));
            out.push_str(&format!("{}: {}\n", self.name, turn.referee_output));
        }
        out
    }

    /// Concurrent Ordinary calls joined in declaration order.
    ///
    /// The first failure drops the remaining in-flight calls.
    async fn fan_out(
        &self,
        context: &str,
        user_input: &str,
    ) -> Result<Vec<(String, String)>, GenerationError> {
        let prompt = if context.is_empty() {
            user_input.to_string()
        } else {
            format!("{}user: {}", context, user_input)
        };
        let prompt = prompt.as_str();

        let calls = self.ordinary.iter().map(|persona| async move {
            let text = persona.generate(prompt).await?;
            Ok::<_, GenerationError>((persona.name().to_string(), text))
        });
        futures::future::try_join_all(calls).await
    }

    fn discard_turn(&self, error: GenerationError) -> PersonalityError {
        tracing::warn!(
            person = %self.name,
            persona = %error.persona,
            error = %error.source,
            "Turn discarded"
        );
        self.metrics.record_turn(false);
        error.into()
    }
}
