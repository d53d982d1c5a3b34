//! Turn-structured history
//!
//! A [`HistoryStore`] is an append-only sequence of complete [`Turn`]s. The
//! only mutations are `append` and `clear`; indices are always `0..len`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One complete round: user input, every Ordinary output and the referee's pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier
    pub id: Uuid,
    /// Position in the history, contiguous from 0
    pub index: usize,
    /// What the user said
    pub user_input: String,
    /// (persona name, text) for every Ordinary persona, in declaration order
    pub persona_outputs: Vec<(String, String)>,
    /// Name of the referee that made the pick
    pub referee_name: String,
    /// The referee's raw output, returned to the caller
    pub referee_output: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Output of a named Ordinary persona in this turn
    pub fn output_of(&self, persona: &str) -> Option<&str> {
        self.persona_outputs
            .iter()
            .find(|(name, _)| name == persona)
            .map(|(_, text)| text.as_str())
    }

    /// Ordinary persona names, in declaration order
    pub fn persona_names(&self) -> impl Iterator<Item = &str> {
        self.persona_outputs.iter().map(|(name, _)| name.as_str())
    }
}

/// Ordered, append-only record of turns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStore {
    turns: Vec<Turn>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a complete turn, assigning the next index
    pub fn append(
        &mut self,
        user_input: &str,
        persona_outputs: Vec<(String, String)>,
        referee_name: &str,
        referee_output: &str,
    ) -> &Turn {
        let turn = Turn {
            id: Uuid::new_v4(),
            index: self.turns.len(),
            user_input: user_input.to_string(),
            persona_outputs,
            referee_name: referee_name.to_string(),
            referee_output: referee_output.to_string(),
            timestamp: Utc::now(),
        };
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// Truncate to empty. Idempotent.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Replace the contents with previously read turns.
    ///
    /// This is a clear followed by appends: indices are reassigned from 0 so
    /// the invariant holds even if `turns` wasn't a contiguous prefix. Ids and
    /// timestamps are kept.
    pub fn restore(&mut self, turns: Vec<Turn>) {
        self.clear();
        for mut turn in turns {
            turn.index = self.turns.len();
            self.turns.push(turn);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The dialogue as seen from outside: ("user", input) then
    /// ("assistant", referee output) for every turn
    pub fn conversation(&self) -> Vec<(&'static str, &str)> {
        self.turns
            .iter()
            .flat_map(|t| {
                [
                    ("user", t.user_input.as_str()),
                    ("assistant", t.referee_output.as_str()),
                ]
            })
            .collect()
    }

    /// Text rendering of every turn, including the Ordinary outputs.
    ///
    /// Each turn is `user: ..`, one `Persona: ..` line per output, then
    /// `<speaker>: ..` for the referee's pick. Turns are separated by a blank
    /// line.
    pub fn transcript(&self, speaker: &str) -> String {
        let mut out = String::new();
        for (i, turn) in self.turns.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("user: {}\n", turn.user_input));
            for (name, text) in &turn.persona_outputs {
                out.push_str(&format!("{}: {}\n", name, text));
            }
            out.push_str(&format!("{}: {}\n", speaker, turn.referee_output));
        }
        out
    }
}

impl<'a> IntoIterator for &'a HistoryStore {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
