//! Referee ballot rendering

/// What the referee sees: the conversation so far, the user input and every
/// candidate answer in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct RefereeBallot<'a> {
    context: &'a str,
    user_input: &'a str,
    candidates: &'a [(String, String)],
}

impl<'a> RefereeBallot<'a> {
    pub fn new(user_input: &'a str, candidates: &'a [(String, String)]) -> Self {
        Self {
            context: "",
            user_input,
            candidates,
        }
    }

    /// Prior conversation, already rendered as `speaker: text` lines
    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = context;
        self
    }

    pub fn candidates(&self) -> &[(String, String)] {
        self.candidates
    }

    /// The referee's user prompt
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(self.context);
        out.push_str(&format!("user: {}\n\nCHOOSE A RESPONSE:\n", self.user_input));
        for (name, text) in self.candidates {
            out.push_str(&format!("[{}]: {}\n", name, text));
        }
        out
    }
}
