//! What to pull out of a history

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use personality_core::{ConfigError, Turn};

/// One axis of a turn
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The user's input
    User,
    /// A named Ordinary persona's output
    Persona(String),
    /// The referee's pick
    Referee,
}

impl Selector {
    /// The canonical form of this selector for a roster.
    ///
    /// Persona names match `roster` case-insensitively and come back spelled
    /// the way the roster spells them. The referee's own name resolves to
    /// [`Selector::Referee`]. Anything else is `UnknownSelector`.
    pub fn resolve(&self, roster: &[&str], referee: Option<&str>) -> Result<Selector, ConfigError> {
        let name = match self {
            Selector::Persona(name) => name,
            other => return Ok(other.clone()),
        };
        if let Some(known) = roster.iter().find(|known| known.eq_ignore_ascii_case(name)) {
            return Ok(Selector::Persona(known.to_string()));
        }
        if referee.is_some_and(|referee| referee.eq_ignore_ascii_case(name)) {
            return Ok(Selector::Referee);
        }
        Err(ConfigError::UnknownSelector {
            selector: name.clone(),
        })
    }

    /// The text this selector picks out of `turn`.
    ///
    /// Persona names are matched exactly, so resolve the selector first.
    pub fn pick<'t>(&self, turn: &'t Turn) -> Result<&'t str, ConfigError> {
        match self {
            Selector::User => Ok(&turn.user_input),
            Selector::Referee => Ok(&turn.referee_output),
            Selector::Persona(name) => {
                turn.output_of(name)
                    .ok_or_else(|| ConfigError::UnknownSelector {
                        selector: name.clone(),
                    })
            }
        }
    }
}

impl FromStr for Selector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "user" => Selector::User,
            "referee" => Selector::Referee,
            _ => Selector::Persona(trimmed.to_string()),
        })
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(selector) => selector,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::User => write!(f, "user"),
            Selector::Referee => write!(f, "referee"),
            Selector::Persona(name) => write!(f, "{}", name),
        }
    }
}

/// A single selector or a set of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collect {
    One(Selector),
    Many(Vec<Selector>),
}

impl Collect {
    /// Resolve every selector against a roster, rejecting empty sets.
    ///
    /// See [`Selector::resolve`]. The shape (one or many) is kept.
    pub fn resolve(&self, roster: &[&str], referee: Option<&str>) -> Result<Collect, ConfigError> {
        match self {
            Collect::One(selector) => Ok(Collect::One(selector.resolve(roster, referee)?)),
            Collect::Many(selectors) if selectors.is_empty() => Err(ConfigError::EmptySelection),
            Collect::Many(selectors) => selectors
                .iter()
                .map(|selector| selector.resolve(roster, referee))
                .collect::<Result<Vec<_>, _>>()
                .map(Collect::Many),
        }
    }
}

impl From<Selector> for Collect {
    fn from(selector: Selector) -> Self {
        Collect::One(selector)
    }
}

impl From<&str> for Collect {
    fn from(s: &str) -> Self {
        Collect::One(s.into())
    }
}

impl From<Vec<&str>> for Collect {
    fn from(items: Vec<&str>) -> Self {
        Collect::Many(items.into_iter().map(Selector::from).collect())
    }
}

impl From<Vec<Selector>> for Collect {
    fn from(selectors: Vec<Selector>) -> Self {
        Collect::Many(selectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_for_keywords() {
        assert_eq!(Selector::from("USER"), Selector::User);
        assert_eq!(Selector::from(" Referee "), Selector::Referee);
        assert_eq!(Selector::from("Angel"), Selector::Persona("Angel".to_string()));
        assert_eq!(Selector::from("Angel").to_string(), "Angel");
    }

    #[test]
    fn test_collect_resolution() {
        let roster = ["Angel", "Devil"];
        assert_eq!(
            Collect::from(vec!["user", "Angel"]).resolve(&roster, Some("Ref")),
            Ok(Collect::Many(vec![
                Selector::User,
                Selector::Persona("Angel".to_string())
            ]))
        );
        assert_eq!(
            Collect::from(Vec::<&str>::new()).resolve(&roster, Some("Ref")),
            Err(ConfigError::EmptySelection)
        );
        assert_eq!(
            Collect::from("Ghost").resolve(&roster, Some("Ref")),
            Err(ConfigError::UnknownSelector {
                selector: "Ghost".to_string()
            })
        );
    }

    #[test]
    fn test_persona_names_match_like_the_roster() {
        let roster = ["Angel", "Devil"];
        assert_eq!(
            Selector::from("angel").resolve(&roster, Some("Ref")),
            Ok(Selector::Persona("Angel".to_string()))
        );
        assert_eq!(
            Selector::from("ref").resolve(&roster, Some("Ref")),
            Ok(Selector::Referee)
        );
        // Without a known referee its name is just an unknown persona
        assert!(Selector::from("Ref").resolve(&roster, None).is_err());
    }
}
