//! Response extraction
//!
//! Generate mode re-drives [`Person::answer`] over a prompt batch and reads
//! the Ordinary outputs back. Scan mode filters turns that already exist.

use std::collections::BTreeMap;

use personality_core::{ConfigError, PersonalityError, Turn};
use personality_llm::SamplingOverride;
use personality_runtime::Person;

use crate::selector::{Collect, Selector};

/// Referee temperature used while collecting
pub const COLLECT_REFEREE_TEMPERATURE: f32 = 0.5;

/// Result of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// One text per turn for a single selector
    Single(Vec<String>),
    /// One sequence per selector, each aligned by turn index
    Aligned(Vec<(Selector, Vec<String>)>),
}

impl Extraction {
    /// The sequence for `selector`, if it was collected
    pub fn get(&self, selector: &Selector) -> Option<&[String]> {
        match self {
            Extraction::Single(values) => Some(values),
            Extraction::Aligned(columns) => columns
                .iter()
                .find(|(s, _)| s == selector)
                .map(|(_, values)| values.as_slice()),
        }
    }

    /// Number of turns covered
    pub fn len(&self) -> usize {
        match self {
            Extraction::Single(values) => values.len(),
            Extraction::Aligned(columns) => columns.first().map_or(0, |(_, v)| v.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run every prompt through `person` and return each turn's Ordinary outputs.
///
/// The referee runs at [`COLLECT_REFEREE_TEMPERATURE`] for these turns. With
/// `persist = false` the person's history is put back to exactly what it held
/// before the call, whether or not the batch succeeded.
pub async fn response_collector(
    person: &mut Person,
    prompts: &[&str],
    persist: bool,
) -> Result<Vec<Vec<(String, String)>>, PersonalityError> {
    if prompts.is_empty() || prompts.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::EmptyInput.into());
    }

    let snapshot = person.thoughts().to_vec();
    let start = snapshot.len();
    let referee = SamplingOverride::temperature(COLLECT_REFEREE_TEMPERATURE);

    tracing::debug!(
        person = %person.name(),
        prompts = prompts.len(),
        persist,
        "Collecting responses"
    );

    let mut outcome = Ok(());
    for prompt in prompts {
        if let Err(e) = person.answer_with(prompt, &referee).await {
            outcome = Err(e);
            break;
        }
    }

    let collected: Vec<Vec<(String, String)>> = person.thoughts()[start..]
        .iter()
        .map(|turn| turn.persona_outputs.clone())
        .collect();

    if !persist {
        person.restore_history(snapshot);
    }
    outcome.map(|_| collected)
}

/// Filter `turns` by `collect`.
///
/// `roster` is the Ordinary persona names persona selectors are resolved
/// against, and the referee is the one named on the turns. Resolution happens
/// before any turn is read, see [`Collect::resolve`].
pub fn scan(turns: &[Turn], roster: &[&str], collect: &Collect) -> Result<Extraction, ConfigError> {
    let referee = turns.first().map(|turn| turn.referee_name.as_str());
    let collect = collect.resolve(roster, referee)?;
    extract(turns, &collect)
}

/// Scan a person's own history
pub fn scan_person(person: &Person, collect: &Collect) -> Result<Extraction, ConfigError> {
    let collect = collect.resolve(&person.persona_names(), Some(person.referee_name()))?;
    extract(person.thoughts(), &collect)
}

/// Answer `prompts` in order, then scan the person's history.
///
/// `collect` is resolved against the person before the first prompt is
/// answered, so a bad selector costs no backend calls. The answered turns
/// stay in the history.
pub async fn answer_and_scan(
    person: &mut Person,
    prompts: &[&str],
    collect: &Collect,
) -> Result<Extraction, PersonalityError> {
    let collect = collect.resolve(&person.persona_names(), Some(person.referee_name()))?;
    if prompts.is_empty() || prompts.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::EmptyInput.into());
    }

    for prompt in prompts {
        person.answer(prompt).await?;
    }
    Ok(extract(person.thoughts(), &collect)?)
}

/// Scan several persons' histories at once.
///
/// All histories must have the same number of turns so the results line up;
/// a mismatch is an error rather than a silent truncation.
pub fn scan_batch(
    histories: &BTreeMap<String, Vec<Turn>>,
    roster: &[&str],
    collect: &Collect,
) -> Result<BTreeMap<String, Extraction>, ConfigError> {
    let referee = histories
        .values()
        .find_map(|turns| turns.first())
        .map(|turn| turn.referee_name.as_str());
    let collect = collect.resolve(roster, referee)?;

    let mut entries = histories.iter();
    if let Some((first, first_turns)) = entries.next() {
        for (other, other_turns) in entries {
            if other_turns.len() != first_turns.len() {
                return Err(ConfigError::TurnCountMismatch {
                    first: first.clone(),
                    first_len: first_turns.len(),
                    other: other.clone(),
                    other_len: other_turns.len(),
                });
            }
        }
    }

    histories
        .iter()
        .map(|(name, turns)| Ok::<_, ConfigError>((name.clone(), extract(turns, &collect)?)))
        .collect()
}

/// Columns for an already resolved `collect`
fn extract(turns: &[Turn], collect: &Collect) -> Result<Extraction, ConfigError> {
    let column = |selector: &Selector| -> Result<Vec<String>, ConfigError> {
        turns
            .iter()
            .map(|turn| selector.pick(turn).map(str::to_string))
            .collect()
    };

    match collect {
        Collect::One(selector) => Ok(Extraction::Single(column(selector)?)),
        Collect::Many(selectors) => {
            let columns = selectors
                .iter()
                .map(|selector| Ok::<_, ConfigError>((selector.clone(), column(selector)?)))
                .collect::<Result<Vec<_>, ConfigError>>()?;
            Ok(Extraction::Aligned(columns))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personality_core::HistoryStore;

    fn two_turns() -> Vec<Turn> {
        let mut store = HistoryStore::new();
        store.append(
            "Found a wallet",
            vec![
                ("Angel".to_string(), "Return it.".to_string()),
                ("Devil".to_string(), "Keep it.".to_string()),
            ],
            "Ref",
            "Return it.",
        );
        store.append(
            "It has cash",
            vec![
                ("Angel".to_string(), "Still return it.".to_string()),
                ("Devil".to_string(), "Take the cash.".to_string()),
            ],
            "Ref",
            "Still return it.",
        );
        store.turns().to_vec()
    }

    #[test]
    fn test_scan_user() {
        let turns = two_turns();
        let result = scan(&turns, &["Angel", "Devil"], &"user".into()).unwrap();
        assert_eq!(
            result,
            Extraction::Single(vec!["Found a wallet".to_string(), "It has cash".to_string()])
        );
    }

    #[test]
    fn test_scan_aligned() {
        let turns = two_turns();
        let result = scan(&turns, &["Angel", "Devil"], &vec!["user", "Angel"].into()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get(&Selector::Persona("Angel".to_string())),
            Some(&["Return it.".to_string(), "Still return it.".to_string()][..])
        );
        assert_eq!(result.get(&Selector::Referee), None);
    }

    #[test]
    fn test_scan_empty_history() {
        let result = scan(&[], &["Angel"], &"referee".into()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_batch_rejects_uneven_histories() {
        let mut histories = BTreeMap::new();
        histories.insert("Alex".to_string(), two_turns());
        histories.insert("Sam".to_string(), two_turns()[..1].to_vec());

        let err = scan_batch(&histories, &["Angel", "Devil"], &"user".into()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TurnCountMismatch {
                first: "Alex".to_string(),
                first_len: 2,
                other: "Sam".to_string(),
                other_len: 1,
            }
        );
    }

    #[test]
    fn test_scan_referee_by_keyword_and_by_name() {
        let turns = two_turns();
        let expected = vec!["Return it.".to_string(), "Still return it.".to_string()];

        let by_keyword = scan(&turns, &["Angel", "Devil"], &"referee".into()).unwrap();
        assert_eq!(by_keyword, Extraction::Single(expected.clone()));

        let by_name = scan(&turns, &["Angel", "Devil"], &vec!["user", "ref"].into()).unwrap();
        assert_eq!(by_name.get(&Selector::Referee), Some(&expected[..]));
    }

    #[test]
    fn test_scan_batch_aligns_every_person() {
        let mut histories = BTreeMap::new();
        histories.insert("Alex".to_string(), two_turns());
        histories.insert("Sam".to_string(), two_turns());

        let collect = Collect::from(vec!["user", "devil"]);
        let results = scan_batch(&histories, &["Angel", "Devil"], &collect).unwrap();

        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["Alex", "Sam"]);
        for extraction in results.values() {
            assert_eq!(
                extraction,
                &Extraction::Aligned(vec![
                    (
                        Selector::User,
                        vec!["Found a wallet".to_string(), "It has cash".to_string()]
                    ),
                    (
                        Selector::Persona("Devil".to_string()),
                        vec!["Keep it.".to_string(), "Take the cash.".to_string()]
                    ),
                ])
            );
        }
    }
}
