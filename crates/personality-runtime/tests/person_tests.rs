//! Turn lifecycle tests for Person

use std::sync::Arc;
use std::time::Duration;

use personality_core::{ConfigError, PersonaSpec, PersonalityError};
use personality_llm::{LlmError, Metrics, MockBackend, SamplingOverride};
use personality_runtime::Person;

fn wallet_specs() -> Vec<PersonaSpec> {
    vec![
        PersonaSpec::ordinary("Angel", "You are Angel. Argue for honesty."),
        PersonaSpec::ordinary("Devil", "You are Devil. Argue for keeping it."),
        PersonaSpec::referee("Ref", "You are Ref. Choose one response."),
    ]
}

fn wallet_backend() -> MockBackend {
    MockBackend::scripted()
        .on_system("You are Angel", "A-reply")
        .on_system("You are Devil", "D-reply")
        .on_system("You are Ref", "chosen: A-reply")
}

fn person_with(mock: &Arc<MockBackend>, metrics: &Arc<Metrics>) -> Person {
    Person::new("Alex", "", wallet_specs(), Some(mock.clone()))
        .unwrap()
        .with_metrics(metrics.clone())
}

#[tokio::test]
async fn test_answer_records_one_turn() {
    let mock = Arc::new(wallet_backend());
    let metrics = Arc::new(Metrics::new());
    let mut alex = person_with(&mock, &metrics);

    let reply = alex.answer("Found a wallet").await.unwrap();
    assert_eq!(reply, "chosen: A-reply");

    let thoughts = alex.thoughts();
    assert_eq!(thoughts.len(), 1);
    assert_eq!(thoughts[0].index, 0);
    assert_eq!(thoughts[0].user_input, "Found a wallet");
    assert_eq!(
        thoughts[0].persona_outputs,
        vec![
            ("Angel".to_string(), "A-reply".to_string()),
            ("Devil".to_string(), "D-reply".to_string()),
        ]
    );
    assert_eq!(thoughts[0].referee_name, "Ref");
    assert_eq!(thoughts[0].referee_output, "chosen: A-reply");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.generation_calls, 3);
    assert_eq!(snapshot.turns_recorded, 1);
    assert_eq!(snapshot.referee_calls, 1);
}

#[tokio::test]
async fn test_referee_runs_last_and_sees_every_candidate() {
    let mock = Arc::new(wallet_backend());
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    alex.answer("Found a wallet").await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    let last = requests.last().unwrap();
    assert!(last.system.contains("You are Ref"));
    assert!(last
        .prompt
        .contains("CHOOSE A RESPONSE:\n[Angel]: A-reply\n[Devil]: D-reply\n"));
    assert_eq!(mock.calls_matching("You are Ref"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_outputs_follow_declaration_order_not_completion_order() {
    let mock = Arc::new(
        wallet_backend()
            .delay_on_system("You are Angel", 300)
            .delay_on_system("You are Devil", 10),
    );
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    alex.answer("Found a wallet").await.unwrap();

    let names: Vec<&str> = alex.thoughts()[0].persona_names().collect();
    assert_eq!(names, vec!["Angel", "Devil"]);
}

#[tokio::test(start_paused = true)]
async fn test_three_personas_finishing_in_reverse_keep_declaration_order() {
    let mock = Arc::new(
        wallet_backend()
            .on_system("You are Imp", "I-reply")
            .delay_on_system("You are Angel", 300)
            .delay_on_system("You are Devil", 200)
            .delay_on_system("You are Imp", 10),
    );
    let mut specs = wallet_specs();
    specs.insert(2, PersonaSpec::ordinary("Imp", "You are Imp. Suggest a prank."));
    let mut alex = Person::new("Alex", "", specs, Some(mock.clone())).unwrap();

    let start = tokio::time::Instant::now();
    alex.answer("Found a wallet").await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));

    let turn = &alex.thoughts()[0];
    let names: Vec<&str> = turn.persona_names().collect();
    assert_eq!(names, vec!["Angel", "Devil", "Imp"]);
    assert_eq!(turn.output_of("Imp"), Some("I-reply"));

    let referee = mock
        .requests()
        .into_iter()
        .find(|r| r.system.contains("You are Ref"))
        .unwrap();
    assert!(referee
        .prompt
        .contains("[Angel]: A-reply\n[Devil]: D-reply\n[Imp]: I-reply\n"));
}

#[tokio::test(start_paused = true)]
async fn test_personas_run_concurrently() {
    let mock = Arc::new(
        wallet_backend()
            .delay_on_system("You are Angel", 200)
            .delay_on_system("You are Devil", 200),
    );
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    let start = tokio::time::Instant::now();
    alex.answer("Found a wallet").await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(400));
}

#[tokio::test]
async fn test_persona_failure_leaves_history_unchanged() {
    let mock = Arc::new(
        wallet_backend().fail_on_system("You are Devil", LlmError::RequestFailed("boom".into())),
    );
    let metrics = Arc::new(Metrics::new());
    let mut alex = person_with(&mock, &metrics);

    let err = alex.answer("Found a wallet").await.unwrap_err();
    match err {
        PersonalityError::Generation(e) => {
            assert_eq!(e.persona, "Devil");
            assert_eq!(e.source, LlmError::RequestFailed("boom".into()));
        }
        other => panic!("expected generation error, got {:?}", other),
    }
    assert!(alex.thoughts().is_empty());
    assert_eq!(mock.calls_matching("You are Ref"), 0);
    assert_eq!(metrics.snapshot().turns_failed, 1);
}

#[tokio::test]
async fn test_referee_failure_leaves_history_unchanged() {
    let mock = Arc::new(wallet_backend().fail_on_system("You are Ref", LlmError::Timeout(30_000)));
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    let err = alex.answer("Found a wallet").await.unwrap_err();
    assert!(err.is_generation());
    assert!(alex.thoughts().is_empty());
}

#[tokio::test]
async fn test_indices_stay_contiguous_across_clear() {
    let mock = Arc::new(wallet_backend());
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    alex.answer("one").await.unwrap();
    alex.answer("two").await.unwrap();
    alex.clear_history();
    alex.clear_history();
    assert!(alex.thoughts().is_empty());

    alex.answer("three").await.unwrap();
    let indices: Vec<usize> = alex.thoughts().iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0]);
    assert_eq!(alex.thoughts()[0].user_input, "three");
}

#[tokio::test]
async fn test_single_ordinary_persona_is_rejected_without_calls() {
    let mock = Arc::new(wallet_backend());
    let specs = vec![
        PersonaSpec::ordinary("Angel", "You are Angel."),
        PersonaSpec::referee("Ref", "You are Ref."),
    ];

    let err = Person::new("Alex", "", specs, Some(mock.clone())).unwrap_err();
    assert_eq!(err, ConfigError::TooFewOrdinary { found: 1 });
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_turn_records_nothing() {
    let mock = Arc::new(wallet_backend().delay_on_system("You are Angel", 1_000));
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), alex.answer("Found a wallet")).await;
    assert!(outcome.is_err());
    assert!(alex.thoughts().is_empty());
    assert_eq!(mock.calls_matching("You are Ref"), 0);

    // Still usable after the dropped turn
    let reply = alex.answer("Found a wallet").await.unwrap();
    assert_eq!(reply, "chosen: A-reply");
    assert_eq!(alex.thoughts().len(), 1);
    assert_eq!(alex.thoughts()[0].index, 0);
}

#[tokio::test]
async fn test_referee_override_applies_to_referee_only() {
    let mock = Arc::new(wallet_backend());
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    alex.answer_with("Found a wallet", &SamplingOverride::temperature(0.0))
        .await
        .unwrap();

    for request in mock.requests() {
        if request.system.contains("You are Ref") {
            assert_eq!(request.sampling.temperature, 0.0);
        } else {
            assert_eq!(request.sampling.temperature, 0.5);
        }
    }
    assert_eq!(alex.referee().sampling().temperature, 0.5);
}

#[tokio::test]
async fn test_think_and_referee_pick_record_nothing() {
    let mock = Arc::new(wallet_backend());
    let alex = person_with(&mock, &Arc::new(Metrics::new()));

    let outputs = alex.think("Found a wallet").await.unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(mock.call_count(), 2);

    let candidates = vec![
        ("Angel".to_string(), "fixed A".to_string()),
        ("Devil".to_string(), "fixed D".to_string()),
    ];
    let pick = alex
        .referee_pick("Found a wallet", &candidates, &SamplingOverride::none())
        .await
        .unwrap();
    assert_eq!(pick, "chosen: A-reply");
    assert_eq!(mock.call_count(), 3);
    assert!(mock.requests()[2].prompt.contains("[Angel]: fixed A"));
    assert!(alex.thoughts().is_empty());

    let err = alex
        .referee_pick("Found a wallet", &[], &SamplingOverride::none())
        .await
        .unwrap_err();
    assert_eq!(err, PersonalityError::Config(ConfigError::EmptyInput));
}

#[tokio::test]
async fn test_transcript_shows_every_persona() {
    let mock = Arc::new(wallet_backend());
    let mut alex = person_with(&mock, &Arc::new(Metrics::new()));

    alex.answer("Found a wallet").await.unwrap();
    let transcript = alex.transcript();
    assert!(transcript.contains("user: Found a wallet"));
    assert!(transcript.contains("Angel: A-reply"));
    assert!(transcript.contains("Devil: D-reply"));
    assert!(transcript.contains("Alex: chosen: A-reply"));
}
