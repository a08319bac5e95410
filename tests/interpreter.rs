//! Interpreter integration tests
//!
//! Drives whole turns through scripted capture and recording speech fakes.

use std::sync::Arc;
use std::time::Duration;

use voice_commands::chain::ChainRegistry;
use voice_commands::interpreter::Step;
use voice_commands::voice::CaptureOutcome;
use voice_commands::{
    Action, Binding, CommandTable, CycleOutcome, Interpreter, InterpreterState, Scenario,
    SpeechFeedback, TurnOutcome,
};

mod common;

use common::{
    Events, RecordingAction, RecordingScenario, RecordingStatus, RecordingSynth, ScriptedCapture,
    archive_chain, failure, harness, heard, no_speech,
};

fn scenario(events: &Events, name: &str) -> Arc<dyn Scenario> {
    Arc::new(
        RecordingScenario::new(events, name, &format!("starting {name}"), &format!("{name} done"))
            .with_delay(Duration::from_millis(20)),
    )
}

/// The demo vocabulary, in evaluation order
fn demo_table(events: &Events) -> CommandTable {
    let login = scenario(events, "login");
    let vapormax = scenario(events, "vapormax");
    let price_point = scenario(events, "price-point");

    CommandTable::new()
        .with(
            Binding::tokens(
                "demo",
                ["hackathon", "demo"],
                Action::Sequence(vec![login.clone(), vapormax.clone(), price_point.clone()]),
            )
            .unwrap(),
        )
        .unwrap()
        .with(Binding::tokens("login", ["log", "me", "in"], Action::Scenario(login)).unwrap())
        .unwrap()
        .with(
            Binding::tokens(
                "vapormax",
                ["fall", "19", "vapormax", "line"],
                Action::Scenario(vapormax),
            )
            .unwrap(),
        )
        .unwrap()
        .with(
            Binding::tokens("price-point", ["price", "point"], Action::Scenario(price_point))
                .unwrap(),
        )
        .unwrap()
        .with(
            Binding::tokens(
                "logout",
                ["log", "me", "out"],
                Action::Scenario(scenario(events, "logout")),
            )
            .unwrap(),
        )
        .unwrap()
        .with(
            Binding::tokens("archive", ["archive"], Action::Chain("archive".to_string()))
                .unwrap(),
        )
        .unwrap()
}

fn completed(name: &str) -> CycleOutcome {
    CycleOutcome::Completed {
        scenario: name.to_string(),
        result: format!("{name} done"),
    }
}

#[tokio::test]
async fn test_log_me_in_runs_login_cycle() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("Log me in")]);

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Scenario {
            binding: "login".to_string(),
            cycle: completed("login"),
        }
    );
    assert_eq!(events.spoken(), vec!["starting login", "login done"]);
    assert_eq!(
        events.statuses(),
        vec!["Listening...", "", "starting login", ""]
    );
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_feedback_overlaps_execution_and_result_follows() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("log me in")]);

    h.interpreter.run_turn().await;

    let feedback = events.position("say:starting login").unwrap();
    let started = events.position("exec:login").unwrap();
    let finished = events.position("done:login").unwrap();
    let result = events.position("say:login done").unwrap();

    assert!(started < finished);
    assert!(feedback < finished);
    assert!(finished < result);
}

#[tokio::test]
async fn test_extra_words_still_match() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action),
        [heard("Show me the PRICE POINT please")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Scenario {
            binding: "price-point".to_string(),
            cycle: completed("price-point"),
        }
    );
}

#[tokio::test]
async fn test_log_me_out_is_not_log_me_in() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("log me out")]);

    let outcome = h.interpreter.run_turn().await;

    assert!(matches!(outcome, TurnOutcome::Scenario { ref binding, .. } if binding == "logout"));
    assert!(events.position("exec:login").is_none());
}

#[tokio::test]
async fn test_demo_runs_members_in_order() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action),
        [heard("log me in to the hackathon demo")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Sequence {
            binding: "demo".to_string(),
            cycles: vec![completed("login"), completed("vapormax"), completed("price-point")],
        }
    );
    assert_eq!(
        events.spoken(),
        vec![
            "starting login",
            "login done",
            "starting vapormax",
            "vapormax done",
            "starting price-point",
            "price-point done",
        ]
    );

    // Each member starts only after the previous result was spoken
    assert!(events.position("say:login done").unwrap() < events.position("exec:vapormax").unwrap());
    assert!(
        events.position("say:vapormax done").unwrap()
            < events.position("exec:price-point").unwrap()
    );
}

#[tokio::test]
async fn test_sequence_continues_after_failure() {
    let events = Events::default();
    let broken: Arc<dyn Scenario> = Arc::new(RecordingScenario::failing(&events, "broken", "trying"));
    let table = CommandTable::new()
        .with(
            Binding::tokens(
                "demo",
                ["demo"],
                Action::Sequence(vec![scenario(&events, "first"), broken, scenario(&events, "last")]),
            )
            .unwrap(),
        )
        .unwrap();
    let mut h = harness(&events, table, ChainRegistry::new(), [heard("demo")]);

    let TurnOutcome::Sequence { cycles, .. } = h.interpreter.run_turn().await else {
        panic!("expected a sequence");
    };

    let names: Vec<_> = cycles.iter().map(CycleOutcome::scenario).collect();
    assert_eq!(names, vec!["first", "broken", "last"]);
    assert!(cycles[0].is_completed());
    assert!(!cycles[1].is_completed());
    assert!(cycles[2].is_completed());
    assert_eq!(
        events.spoken(),
        vec!["starting first", "first done", "trying", "starting last", "last done"]
    );
}

#[tokio::test]
async fn test_sequence_waits_before_each_member() {
    let events = Events::default();
    let table = CommandTable::new()
        .with(
            Binding::tokens(
                "demo",
                ["demo"],
                Action::Sequence(vec![scenario(&events, "a"), scenario(&events, "b")]),
            )
            .unwrap(),
        )
        .unwrap();
    let mut h = harness(&events, table, ChainRegistry::new(), [heard("demo")]);
    h.interpreter = h.interpreter.with_settings(voice_commands::DialogueSettings {
        sequence_delay: Duration::from_millis(50),
        ..voice_commands::DialogueSettings::default()
    });

    let started = std::time::Instant::now();
    h.interpreter.run_turn().await;

    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_unmatched_transcript_is_echoed() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("Hello There")]);

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Echoed {
            transcript: "Hello There".to_string()
        }
    );
    assert_eq!(events.spoken(), vec!["Hello There"]);
    assert_eq!(events.statuses(), vec!["Listening...", "", "Hello There"]);
    assert!(events.all().iter().all(|e| !e.starts_with("exec:")));
}

#[tokio::test]
async fn test_archive_confirmed() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("Archive the file"), heard("Yes please")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Confirmed {
            kind: "archive".to_string()
        }
    );
    assert_eq!(
        events.spoken(),
        vec!["Archive the file. Proceed?", "proceeding"]
    );
    assert_eq!(
        action.payloads(),
        vec![serde_json::json!({ "request": "Archive the file" })]
    );
    assert!(events.position("say:proceeding").unwrap() < events.position("act:archive").unwrap());
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
    assert_eq!(h.capture.remaining(), 0);
}

#[tokio::test]
async fn test_archive_canceled() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), heard("no")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Canceled {
            kind: "archive".to_string()
        }
    );
    assert_eq!(events.spoken(), vec!["archive the file. Proceed?", "canceled"]);
    assert!(action.payloads().is_empty());
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
    assert_eq!(events.statuses().last().map(String::as_str), Some(""));
}

#[tokio::test]
async fn test_pending_answer_bypasses_table() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action),
        [heard("archive the file"), heard("log me in")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert!(matches!(outcome, TurnOutcome::Canceled { .. }));
    assert!(events.position("exec:login").is_none());
}

#[tokio::test]
async fn test_no_speech_keeps_pending_chain() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), no_speech(), heard("proceed")],
    );

    let first = h.interpreter.run_turn().await;
    assert_eq!(first, TurnOutcome::RetryRequested);
    assert_eq!(
        h.interpreter.state(),
        InterpreterState::Awaiting {
            kind: "archive".to_string(),
            step: 2
        }
    );
    assert_eq!(
        events.spoken(),
        vec!["archive the file. Proceed?", "Sorry. Try again."]
    );

    let second = h.interpreter.run_turn().await;
    assert_eq!(
        second,
        TurnOutcome::Confirmed {
            kind: "archive".to_string()
        }
    );
    assert_eq!(action.payloads().len(), 1);
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_interpret_answers_the_pending_chain() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), no_speech()],
    );

    assert_eq!(h.interpreter.run_turn().await, TurnOutcome::RetryRequested);

    let step = h.interpreter.interpret("log me in", None).await;

    assert_eq!(
        step,
        Step::Done(TurnOutcome::Canceled {
            kind: "archive".to_string()
        })
    );
    assert!(events.position("exec:login").is_none());
    assert!(action.payloads().is_empty());
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_process_without_context_answers_the_pending_chain() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), no_speech()],
    );

    assert_eq!(h.interpreter.run_turn().await, TurnOutcome::RetryRequested);

    let step = h
        .interpreter
        .process(CaptureOutcome {
            result: Ok("proceed".to_string()),
            context: None,
        })
        .await;

    assert_eq!(
        step,
        Step::Done(TurnOutcome::Confirmed {
            kind: "archive".to_string()
        })
    );
    assert_eq!(action.payloads().len(), 1);
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_blank_transcript_asks_to_retry() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("   ")]);

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(outcome, TurnOutcome::RetryRequested);
    assert_eq!(events.spoken(), vec!["Sorry. Try again."]);
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_blank_transcript_keeps_pending_chain() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), heard(""), heard("proceed")],
    );

    assert_eq!(h.interpreter.run_turn().await, TurnOutcome::RetryRequested);
    assert_eq!(
        h.interpreter.state(),
        InterpreterState::Awaiting {
            kind: "archive".to_string(),
            step: 2
        }
    );

    assert_eq!(
        h.interpreter.run_turn().await,
        TurnOutcome::Confirmed {
            kind: "archive".to_string()
        }
    );
    assert_eq!(action.payloads().len(), 1);
}

#[tokio::test]
async fn test_failure_cancels_pending_chain() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action.clone()),
        [heard("archive the file"), failure("network")],
    );

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::Canceled {
            kind: "archive".to_string()
        }
    );
    assert_eq!(events.spoken(), vec!["archive the file. Proceed?"]);
    assert!(action.payloads().is_empty());
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
    assert_eq!(events.statuses().last().map(String::as_str), Some(""));
}

#[tokio::test]
async fn test_no_speech_when_idle_asks_to_retry() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [no_speech()]);

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(outcome, TurnOutcome::RetryRequested);
    assert_eq!(events.spoken(), vec!["Sorry. Try again."]);
    assert_eq!(
        events.statuses(),
        vec!["Listening...", "Sorry. Try again.", ""]
    );
    assert_eq!(h.interpreter.state(), InterpreterState::Idle);
}

#[tokio::test]
async fn test_other_failure_when_idle_is_silent() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [failure("network")]);

    let outcome = h.interpreter.run_turn().await;

    assert_eq!(
        outcome,
        TurnOutcome::RecognitionFailed {
            reason: "network".to_string()
        }
    );
    assert!(events.spoken().is_empty());
    assert_eq!(events.statuses(), vec!["Listening...", ""]);
}

#[tokio::test]
async fn test_synthesis_failure_does_not_stall_cycle() {
    let events = Events::default();
    let synth = Arc::new(RecordingSynth::new(&events).failing());
    let capture = Arc::new(ScriptedCapture::new(&events, [heard("log me in")]));
    let action = Arc::new(RecordingAction::new(&events));

    let mut interpreter = Interpreter::new(
        demo_table(&events),
        archive_chain(action),
        capture,
        SpeechFeedback::new(synth),
        Arc::new(RecordingStatus::new(&events)),
    )
    .unwrap();

    let outcome = interpreter.run_turn().await;

    assert!(matches!(
        outcome,
        TurnOutcome::Scenario { cycle: CycleOutcome::Completed { .. }, .. }
    ));
    assert_eq!(events.spoken(), vec!["starting login", "login done"]);
}

#[tokio::test]
async fn test_every_utterance_preempts_the_previous_one() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(
        &events,
        demo_table(&events),
        archive_chain(action),
        [heard("archive the file"), heard("yes")],
    );

    h.interpreter.run_turn().await;

    assert_eq!(h.synth.cancels(), events.spoken().len());
}

#[test]
fn test_unregistered_chain_kind_rejected() {
    let events = Events::default();
    let capture = Arc::new(ScriptedCapture::new(&events, [no_speech()]));
    let synth = Arc::new(RecordingSynth::new(&events));

    let result = Interpreter::new(
        demo_table(&events),
        ChainRegistry::new(),
        capture,
        SpeechFeedback::new(synth),
        Arc::new(RecordingStatus::new(&events)),
    );

    assert!(result.is_err());
}

#[tokio::test]
async fn test_resolved_voice_is_used() {
    let events = Events::default();
    let action = Arc::new(RecordingAction::new(&events));
    let mut h = harness(&events, demo_table(&events), archive_chain(action), [heard("hello")]);

    let voice = h
        .feedback
        .resolve_voice("en-US", 2, Duration::from_millis(1))
        .await;
    assert_eq!(voice.map(|v| v.name), Some("soprano".to_string()));

    h.interpreter.run_turn().await;

    assert_eq!(h.synth.used_voices(), vec![Some("soprano".to_string())]);
}
