//! Turn Pipeline Integration Tests
//!
//! Single turns run directly, without a session loop.

mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use babeltalk::core::{ConversationLog, RetryPolicy, TurnError, TurnOutcome, TurnPipeline};
use babeltalk::{CaptureError, Party, PartyId, SessionEvent, SynthesisError, Transcript};

use common::{
    default_catalog, english, tamil, RecordingSink, RecordingSynthesizer, ScriptedCapture,
    TableTranslator,
};

struct Rig {
    capture: Arc<ScriptedCapture>,
    translator: Arc<TableTranslator>,
    synthesizer: Arc<RecordingSynthesizer>,
    sink: Arc<RecordingSink>,
    pipeline: TurnPipeline,
}

fn rig(
    script: Vec<Result<String, CaptureError>>,
    translator: TableTranslator,
    synthesizer: RecordingSynthesizer,
) -> Rig {
    let capture = Arc::new(ScriptedCapture::new(script));
    let translator = Arc::new(translator);
    let synthesizer = Arc::new(synthesizer);
    let sink = Arc::new(RecordingSink::default());
    let pipeline = TurnPipeline::new(
        capture.clone(),
        translator.clone(),
        synthesizer.clone(),
        sink.clone(),
        ConversationLog::new(),
    );

    Rig {
        capture,
        translator,
        synthesizer,
        sink,
        pipeline,
    }
}

fn parties() -> (Party, Party) {
    (
        Party::new(PartyId::First, english(), "en"),
        Party::new(PartyId::Second, tamil(), "ta"),
    )
}

#[tokio::test]
async fn test_turn_advances_after_speaking() {
    let rig = rig(
        vec![Ok("good morning".to_string())],
        TableTranslator::new().with_entry("good morning", "காலை வணக்கம்"),
        RecordingSynthesizer::new(default_catalog()),
    );
    let (speaker, listener) = parties();

    let outcome = rig
        .pipeline
        .run_turn(&speaker, &listener, &CancellationToken::new())
        .await;

    let expected = Transcript::new(PartyId::First, "good morning", "காலை வணக்கம்");
    assert_eq!(outcome, TurnOutcome::Advance(expected.clone()));
    assert_eq!(
        rig.sink.events(),
        vec![
            SessionEvent::TurnStarted { speaker: PartyId::First },
            SessionEvent::Transcript(expected.clone()),
        ]
    );
    assert_eq!(
        rig.synthesizer.spoken(),
        vec![("காலை வணக்கம்".to_string(), "ta".to_string())]
    );

    let last = rig.pipeline.log().last_from(PartyId::First).unwrap();
    assert_eq!(last.transcript, expected);
    assert!(rig.pipeline.log().last_from(PartyId::Second).is_none());
}

#[tokio::test]
async fn test_reverse_direction_uses_first_voice() {
    let rig = rig(
        vec![Ok("நன்றி".to_string())],
        TableTranslator::new().with_entry("நன்றி", "thank you"),
        RecordingSynthesizer::new(default_catalog()),
    );
    let (first, second) = parties();

    let outcome = rig
        .pipeline
        .run_turn(&second, &first, &CancellationToken::new())
        .await;

    assert!(matches!(outcome, TurnOutcome::Advance(_)));
    assert_eq!(rig.capture.calls(), vec!["ta"]);
    assert_eq!(
        rig.translator.calls(),
        vec![("நன்றி".to_string(), "ta".to_string(), "en".to_string())]
    );
    assert_eq!(
        rig.synthesizer.spoken(),
        vec![("thank you".to_string(), "en".to_string())]
    );
}

#[tokio::test]
async fn test_capture_failures_map_to_retry() {
    let rig = rig(
        vec![
            Err(CaptureError::UnrecognizedSpeech),
            Err(CaptureError::ServiceUnavailable("timeout".to_string())),
        ],
        TableTranslator::new(),
        RecordingSynthesizer::new(default_catalog()),
    );
    let (speaker, listener) = parties();
    let cancel = CancellationToken::new();

    let first = rig.pipeline.run_turn(&speaker, &listener, &cancel).await;
    let second = rig.pipeline.run_turn(&speaker, &listener, &cancel).await;

    assert_eq!(first, TurnOutcome::Retry(TurnError::UnrecognizedSpeech));
    assert_eq!(
        second,
        TurnOutcome::Retry(TurnError::RecognitionServiceUnavailable(
            "timeout".to_string()
        ))
    );
    assert!(rig.translator.calls().is_empty());
    assert!(rig.pipeline.log().is_empty());
}

#[tokio::test]
async fn test_playback_failure_keeps_logged_transcript() {
    let rig = rig(
        vec![Ok("hello".to_string())],
        TableTranslator::new(),
        RecordingSynthesizer::new(default_catalog()).failing(),
    );
    let (speaker, listener) = parties();

    let outcome = rig
        .pipeline
        .run_turn(&speaker, &listener, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        TurnOutcome::Retry(TurnError::Synthesis(SynthesisError::Playback(
            "no audio device".to_string()
        )))
    );
    assert_eq!(rig.pipeline.log().len(), 1);
}

#[tokio::test]
async fn test_cancelled_before_listen_returns_reports_nothing() {
    let rig = rig(
        vec![Err(CaptureError::UnrecognizedSpeech)],
        TableTranslator::new(),
        RecordingSynthesizer::new(default_catalog()),
    );
    let (speaker, listener) = parties();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = rig.pipeline.run_turn(&speaker, &listener, &cancel).await;

    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert_eq!(
        rig.sink.events(),
        vec![SessionEvent::TurnStarted { speaker: PartyId::First }]
    );
    assert!(rig.translator.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_during_translation_skips_speaking() {
    let cancel = CancellationToken::new();
    let rig = rig(
        vec![Ok("hello".to_string())],
        TableTranslator::new().cancelling(cancel.clone()),
        RecordingSynthesizer::new(default_catalog()),
    );
    let (speaker, listener) = parties();

    let outcome = rig.pipeline.run_turn(&speaker, &listener, &cancel).await;

    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert_eq!(rig.sink.transcripts().len(), 1);
    assert_eq!(rig.pipeline.log().len(), 1);
    assert!(rig.synthesizer.spoken().is_empty());
}

#[test]
fn test_default_backoff_is_bounded() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for_attempt(1).as_millis(), 250);
    assert_eq!(policy.delay_for_attempt(30).as_millis(), 5000);
}
