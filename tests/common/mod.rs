//! Scripted capabilities shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use babeltalk::core::{ConversationLog, ConversationSession, EventSink, RetryPolicy, TurnPipeline};
use babeltalk::domain::lookup_language;
use babeltalk::{
    Capture, CaptureError, Language, PartyId, SessionEvent, Synthesize, SynthesisError, Transcript,
    Translate, TranslateError, VoiceEntry,
};

/// Fail the test instead of hanging
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out waiting for the session")
}

pub fn english() -> Language {
    lookup_language("english").unwrap()
}

pub fn tamil() -> Language {
    lookup_language("tamil").unwrap()
}

pub fn default_catalog() -> Vec<VoiceEntry> {
    vec![
        VoiceEntry::new("af", "Afrikaans"),
        VoiceEntry::new("en", "English"),
        VoiceEntry::new("ta", "Tamil"),
    ]
}

/// Capture that replays a script, then parks until released.
///
/// When the script runs out it signals `exhausted` and waits on `release`;
/// after release it reports unrecognized speech.
#[derive(Default)]
pub struct ScriptedCapture {
    script: Mutex<VecDeque<Result<String, CaptureError>>>,
    calls: Mutex<Vec<String>>,
    pub exhausted: Notify,
    pub release: Notify,
}

impl ScriptedCapture {
    pub fn new(script: Vec<Result<String, CaptureError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Language codes `listen` was called with, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Capture for ScriptedCapture {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn listen(&self, language_code: &str) -> Result<String, CaptureError> {
        self.calls.lock().unwrap().push(language_code.to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                self.exhausted.notify_one();
                self.release.notified().await;
                Err(CaptureError::UnrecognizedSpeech)
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Translator backed by a lookup table
#[derive(Default)]
pub struct TableTranslator {
    table: HashMap<String, String>,
    fail_on: Option<String>,
    cancel_on_call: Option<CancellationToken>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl TableTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, text: &str, translated: &str) -> Self {
        self.table.insert(text.to_string(), translated.to_string());
        self
    }

    /// Fail whenever `text` is translated
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Cancel `token` from inside every translation
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    /// `(text, source, target)` of every call, in order
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Translate for TableTranslator {
    fn name(&self) -> &str {
        "table"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError> {
        self.calls.lock().unwrap().push((
            text.to_string(),
            source_language.to_string(),
            target_language.to_string(),
        ));

        if let Some(ref token) = self.cancel_on_call {
            token.cancel();
        }

        if self.fail_on.as_deref() == Some(text) {
            return Err(TranslateError::ServiceUnavailable("offline".to_string()));
        }

        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("{}:{}", target_language, text)))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Synthesizer that records what it was asked to say
pub struct RecordingSynthesizer {
    catalog: Result<Vec<VoiceEntry>, SynthesisError>,
    fail_speak: bool,
    gated: bool,
    spoken: Mutex<Vec<(String, String)>>,
    /// Signalled when a gated `speak` begins
    pub speaking: Notify,
    /// Lets a gated `speak` finish
    pub release: Notify,
}

impl RecordingSynthesizer {
    pub fn new(catalog: Vec<VoiceEntry>) -> Self {
        Self {
            catalog: Ok(catalog),
            fail_speak: false,
            gated: false,
            spoken: Mutex::new(Vec::new()),
            speaking: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn broken_catalog() -> Self {
        Self {
            catalog: Err(SynthesisError::Catalog("espeak not found".to_string())),
            ..Self::new(Vec::new())
        }
    }

    /// Every `speak` fails
    pub fn failing(mut self) -> Self {
        self.fail_speak = true;
        self
    }

    /// Every `speak` waits for `release`
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// `(text, voice_id)` of every call, in order
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesize for RecordingSynthesizer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn voices(&self) -> Result<Vec<VoiceEntry>, SynthesisError> {
        // Enumeration is I/O in real synthesizers; let other tasks run
        tokio::task::yield_now().await;
        self.catalog.clone()
    }

    async fn speak(&self, text: &str, voice_id: &str) -> Result<(), SynthesisError> {
        if self.gated {
            self.speaking.notify_one();
            self.release.notified().await;
        }

        if self.fail_speak {
            return Err(SynthesisError::Playback("no audio device".to_string()));
        }

        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
    /// Signalled on every `on_turn_failed`
    pub failed: Notify,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Speakers of every `TurnStarted`, in order
    pub fn prompted(&self) -> Vec<PartyId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::TurnStarted { speaker } => Some(speaker),
                _ => None,
            })
            .collect()
    }

    pub fn transcripts(&self) -> Vec<Transcript> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Transcript(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventSink for RecordingSink {
    fn on_turn_started(&self, speaker: PartyId) {
        self.push(SessionEvent::TurnStarted { speaker });
    }

    fn on_transcript(&self, transcript: &Transcript) {
        self.push(SessionEvent::Transcript(transcript.clone()));
    }

    fn on_turn_failed(&self, speaker: PartyId, description: &str) {
        self.push(SessionEvent::TurnFailed {
            speaker,
            description: description.to_string(),
        });
        self.failed.notify_one();
    }

    fn on_session_stopped(&self) {
        self.push(SessionEvent::SessionStopped);
    }
}

/// A session wired to scripted capabilities
pub struct Harness {
    pub capture: Arc<ScriptedCapture>,
    pub translator: Arc<TableTranslator>,
    pub synthesizer: Arc<RecordingSynthesizer>,
    pub sink: Arc<RecordingSink>,
    pub session: ConversationSession,
}

impl Harness {
    /// english ⇄ tamil with the default catalog and immediate retries
    pub fn new(script: Vec<Result<String, CaptureError>>) -> Self {
        Self::with(
            script,
            TableTranslator::new(),
            RecordingSynthesizer::new(default_catalog()),
            RetryPolicy::immediate(),
        )
    }

    pub fn with(
        script: Vec<Result<String, CaptureError>>,
        translator: TableTranslator,
        synthesizer: RecordingSynthesizer,
        retry_policy: RetryPolicy,
    ) -> Self {
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
        let session =
            ConversationSession::new(pipeline, english(), tamil()).with_retry_policy(retry_policy);

        Self {
            capture,
            translator,
            synthesizer,
            sink,
            session,
        }
    }

    /// Wait for the script to run out, then stop and drain the session
    pub async fn stop_when_exhausted(&self) {
        within(self.capture.exhausted.notified()).await;
        assert!(self.session.stop());
        self.capture.release.notify_one();
        within(self.session.wait_idle()).await;
    }

    /// Assert `SessionStopped` is the final event and appears once per run
    pub fn assert_stopped_last(&self, runs: usize) {
        let events = self.sink.events();
        assert_eq!(events.last(), Some(&SessionEvent::SessionStopped));
        let stops = events
            .iter()
            .filter(|e| **e == SessionEvent::SessionStopped)
            .count();
        assert_eq!(stops, runs);
    }
}
