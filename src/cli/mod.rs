//! Command-line interface for babeltalk.
//!
//! Provides commands for holding a conversation in the terminal, listing
//! languages and voices, and checking the local speech tools.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    Capture, EspeakSynthesizer, GoogleTranslator, Synthesize, Translate, WhisperCapture,
};
use crate::config::{self, parse_language, ResolvedConfig};
use crate::core::{resolve_voice, ConversationLog, ConversationSession, EventSink, TurnPipeline};
use crate::domain::{idle_prompt, supported_languages, PartyId, Transcript};

/// Width used to right-align the second party's lines
const LINE_WIDTH: usize = 80;

/// babeltalk - Spoken two-way translation
#[derive(Parser, Debug)]
#[command(name = "babeltalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hold a conversation (Ctrl-C to stop)
    Talk {
        /// Language of the first person (e.g. "english")
        #[arg(short, long)]
        first: Option<String>,

        /// Language of the second person (e.g. "tamil")
        #[arg(short, long)]
        second: Option<String>,
    },

    /// List supported languages
    Languages {
        /// Only show languages containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List installed voices
    Voices {
        /// Show which voice would be used for this language
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Check that the recorder, recognizer, translator and synthesizer work
    Check,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Talk { first, second } => talk(first, second).await,
            Commands::Languages { filter } => list_languages(filter),
            Commands::Voices { language } => list_voices(language).await,
            Commands::Config => show_config(),
            Commands::Check => check().await,
        }
    }
}

/// Prints session progress to the terminal
struct TerminalSink;

impl EventSink for TerminalSink {
    fn on_turn_started(&self, speaker: PartyId) {
        println!();
        println!("🎤 {}", speaker.prompt());
    }

    fn on_transcript(&self, transcript: &Transcript) {
        let line = transcript.display_line();
        match transcript.speaker {
            PartyId::First => println!("{}", line),
            PartyId::Second => println!("{:>width$}", line, width = LINE_WIDTH),
        }
    }

    fn on_turn_failed(&self, _speaker: PartyId, description: &str) {
        eprintln!("⚠️  {}", description);
    }

    fn on_session_stopped(&self) {
        println!();
        println!("Conversation stopped");
    }
}

fn build_capture(config: &ResolvedConfig) -> WhisperCapture {
    WhisperCapture::new(config.capture.clone())
}

fn build_translator(config: &ResolvedConfig) -> Result<GoogleTranslator> {
    GoogleTranslator::new(config.translation.endpoint.clone(), config.translation.timeout)
}

fn build_synthesizer(config: &ResolvedConfig) -> EspeakSynthesizer {
    match config.speech_binary {
        Some(ref binary) => EspeakSynthesizer::with_binary_path(binary.clone(), config.speech.clone()),
        None => EspeakSynthesizer::new(config.speech.clone()),
    }
}

/// Run a conversation until Ctrl-C
async fn talk(first: Option<String>, second: Option<String>) -> Result<()> {
    let config = config::config()?;

    let first = match first {
        Some(name) => parse_language(&name)?,
        None => config.first_language.clone(),
    };
    let second = match second {
        Some(name) => parse_language(&name)?,
        None => config.second_language.clone(),
    };

    let pipeline = TurnPipeline::new(
        Arc::new(build_capture(config)),
        Arc::new(build_translator(config)?),
        Arc::new(build_synthesizer(config)),
        Arc::new(TerminalSink),
        ConversationLog::new(),
    );

    let session = ConversationSession::new(pipeline, first.clone(), second.clone())
        .with_retry_policy(config.retry.clone());

    println!();
    println!("BABEL TALK  {}  ⇄  {}", first, second);
    println!("══════════════════════════════════════════════════════════════");

    session
        .start()
        .await
        .context("Could not start the conversation")?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            println!();
            println!("Stopping after the current step...");
            session.stop();
        }
        _ = session.wait_idle() => {}
    }

    if session.state().is_active() {
        session.wait_idle().await;
    }

    println!("{}", idle_prompt(session.log().is_empty()));
    Ok(())
}

/// List supported languages
fn list_languages(filter: Option<String>) -> Result<()> {
    let filter = filter.map(|f| f.to_lowercase());

    let languages: Vec<_> = supported_languages()
        .into_iter()
        .filter(|l| filter.as_ref().map_or(true, |f| l.label.contains(f.as_str())))
        .collect();

    if languages.is_empty() {
        println!("No languages found.");
        return Ok(());
    }

    println!("{:<28} CODE", "LANGUAGE");
    println!("{}", "-".repeat(40));
    for language in &languages {
        println!("{:<28} {}", language.label, language.code);
    }
    println!();
    println!("{} language(s)", languages.len());

    Ok(())
}

/// List installed voices, optionally resolving one language
async fn list_voices(language: Option<String>) -> Result<()> {
    let config = config::config()?;
    let synthesizer = build_synthesizer(config);

    let catalog = synthesizer
        .voices()
        .await
        .context("Failed to list voices")?;

    if let Some(name) = language {
        let language = parse_language(&name)?;
        let voice = resolve_voice(&catalog, &language.label)?;
        println!(
            "{} → {} ({})",
            language, voice.display_name, voice.voice_id
        );
        return Ok(());
    }

    println!("{:<16} {:<32} LANGUAGES", "VOICE", "NAME");
    println!("{}", "-".repeat(70));
    for voice in &catalog {
        println!(
            "{:<16} {:<32} {}",
            voice.voice_id,
            voice.display_name,
            voice.languages.join(", ")
        );
    }
    println!();
    println!("{} voice(s) via {}", catalog.len(), synthesizer.binary_path());

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!();
    println!("babeltalk Configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    match config.config_file {
        Some(ref path) => println!("Config file:     {}", path.display()),
        None => println!("Config file:     (none, using defaults)"),
    }
    println!();
    println!("First language:  {} ({})", config.first_language, config.first_language.code);
    println!("Second language: {} ({})", config.second_language, config.second_language.code);
    println!();
    println!("Recorder:        {}", config.capture.recorder_path);
    println!("Whisper:         {} (model {})", config.capture.whisper_path, config.capture.model);
    println!("Silence:         {:.1}s", config.capture.silence_seconds);
    println!("Max utterance:   {}s", config.capture.max_utterance_seconds);
    println!("Translator:      {}", config.translation.endpoint);
    println!(
        "Speech:          {} wpm, volume {:.1}{}",
        config.speech.rate,
        config.speech.volume,
        config
            .speech_binary
            .as_ref()
            .map(|b| format!(" via {}", b))
            .unwrap_or_default()
    );
    println!(
        "Retry back-off:  {}ms → {}ms (x{})",
        config.retry.initial_delay_ms, config.retry.max_delay_ms, config.retry.backoff_multiplier
    );

    Ok(())
}

/// Run every adapter's health check
async fn check() -> Result<()> {
    let config = config::config()?;

    let capture = build_capture(config);
    let translator = build_translator(config)?;
    let synthesizer = build_synthesizer(config);

    let results = [
        (capture.name().to_string(), capture.health_check().await),
        (translator.name().to_string(), translator.health_check().await),
        (synthesizer.name().to_string(), synthesizer.health_check().await),
    ];

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(()) => println!("✓ {}", name),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {:#}", name, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} check(s) failed", failed);
    }

    Ok(())
}
