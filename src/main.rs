mod answer;
mod cipher;
mod config;
mod dispatch;
mod lyrics;
mod provider;
mod registry;

use std::io::BufRead;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use answer::{Answer, AnswerKind, RenderAs};
use config::Config;
use dispatch::AnswerDispatcher;
use lyrics::LyricsSearchEngine;
use provider::AnswerProvider;
use registry::ModuleRegistry;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lyrabot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("lyrabot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("starting lyrabot");
    info!("loaded config from {config_path}");

    if let Err(e) = std::fs::write(
        config.data_dir.join("lyrabot.pid"),
        std::process::id().to_string(),
    ) {
        warn!("failed to write pid file: {e}");
    }

    // Ordered by priority.
    let providers: Vec<Box<dyn AnswerProvider>> =
        vec![Box::new(LyricsSearchEngine::new(&config))];

    let registry = match ModuleRegistry::load(providers) {
        Ok(registry) => registry,
        Err(e) => {
            error!("startup failed: {e}");
            std::process::exit(1);
        }
    };
    let dispatcher = AnswerDispatcher::new(registry);

    info!("ready, reading messages from stdin");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("stdin read failed: {e}");
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() || !wants_attention(text, &config) {
            continue;
        }

        let preview: String = text.chars().take(100).collect();
        info!("message: \"{preview}\"");

        if let Some(answer) = dispatcher.dispatch(text) {
            deliver(&answer);
        }
    }
}

/// The bot only listens when called by name or given a command.
fn wants_attention(text: &str, config: &Config) -> bool {
    text.to_lowercase().contains(&config.wake_word)
        || text.chars().next() == Some(config.command_prefix)
}

/// Stand-in for the message-sending collaborator: renders the answer on
/// stdout according to its kind and formatting.
fn deliver(answer: &Answer) {
    match (answer.kind, answer.render_as) {
        (AnswerKind::Sticker, _) => println!("[sticker] {}", answer.content),
        (AnswerKind::Message, RenderAs::Markdown) => println!("[markdown] {}", answer.content),
        (AnswerKind::Message, RenderAs::PlainText) => println!("{}", answer.content),
    }
}
