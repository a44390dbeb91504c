mod command;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use mitra_dialogue::{
    Attachment, DialogueError, DialogueSession, Message, Preset, Role, Script, TranscriptEvent,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter,
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::command::{Command, HELP};

#[derive(Debug, Parser)]
#[command(name = "mitra-chat", version, about = "Chat with the KhedutMitra farming assistant")]
struct Args {
    /// Bundled script: advisor or profile
    #[arg(long, default_value = "advisor", value_parser = parse_preset)]
    preset: Preset,

    /// Script file to use instead of a bundled preset
    #[arg(long)]
    script: Option<PathBuf>,

    /// Open the conversation with a prompt handed over from another screen
    #[arg(long)]
    prompt: Option<String>,
}

fn parse_preset(name: &str) -> Result<Preset, String> {
    Preset::from_name(name).ok_or_else(|| {
        let known: Vec<_> = Preset::ALL.iter().map(|p| p.name()).collect();
        format!("unknown preset '{name}', expected one of: {}", known.join(", "))
    })
}

/// `RUST_LOG`, when set, replaces the default per-crate levels.
fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(fmt_layer);

    let _ = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => registry.with(env_filter).try_init(),
        Err(_) => registry.with(default_filter()).try_init(),
    };
}

fn default_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("mitra_chat", LevelFilter::INFO)
        .with_target("mitra_dialogue", LevelFilter::INFO)
}

fn load_script(args: &Args) -> anyhow::Result<Script> {
    match &args.script {
        Some(path) => Script::load(path)
            .with_context(|| format!("Failed to load script {}", path.display())),
        None => args
            .preset
            .script()
            .with_context(|| format!("Bundled preset '{}' is invalid", args.preset.name())),
    }
}

fn render(message: &Message) {
    match message.role() {
        Role::Assistant => {
            println!("\n🤖 {}", message.text());
            if let Some(classification) = message.classification() {
                debug!(
                    label = %classification.label,
                    confidence = classification.confidence,
                    "Analysis delivered"
                );
            }
        }
        Role::User => match message.attachment() {
            Some(attachment) => println!("🧑 {} [{}]", message.text(), attachment.reference()),
            None => println!("🧑 {}", message.text()),
        },
    }
}

/// Prints assistant turns as they are delivered.
fn spawn_renderer(session: &DialogueSession) -> tokio::task::JoinHandle<()> {
    let mut event_rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(TranscriptEvent::MessageAppended(message)) if message.role() == Role::Assistant => {
                    render(&message);
                }
                Ok(TranscriptEvent::Busy) => println!("…thinking"),
                Ok(TranscriptEvent::Disposed) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
}

fn submit(session: &DialogueSession, command: Command) -> Result<(), DialogueError> {
    match command {
        Command::Say(text) => session.submit(&text),
        Command::Scan(reference) => session.submit_image(Attachment::new(reference)),
        _ => Ok(()),
    }
}

/// Blank prompts are not handed over.
fn handoff_prompt(args: &Args) -> Option<&str> {
    args.prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
}

/// Reads commands until `/quit` or end of input. Failed submissions are
/// reported and the loop keeps going.
async fn run<R>(session: &DialogueSession, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        let command = Command::parse(&line);
        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Suggestions => {
                for suggestion in session.suggestions() {
                    println!("  • {suggestion}");
                }
            }
            Command::Transcript => {
                for message in session.transcript() {
                    render(&message);
                }
            }
            Command::Unknown(name) => println!("Unknown command /{name}. Try /help."),
            command @ (Command::Say(_) | Command::Scan(_)) => match submit(session, command) {
                Ok(()) => session.wait_idle().await?,
                Err(err) if err.is_rejection() => debug!("Submission ignored: {err}"),
                Err(err) => {
                    warn!("Submission failed: {err}");
                    println!("⚠️  {err}");
                }
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let script = Arc::new(load_script(&args)?);
    info!(
        rules = script.rules().len(),
        fallbacks = script.fallbacks().len(),
        "Dialogue script loaded"
    );

    let session = DialogueSession::new(script);
    for message in session.transcript() {
        render(&message);
    }
    let renderer = spawn_renderer(&session);

    if let Some(prompt) = handoff_prompt(&args) {
        session.submit_handoff(prompt)?;
        session.wait_idle().await?;
    }

    run(&session, BufReader::new(tokio::io::stdin())).await?;

    session.dispose();
    renderer.await.context("Renderer task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(preset: Preset) -> DialogueSession {
        DialogueSession::new(Arc::new(preset.script().unwrap()))
    }

    #[test]
    fn default_filter_levels() {
        use tracing::Level;

        let filter = default_filter();
        assert!(filter.would_enable("mitra_dialogue::session", &Level::INFO));
        assert!(!filter.would_enable("mitra_dialogue::session", &Level::DEBUG));
        assert!(filter.would_enable("mitra_chat", &Level::INFO));
        assert!(!filter.would_enable("tokio", &Level::INFO));
        assert!(filter.would_enable("tokio", &Level::WARN));
    }

    #[test]
    fn blank_prompt_is_not_handed_over() {
        let args = Args::parse_from(["mitra-chat", "--prompt", "   "]);
        assert_eq!(handoff_prompt(&args), None);

        let args = Args::parse_from(["mitra-chat", "--prompt", " Ask about cotton "]);
        assert_eq!(handoff_prompt(&args), Some("Ask about cotton"));

        let args = Args::parse_from(["mitra-chat"]);
        assert_eq!(handoff_prompt(&args), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scan_keeps_the_chat_running() {
        let session = session(Preset::Profile);
        let input: &[u8] = b"/scan leaf.jpg\nhello\n";

        run(&session, input).await.unwrap();

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].text(), "hello");
        assert_eq!(transcript[2].role(), Role::Assistant);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_reading() {
        let session = session(Preset::Advisor);
        let input: &[u8] = b"/quit\nhello\n";

        run(&session, input).await.unwrap();
        assert_eq!(session.message_count(), 1);
    }
}
