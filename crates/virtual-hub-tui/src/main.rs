//! CMC Fellows Virtual Hub - terminal chat client
//!
//! Forwards questions to the hub's answer service and shows the replies with
//! their citation sources.

mod app;
mod handler;
mod tui;
mod ui;

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use virtual_hub_core::config::ENDPOINT_ENV;
use virtual_hub_core::{AnswerSource, Config, ConversationStore, HubClient, Message};

use app::App;
use tui::{EventHandler, Tui};

/// Chat with the CMC Fellows Virtual Hub assistant
#[derive(Parser, Debug)]
#[command(name = "virtual-hub")]
#[command(version, about, long_about = None)]
struct Args {
    /// Answer service base URL (overrides the config file)
    #[arg(short, long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    ask: Option<String>,

    /// Remember the resolved endpoint in the config file
    #[arg(long)]
    save_endpoint: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let one_shot = args.ask.is_some();
    init_tracing(&args, !one_shot)?;

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable config: {}", e);
        Config::new()
    });
    let endpoint = config.resolve_endpoint(args.endpoint.as_deref());
    tracing::info!(%endpoint, "using answer service");

    if args.save_endpoint {
        config.endpoint = Some(endpoint.clone());
        config.save()?;
    }

    let source: Arc<dyn AnswerSource> = Arc::new(HubClient::new(&endpoint));

    match args.ask {
        Some(question) => run_once(source.as_ref(), &question).await,
        None => run_tui(source, endpoint).await,
    }
}

/// Logs go to stderr for one-shot runs and to a file under the config
/// directory while the TUI owns the terminal.
fn init_tracing(args: &Args, to_file: bool) -> Result<()> {
    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else if to_file {
        "info"
    } else {
        "warn" // Quiet by default for one-shot use
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if to_file {
        let log_dir = Config::config_dir()?;
        std::fs::create_dir_all(&log_dir)?;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("virtual-hub.log"))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

async fn run_once(source: &dyn AnswerSource, question: &str) -> Result<()> {
    let mut conversation = ConversationStore::new();
    if !conversation.exchange(source, question).await {
        bail!("question is empty");
    }

    let Some(reply) = conversation.messages().last() else {
        bail!("no reply recorded");
    };
    print_reply(&mut std::io::stdout().lock(), reply)?;

    if *reply == Message::fallback() {
        bail!("answer service unavailable");
    }
    Ok(())
}

/// Reply text followed by its sources, one per line
fn print_reply(out: &mut impl Write, reply: &Message) -> Result<()> {
    writeln!(out, "{}", reply.text)?;
    if !reply.sources.is_empty() {
        writeln!(out)?;
        writeln!(out, "Sources:")?;
        for source in &reply.sources {
            writeln!(out, "  • {}", source)?;
        }
    }
    Ok(())
}

async fn run_tui(source: Arc<dyn AnswerSource>, endpoint: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(source, endpoint).with_notifier(events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if let Some(task) = app.query_task.take() {
        tracing::debug!("dropping in-flight answer request on exit");
        task.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use virtual_hub_core::{Answer, NetworkError, FALLBACK_TEXT};

    struct FixedSource(Option<Answer>);

    #[async_trait]
    impl AnswerSource for FixedSource {
        async fn ask(&self, _question: &str) -> Result<Answer, NetworkError> {
            self.0
                .clone()
                .ok_or_else(|| NetworkError::Interrupted("offline".to_string()))
        }
    }

    fn printed(reply: &Message) -> String {
        let mut out = Vec::new();
        print_reply(&mut out, reply).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_print_reply_lists_sources() {
        let reply = Message::bot(
            "OPT is practical training",
            vec!["opt.pdf".to_string(), "faq.pdf".to_string()],
        );
        assert_eq!(
            printed(&reply),
            "OPT is practical training\n\nSources:\n  • opt.pdf\n  • faq.pdf\n"
        );
    }

    #[test]
    fn test_print_reply_without_sources() {
        assert_eq!(printed(&Message::fallback()), format!("{}\n", FALLBACK_TEXT));
    }

    #[tokio::test]
    async fn test_run_once_succeeds_with_answer() {
        let source = FixedSource(Some(Answer {
            answer: "yes".to_string(),
            sources: Vec::new(),
        }));
        assert!(run_once(&source, "Is CPT allowed?").await.is_ok());
    }

    #[tokio::test]
    async fn test_run_once_fails_on_fallback() {
        let err = run_once(&FixedSource(None), "Is CPT allowed?")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "answer service unavailable");
    }

    #[tokio::test]
    async fn test_run_once_rejects_blank_question() {
        let err = run_once(&FixedSource(None), "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "question is empty");
    }

    #[test]
    fn test_endpoint_flag_parses() {
        let args = Args::try_parse_from(["virtual-hub", "--endpoint", "http://localhost:8000"])
            .unwrap();
        assert_eq!(args.endpoint.as_deref(), Some("http://localhost:8000"));
        assert!(args.ask.is_none());
    }

    #[test]
    fn test_endpoint_flag_falls_back_to_env() {
        use clap::CommandFactory;

        let command = Args::command();
        let endpoint = command
            .get_arguments()
            .find(|arg| arg.get_id() == "endpoint")
            .unwrap();
        assert_eq!(endpoint.get_env(), Some(std::ffi::OsStr::new(ENDPOINT_ENV)));
    }
}
