use crate::model::UiEvent;
use crate::orchestrator::UiCommand;
use anyhow::Result;
use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "workflowgenie-cli",
    version,
    about = "Terminal client for the WorkFlowGenie workflow service"
)]
pub struct Cli {
    /// Base URL of the WorkFlowGenie service
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Prefill the instructions input with this text
    #[arg(long)]
    pub text: Option<String>,

    /// Run the prefilled text automatically shortly after launch
    #[arg(long, requires = "text")]
    pub auto: bool,

    /// Print a text rendering of the result and exit (no TUI)
    #[arg(long)]
    pub plain: bool,

    /// Print the raw JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Clear the service database and exit
    #[arg(long)]
    pub clear_db: bool,

    /// Skip the confirmation prompt for --clear-db
    #[arg(long)]
    pub yes: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that only one output mode was requested
    if args.json && args.plain {
        return Err(anyhow::anyhow!(
            "--json and --plain are mutually exclusive. Pick one output mode."
        ));
    }

    if args.clear_db {
        return run_clear_db(args).await;
    }

    if !args.json && !args.plain {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args).await;
        }
    }

    run_once(args).await
}

/// Run one workflow request and print the outcome.
async fn run_once(args: Cli) -> Result<()> {
    let text = args.text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return Err(anyhow::anyhow!(crate::orchestrator::EMPTY_INPUT_MESSAGE));
    }

    let client = crate::client::WorkflowClient::new(&args.server)?;

    if args.json {
        // Raw response document, no rendering.
        let result = client
            .run_workflow(&text)
            .await
            .map_err(|e| anyhow::anyhow!(e.run_message()))?;
        let (out_tx, out_handle) = spawn_output_writer();
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(
            &result.raw,
        )?));
        drop(out_tx);
        let _ = out_handle.await;
        return Ok(());
    }

    // Plain mode drives the same controller as the TUI and prints its events.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let handle = tokio::spawn(crate::orchestrator::run_controller(
        client, event_tx, cmd_rx,
    ));
    let _ = cmd_tx.send(UiCommand::Submit { text });
    let _ = cmd_tx.send(UiCommand::Quit);
    drop(cmd_tx);

    let (out_tx, out_handle) = spawn_output_writer();
    let mut failure: Option<String> = None;
    while let Some(ev) = event_rx.recv().await {
        match ev {
            UiEvent::Info(info) => {
                let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
            }
            UiEvent::ErrorShown { message } => failure = Some(message),
            UiEvent::ResultsRendered { view } => {
                for line in view.text_lines() {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            _ => {}
        }
    }
    handle.await??;
    drop(out_tx);
    let _ = out_handle.await;

    match failure {
        Some(message) => Err(anyhow::anyhow!(message)),
        None => Ok(()),
    }
}

/// Clear the remote store from the command line.
async fn run_clear_db(args: Cli) -> Result<()> {
    if !args.yes {
        let confirmed = tokio::task::spawn_blocking(confirm_clear).await??;
        if !confirmed {
            return Err(anyhow::anyhow!("Aborted."));
        }
    }

    let client = crate::client::WorkflowClient::new(&args.server)?;
    client
        .clear_store()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to clear DB: {e}"))?;
    println!("Database cleared.");
    Ok(())
}

/// Prompt on stderr so piped stdout stays clean. Accepts `y` or `yes`.
fn confirm_clear() -> Result<bool> {
    eprint!("Clear the local DB? This will remove stored tasks. [y/N] ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
