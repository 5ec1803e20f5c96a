//! Realtime console client entry point
//!
//! Terminal front-end for the chat and dashboard feeds plus a progress
//! follower for long-running server-side processing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, watch};
use url::Url;

use realtime::config::ENV_API_TOKEN;
use realtime::{
    ClientConfig, ConnectionSnapshot, ProgressConfig, ProgressEstimator, RealConnector, RealProgressSource,
    RealtimeError, SocketClient, StaticToken, StreamCallbacks, TokenProvider,
};
use shared::{FeedMessage, logging};

#[derive(Parser, Debug)]
#[command(name = "realtime")]
#[command(about = "Realtime console client for chat, dashboard and processing progress")]
struct Args {
    /// HTTP origin of the console API (overrides REALTIME_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<Url>,

    /// Bearer token (overrides REALTIME_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the listener chat and send lines from stdin
    Chat {
        #[arg(long)]
        session: Option<String>,
    },
    /// Watch the global dashboard or a single station
    Dashboard {
        #[arg(long)]
        station: Option<String>,
    },
    /// Follow a processing job's progress stream
    Progress {
        /// Progress stream URL
        #[arg(long)]
        url: Url,
        /// Expected duration of the job in seconds
        #[arg(long, default_value_t = 30.0)]
        estimate: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let token = args.token.clone().or_else(|| std::env::var(ENV_API_TOKEN).ok());
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken::new(token));

    match args.command {
        Command::Chat { session } => {
            let config = client_config(args.api_base)?;
            let client = SocketClient::chat(config, session, Arc::new(RealConnector::new()), tokens);
            run_chat(client).await
        }
        Command::Dashboard { station } => {
            let config = client_config(args.api_base)?;
            let client = SocketClient::dashboard(config, station, Arc::new(RealConnector::new()), tokens);
            run_feed(client, None).await
        }
        Command::Progress { url, estimate } => {
            let estimate = Duration::try_from_secs_f64(estimate).context("--estimate must be a non-negative number")?;
            run_progress(url, estimate, tokens).await
        }
    }
}

fn client_config(api_base: Option<Url>) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("loading client configuration")?;
    if let Some(api_base) = api_base {
        config.api_base = api_base;
    }
    config.validate()?;
    Ok(config)
}

async fn run_chat(client: SocketClient) -> anyhow::Result<()> {
    let (lines_tx, mut lines_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });
    run_feed(client, Some(&mut lines_rx)).await
}

/// Print feed messages until Ctrl+C, stdin closes, or the server rejects us
async fn run_feed(
    client: SocketClient,
    mut input: Option<&mut tokio::sync::mpsc::UnboundedReceiver<String>>,
) -> anyhow::Result<()> {
    logging::log_startup(client.feed(), "terminal client");
    let mut state = client.subscribe();
    let mut printed = HashSet::new();
    client.connect();

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = state.changed() => {
                if changed.is_err() {
                    break Err(RealtimeError::ClientStopped.into());
                }
                let snapshot = state.borrow_and_update().clone();
                print_new_messages(&snapshot, &mut printed);
                if snapshot.auth_failed {
                    let reason = snapshot.last_error.unwrap_or_else(|| "authentication failed".to_string());
                    break Err(anyhow::anyhow!("connection rejected: {reason}"));
                }
            }
            line = next_line(&mut input) => match line {
                Some(line) => send_line(&client, &line).await,
                None => break Ok(()),
            },
        }
    };

    client.disconnect();
    logging::log_shutdown(client.feed(), "terminal client exiting");
    result
}

async fn next_line(input: &mut Option<&mut tokio::sync::mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_line(client: &SocketClient, line: &str) {
    let result = match line.trim() {
        "" => return,
        "/history" => client.request_history(50).await,
        text => client.send_message(text).await,
    };
    if let Err(e) = result {
        eprintln!("! {e}");
    }
}

fn print_new_messages(snapshot: &ConnectionSnapshot, printed: &mut HashSet<String>) {
    for message in &snapshot.messages {
        if printed.insert(message.id.clone()) {
            println!("{}", render(message));
        }
    }
    if let Some(streaming) = &snapshot.streaming {
        println!("… {}", streaming.content);
    }
}

fn render(message: &FeedMessage) -> String {
    format!(
        "[{}] {:?}: {}",
        message.timestamp.format("%H:%M:%S"),
        message.origin,
        message.content
    )
}

async fn run_progress(url: Url, estimate: Duration, tokens: Arc<dyn TokenProvider>) -> anyhow::Result<()> {
    let config = ProgressConfig::from_env().context("loading progress configuration")?;
    let source = RealProgressSource::new(reqwest::Client::new()).with_tokens(tokens);
    let estimator = ProgressEstimator::new(config, Arc::new(source))?;
    let session = estimator.session();

    let stop = session.start_estimation(estimate, |_| {}, || tracing::debug!("Server took over progress"));

    let (done_tx, done_rx) = oneshot::channel::<anyhow::Result<Option<serde_json::Value>>>();
    let done = Arc::new(std::sync::Mutex::new(Some(done_tx)));
    let finish_slot = Arc::clone(&done);
    let callbacks = StreamCallbacks::new()
        .on_finish(move |metadata| {
            if let Some(tx) = finish_slot.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(Ok(metadata));
            }
        })
        .on_error(move |error| {
            if let Some(tx) = done.lock().ok().and_then(|mut slot| slot.take()) {
                let _ = tx.send(Err(error.into()));
            }
        });
    session.attach_server_stream(url.clone(), callbacks);

    let printer = tokio::spawn(print_progress(session.progress()));
    let outcome = tokio::select! {
        outcome = done_rx => outcome.context("progress session ended without a result")?,
        _ = tokio::signal::ctrl_c() => {
            stop.stop();
            printer.abort();
            anyhow::bail!("interrupted");
        }
    };

    let metadata = match outcome {
        Ok(metadata) => metadata,
        Err(e) => {
            printer.abort();
            return Err(e);
        }
    };
    // The display reached 100 before the finish callback ran
    let _ = printer.await;
    tracing::info!("✅ Processing finished: {}", url);
    if let Some(metadata) = metadata {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}

/// Render the display until it reaches 100
async fn print_progress(mut progress: watch::Receiver<u8>) {
    loop {
        let value = *progress.borrow_and_update();
        println!("{:>3}% {}", value, "#".repeat(usize::from(value / 2)));
        if value >= 100 || progress.changed().await.is_err() {
            break;
        }
    }
}
