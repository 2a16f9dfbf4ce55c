// Threadline - Local generation runner

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use threadline_app::AppContext;
use threadline_assistants::{AssistantConfig, CancellationToken};
use threadline_common::Config;

/// Run one assistant generation and print the reply
#[derive(Debug, Parser)]
#[command(name = "local", version)]
struct Args {
    /// Assistant to run (defaults to DEFAULT_ASSISTANT_ID)
    #[arg(short, long)]
    assistant: Option<String>,

    /// Continue an existing thread
    #[arg(short, long, conflicts_with = "stateless")]
    thread: Option<String>,

    /// Use a throwaway thread and do not report its id
    #[arg(long)]
    stateless: bool,

    /// Prompt text
    #[arg(required = true, trailing_var_arg = true)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    threadline_common::init_tracing(&config)?;

    let ctx = AppContext::new(config, &AssistantConfig::from_env()?)?;

    let assistant_id = ctx.assistant_id(args.assistant)?;
    let prompt = args.prompt.join(" ");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    info!(assistant_id = %assistant_id, stateless = args.stateless, "Starting generation");

    if args.stateless {
        let text = ctx
            .generation
            .spawn_stateless(prompt, assistant_id, cancel)
            .await?
            .map_err(|e| {
                error!(code = e.error_code(), "Generation failed: {}", e);
                e
            })?;
        println!("{}", text);
    } else {
        let reply = ctx
            .generation
            .spawn_stateful(args.thread, prompt, assistant_id, cancel)
            .await?
            .map_err(|e| {
                error!(
                    code = e.error.error_code(),
                    thread_id = e.thread_id.as_deref().unwrap_or("-"),
                    "Generation failed: {}",
                    e
                );
                e
            })?;
        println!("thread: {}", reply.thread_id);
        println!("{}", reply.text);
    }

    Ok(())
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, cancelling generation");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling generation");
        },
    }

    cancel.cancel();
}
