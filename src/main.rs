//! Finance bot CLI
//!
//! Runs the chat assistant over stdin/stdout: each line is a message of one
//! conversation, replies are printed to stdout, logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --config finbot.toml --conversation 42
//! cargo run -- --sheet-dir ./sheets --log-level debug
//! FINBOT__ACCOUNT__INITIAL_BALANCE=1500 cargo run
//! ```
//!
//! Entries are committed to the in-memory ledger immediately and pushed to
//! `{sheet_dir}/{conversation}.csv` in the background. On EOF (or `/sair`)
//! the push queue is drained before exiting.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid settings, sheet directory not writable, etc.)

use rust_finance_bot::cli;
use rust_finance_bot::core::{LedgerRegistry, SystemClock};
use rust_finance_bot::dispatch::Dispatcher;
use rust_finance_bot::io::CsvSheet;
use rust_finance_bot::settings::Settings;
use rust_finance_bot::sync::{PushQueue, StoreRef};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Time the push workers get to drain on exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

type BoxError = Box<dyn Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    let args = cli::parse_args();
    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_to(&mut settings);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.worker_threads())
        .enable_all()
        .build()?;

    runtime.block_on(run(args, settings))
}

async fn run(args: cli::CliArgs, settings: Settings) -> Result<(), BoxError> {
    let registry = Arc::new(LedgerRegistry::new(settings.to_template()));
    let store: StoreRef = Arc::new(CsvSheet::open(&settings.sync.sheet_dir).await?);
    let queue = Arc::new(PushQueue::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        settings.retry_policy(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        store,
        Arc::clone(&queue),
        Arc::new(SystemClock),
        settings.dispatch_options(),
    ));

    info!(
        conversation = args.conversation,
        sheet_dir = %settings.sync.sheet_dir.display(),
        workers = settings.worker_threads(),
        "Finance bot started"
    );

    let sweeper = {
        let dispatcher = Arc::clone(&dispatcher);
        let period = settings.confirmation_expiry().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let dropped = dispatcher.pending().sweep();
                if dropped > 0 {
                    debug!(dropped, "Expired confirmations dropped");
                }
            }
        })
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let handled = cli::run_repl(&dispatcher, args.conversation, stdin, tokio::io::stdout()).await;

    sweeper.abort();
    queue.shutdown(SHUTDOWN_GRACE).await;

    let handled = handled?;
    info!(handled, "Finance bot stopped");
    Ok(())
}
