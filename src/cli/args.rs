use crate::settings::Settings;
use crate::types::ConversationId;
use clap::Parser;
use std::path::PathBuf;

/// Chat-driven personal finance ledger
#[derive(Parser, Debug)]
#[command(name = "finbot")]
#[command(about = "Chat-driven personal finance ledger synced to a spreadsheet", long_about = None)]
pub struct CliArgs {
    /// Settings file (TOML)
    #[arg(
        long = "config",
        short = 'c',
        value_name = "FILE",
        env = "FINBOT_CONFIG",
        help = "Path to the settings file (default: ./finbot.toml if present)"
    )]
    pub config: Option<PathBuf>,

    /// Conversation the stdin transport speaks for
    #[arg(
        long = "conversation",
        value_name = "ID",
        default_value_t = 1,
        allow_negative_numbers = true,
        help = "Conversation id used for messages read from stdin"
    )]
    pub conversation: ConversationId,

    /// Directory of the CSV sheet files
    #[arg(
        long = "sheet-dir",
        value_name = "DIR",
        help = "Directory holding one CSV sheet per account (overrides sync.sheet_dir)"
    )]
    pub sheet_dir: Option<PathBuf>,

    /// Log filter
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        help = "Log filter, e.g. 'debug' or 'rust_finance_bot=trace' (overrides log.level)"
    )]
    pub log_level: Option<String>,

    /// Tokio worker threads
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,
}

impl CliArgs {
    /// Fold command-line overrides into loaded settings
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.sheet_dir {
            settings.sync.sheet_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log.level = level.clone();
        }
        if let Some(threads) = self.worker_threads {
            settings.runtime.worker_threads = Some(threads);
        }
    }
}
