//! Line-oriented chat transport
//!
//! Each input line is one message of a single conversation; each reply is
//! written back followed by a blank line. Quick-reply buttons are rendered as
//! `[sim] [não]`.

use crate::dispatch::{Dispatcher, Response};
use crate::types::ConversationId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/sair"];

fn render(response: &Response) -> String {
    let mut out = response.text.clone();
    if !response.buttons.is_empty() {
        let buttons: Vec<String> = response.buttons.iter().map(|b| format!("[{b}]")).collect();
        out.push('\n');
        out.push_str(&buttons.join(" "));
    }
    out.push_str("\n\n");
    out
}

/// Feed lines from `reader` to the dispatcher until EOF or a quit command
///
/// # Returns
///
/// The number of messages handled.
///
/// # Errors
///
/// Any I/O error from the reader or writer.
pub async fn run_repl<R, W>(
    dispatcher: &Dispatcher,
    conversation: ConversationId,
    reader: R,
    mut writer: W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&message) {
            debug!(conversation, "Quit requested");
            break;
        }

        let response = dispatcher.handle(conversation, message).await;
        writer.write_all(render(&response).as_bytes()).await?;
        writer.flush().await?;
        handled += 1;
    }

    Ok(handled)
}
