//! Interactive chat loop

use assistant_core::{Agent, Conversation};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const WELCOME: &str = "Welcome to Groq Assistant CLI! Type 'exit' to quit.";
const GREETING: &str = "Assistant: Hello! How can I assist you today?";
const FAREWELL: &str = "Assistant: Goodbye!";

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

fn is_exit(line: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await
}

/// Read user lines until an exit command or end of input. The whole
/// session shares one conversation history.
pub async fn run<R, W>(agent: &Agent, mut input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(&mut output, WELCOME).await?;
    write_line(&mut output, GREETING).await?;

    let mut conversation = Conversation::new();
    let mut buf = Vec::new();

    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            write_line(&mut output, "").await?;
            break;
        }

        // Undecodable bytes become U+FFFD instead of ending the session
        let raw = String::from_utf8_lossy(&buf);
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let outcome = agent.run_turn(&mut conversation, line).await;
        tracing::debug!(path = ?outcome.path, "Turn finished");

        for note in &outcome.feedback {
            write_line(&mut output, &format!("[System] {note}")).await?;
        }
        write_line(&mut output, &format!("Assistant: {}", outcome.reply)).await?;
    }

    write_line(&mut output, FAREWELL).await?;
    output.flush().await?;
    Ok(())
}
