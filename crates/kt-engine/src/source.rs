//! Event sources: where key signals come from.

use kt_core::KeySignal;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::EngineError;

const CHANNEL_CAPACITY: usize = 1024;

/// Emits key signals until it is unsubscribed or runs dry.
///
/// The receiver returned by `subscribe` closes when the source has nothing
/// more to deliver.
pub trait EventSource: Send {
    fn subscribe(&mut self) -> Result<mpsc::Receiver<KeySignal>, EngineError>;

    /// Detaches from the underlying input. Safe to call more than once.
    fn unsubscribe(&mut self);
}

/// Reads one JSON-encoded [`KeySignal`] per line.
///
/// Lines that do not parse are logged and skipped. The source closes at end
/// of input.
pub struct JsonLinesSource<R> {
    reader: Option<R>,
    task: Option<JoinHandle<()>>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub const fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            task: None,
        }
    }
}

impl<R> EventSource for JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn subscribe(&mut self) -> Result<mpsc::Receiver<KeySignal>, EngineError> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| EngineError::Source("input already consumed".into()))?;
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.task = Some(tokio::spawn(forward_lines(reader, sender)));
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<R> Drop for JsonLinesSource<R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn forward_lines<R>(reader: R, sender: mpsc::Sender<KeySignal>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut line_number = 0_u64;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read key signals");
                break;
            }
        };
        line_number += 1;
        let Some(signal) = parse_line(&line, line_number) else {
            continue;
        };
        if sender.send(signal).await.is_err() {
            break;
        }
    }
    tracing::debug!(lines = line_number, "key signal input closed");
}

/// Reads JSON-lines key signals from the process's standard input.
///
/// The read blocks on a dedicated thread rather than inside the runtime, so
/// an interrupted watch can exit while stdin is still open.
#[derive(Debug, Default)]
pub struct StdinSource {
    subscribed: bool,
}

impl StdinSource {
    pub const fn new() -> Self {
        Self { subscribed: false }
    }
}

impl EventSource for StdinSource {
    fn subscribe(&mut self) -> Result<mpsc::Receiver<KeySignal>, EngineError> {
        if self.subscribed {
            return Err(EngineError::Source("input already consumed".into()));
        }
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name("keytally-stdin".into())
            .spawn(move || read_stdin(&sender))
            .map_err(|err| EngineError::Source(format!("failed to spawn stdin reader: {err}")))?;
        self.subscribed = true;
        Ok(receiver)
    }

    // The reader thread is detached. It stops at its next line once the
    // receiver is gone, or with the process.
    fn unsubscribe(&mut self) {}
}

fn read_stdin(sender: &mpsc::Sender<KeySignal>) {
    use std::io::BufRead;

    let mut line_number = 0_u64;
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read key signals");
                break;
            }
        };
        line_number += 1;
        let Some(signal) = parse_line(&line, line_number) else {
            continue;
        };
        if sender.blocking_send(signal).is_err() {
            break;
        }
    }
    tracing::debug!(lines = line_number, "stdin closed");
}

/// Parses one input line. Blank lines are ignored; malformed ones are
/// logged.
fn parse_line(line: &str, line_number: u64) -> Option<KeySignal> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(signal) => Some(signal),
        Err(err) => {
            tracing::warn!(line = line_number, error = %err, "skipping malformed key signal");
            None
        }
    }
}

/// A source fed directly through a channel sender.
pub struct ChannelSource {
    receiver: Option<mpsc::Receiver<KeySignal>>,
}

impl ChannelSource {
    /// Creates the source and the sender that feeds it. Dropping every sender
    /// closes the source.
    pub fn new() -> (Self, mpsc::Sender<KeySignal>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                receiver: Some(receiver),
            },
            sender,
        )
    }
}

impl EventSource for ChannelSource {
    fn subscribe(&mut self) -> Result<mpsc::Receiver<KeySignal>, EngineError> {
        self.receiver
            .take()
            .ok_or_else(|| EngineError::Source("already subscribed".into()))
    }

    fn unsubscribe(&mut self) {}
}
