use anyhow::{Context, Result};
use std::future::Future;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How an interactive run ended
#[derive(Debug)]
pub enum SessionEnd {
    Completed,
    /// Ctrl-C arrived before the run finished
    Interrupted,
    Failed(anyhow::Error),
}

/// Drive `task` until it finishes or `interrupt` fires.
///
/// The interrupt is polled first so the signal listener is installed before the task starts.
/// If the listener itself fails the task keeps running without it.
pub async fn run_until_interrupted<T, I>(task: T, interrupt: I) -> SessionEnd
where
    T: Future<Output = Result<()>>,
    I: Future<Output = io::Result<()>>,
{
    let interrupt = async {
        match interrupt.await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {e}");
                false
            }
        }
    };

    tokio::select! {
        biased;
        true = interrupt => SessionEnd::Interrupted,
        result = task => match result {
            Ok(()) => SessionEnd::Completed,
            Err(e) => SessionEnd::Failed(e),
        },
    }
}

/// Read one line on a detached thread.
///
/// A blocked read never holds up runtime shutdown: when the caller stops waiting, the thread
/// is simply left behind. Returns `None` once the input is closed.
pub async fn read_line_detached<R>(mut input: R) -> Result<Option<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            let mut line = String::new();
            let result = input
                .read_line(&mut line)
                .map(|read| (read > 0).then_some(line));
            if tx.send(result).is_err() {
                debug!("Line read finished after its reader went away");
            }
        })
        .context("Failed to start the input reader thread")?;

    rx.await
        .context("Input reader thread stopped without an answer")?
        .context("Failed to read from input")
}
