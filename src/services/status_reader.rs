//! Pull-side of the status stream
//!
//! A `StatusReader` yields solve batches until the producer is exhausted.
//! `spawn_producer` runs one on a background thread and forwards every batch
//! into the application's message queue, finishing with `Message::Eof`.

use crate::app::Message;
use crate::model::graph::SolveStatus;
use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Source of solve status batches. `None` means the stream is over.
pub trait StatusReader: Send {
    fn read_status(&mut self) -> Option<SolveStatus>;
}

/// Shared flag that makes readers report exhaustion early
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reads one JSON-encoded `SolveStatus` per line.
pub struct JsonLinesReader<R> {
    input: R,
    cancel: CancelToken,
    line: String,
    line_number: usize,
}

impl<R: BufRead + Send> JsonLinesReader<R> {
    pub fn new(input: R) -> Self {
        Self::with_cancel(input, CancelToken::new())
    }

    pub fn with_cancel(input: R, cancel: CancelToken) -> Self {
        Self {
            input,
            cancel,
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl<R: BufRead + Send> StatusReader for JsonLinesReader<R> {
    fn read_status(&mut self) -> Option<SolveStatus> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("status stream cancelled");
                return None;
            }

            self.line.clear();
            match self.input.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("failed to read status stream: {}", e);
                    return None;
                }
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SolveStatus>(trimmed) {
                Ok(status) => return Some(status),
                Err(e) => {
                    tracing::warn!("skipping malformed status on line {}: {}", self.line_number, e);
                }
            }
        }
    }
}

/// Replays batches from memory.
#[derive(Debug, Default)]
pub struct VecReader {
    batches: VecDeque<SolveStatus>,
}

impl VecReader {
    pub fn new(batches: impl IntoIterator<Item = SolveStatus>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }
}

impl StatusReader for VecReader {
    fn read_status(&mut self) -> Option<SolveStatus> {
        self.batches.pop_front()
    }
}

/// Drain `reader` on a background thread, forwarding batches as messages.
///
/// The thread stops early if the receiving side hangs up.
pub fn spawn_producer<S>(mut reader: S, sender: Sender<Message>) -> std::io::Result<JoinHandle<()>>
where
    S: StatusReader + 'static,
{
    std::thread::Builder::new()
        .name("status-producer".to_string())
        .spawn(move || {
            let mut batches = 0usize;
            while let Some(status) = reader.read_status() {
                batches += 1;
                if sender.send(Message::Status(status)).is_err() {
                    tracing::debug!("message queue closed after {} batches", batches);
                    return;
                }
            }
            tracing::debug!("status stream exhausted after {} batches", batches);
            let _ = sender.send(Message::Eof);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn test_json_lines_skips_blank_and_malformed() {
        let input = concat!(
            r#"{"vertexes":[{"digest":"d1","name":"one"}]}"#,
            "\n\n",
            "not json\n",
            r#"{"vertexes":[{"digest":"d2","name":"two"}]}"#,
            "\n",
        );
        let mut reader = JsonLinesReader::new(Cursor::new(input));

        let first = reader.read_status().unwrap();
        assert_eq!(first.vertexes[0].name, "one");
        let second = reader.read_status().unwrap();
        assert_eq!(second.vertexes[0].name, "two");
        assert!(reader.read_status().is_none());
    }

    #[test]
    fn test_cancel_ends_stream() {
        let input = r#"{"vertexes":[{"digest":"d1"}]}"#.to_string() + "\n";
        let mut reader = JsonLinesReader::new(Cursor::new(input));
        reader.cancel_token().cancel();

        assert!(reader.read_status().is_none());
    }

    #[test]
    fn test_producer_forwards_then_eof() {
        let (tx, rx) = mpsc::channel();
        let reader = VecReader::new(vec![SolveStatus::default(), SolveStatus::default()]);
        let handle = spawn_producer(reader, tx).unwrap();
        handle.join().unwrap();

        let messages: Vec<Message> = rx.try_iter().collect();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], Message::Status(_)));
        assert!(matches!(messages[2], Message::Eof));
    }
}
