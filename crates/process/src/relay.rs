//! Output relay: reads child stdout/stderr in fixed-size chunks and forwards
//! them into a bounded queue. A full queue drops the chunk instead of
//! blocking the reader.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::debug;

/// Capacity of the output queue between readers and the session.
pub const OUTPUT_QUEUE_CAPACITY: usize = 100;
/// Bytes requested per read from a child stream.
pub const READ_BUF_SIZE: usize = 1024;

pub type OutputSender = mpsc::Sender<String>;
pub type OutputReceiver = mpsc::Receiver<String>;

/// Per-reader counters reported when a stream reaches end-of-file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub forwarded: usize,
    pub dropped: usize,
}

/// Creates the bounded output queue.
pub fn output_channel() -> (OutputSender, OutputReceiver) {
    mpsc::channel(OUTPUT_QUEUE_CAPACITY)
}

/// Spawns a reader task for one child stream.
pub fn spawn_reader<R>(label: &'static str, stream: R, tx: OutputSender) -> JoinHandle<RelayStats>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let stats = pump(stream, tx).await;
        debug!(
            stream = label,
            forwarded = stats.forwarded,
            dropped = stats.dropped,
            "output reader finished"
        );
        stats
    })
}

/// Copies `stream` into `tx` until end-of-file, a read error, or the
/// receiving side going away.
pub async fn pump<R>(mut stream: R, tx: OutputSender) -> RelayStats
where
    R: AsyncRead + Unpin,
{
    let mut stats = RelayStats::default();
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut pending: Vec<u8> = Vec::with_capacity(READ_BUF_SIZE);

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("output read failed: {e}");
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);
        let chunk = take_decoded(&mut pending);
        if chunk.is_empty() {
            continue;
        }
        if !forward(&tx, chunk, &mut stats) {
            return stats;
        }
    }

    if !pending.is_empty() {
        let tail = String::from_utf8_lossy(&pending).into_owned();
        forward(&tx, tail, &mut stats);
    }
    stats
}

/// Returns `false` once the receiver is gone.
fn forward(tx: &OutputSender, chunk: String, stats: &mut RelayStats) -> bool {
    match tx.try_send(chunk) {
        Ok(()) => {
            stats.forwarded += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            stats.dropped += 1;
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Decodes the longest valid UTF-8 prefix of `pending`, leaving an incomplete
/// trailing sequence in place for the next read. Invalid bytes become U+FFFD.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                match e.error_len() {
                    Some(bad) => {
                        out.push_str(&String::from_utf8_lossy(&pending[..valid + bad]));
                        pending.drain(..valid + bad);
                    }
                    None => {
                        out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                        pending.drain(..valid);
                        return out;
                    }
                }
            }
        }
    }
}

/// Drains whatever is queued right now without waiting. Bounded by the queue
/// capacity so a chatty child cannot starve the caller.
pub fn drain_ready(rx: &mut OutputReceiver) -> Vec<String> {
    let mut chunks = Vec::new();
    for _ in 0..OUTPUT_QUEUE_CAPACITY {
        match rx.try_recv() {
            Ok(chunk) => chunks.push(chunk),
            Err(_) => break,
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_small_stream_as_one_chunk() {
        let (tx, mut rx) = output_channel();
        let stats = pump(&b"hello\nworld\n"[..], tx).await;
        assert_eq!(stats, RelayStats { forwarded: 1, dropped: 0 });
        assert_eq!(drain_ready(&mut rx), vec!["hello\nworld\n".to_string()]);
    }

    #[tokio::test]
    async fn full_queue_drops_chunks_without_blocking() {
        let (tx, mut rx) = mpsc::channel(2);
        let data = vec![b'x'; READ_BUF_SIZE * 50];
        let stats = tokio::time::timeout(Duration::from_secs(5), pump(&data[..], tx))
            .await
            .expect("reader must not block on a full queue");
        assert_eq!(stats.forwarded, 2);
        assert!(stats.dropped > 0);
        assert_eq!(drain_ready(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn stops_when_receiver_is_gone() {
        let (tx, rx) = output_channel();
        drop(rx);
        let stats = pump(&b"ignored"[..], tx).await;
        assert_eq!(stats, RelayStats::default());
    }

    #[test]
    fn keeps_incomplete_multibyte_tail_for_next_read() {
        let bytes = "héllo".as_bytes();
        // split inside the two-byte 'é'
        let mut pending = bytes[..2].to_vec();
        assert_eq!(take_decoded(&mut pending), "h");
        assert_eq!(pending.len(), 1);
        pending.extend_from_slice(&bytes[2..]);
        assert_eq!(take_decoded(&mut pending), "éllo");
        assert!(pending.is_empty());
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut pending = vec![b'a', 0xff, b'b'];
        assert_eq!(take_decoded(&mut pending), "a\u{fffd}b");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn drain_ready_is_bounded_by_capacity() {
        let (tx, mut rx) = mpsc::channel(OUTPUT_QUEUE_CAPACITY * 2);
        for i in 0..(OUTPUT_QUEUE_CAPACITY + 5) {
            tx.try_send(i.to_string()).expect("queue has room");
        }
        assert_eq!(drain_ready(&mut rx).len(), OUTPUT_QUEUE_CAPACITY);
        assert_eq!(drain_ready(&mut rx).len(), 5);
        assert!(drain_ready(&mut rx).is_empty());
    }
}
