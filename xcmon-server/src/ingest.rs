//! NDJSON ingestion.
//!
//! Each input line is one tagged `XcmEvent` as produced by the watchers.
//! Blank lines are skipped. Lines that are not UTF-8 or not a valid event
//! are logged, counted and skipped; only a failing reader ends the run.

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, info, warn};
use xcmon_core::events::XcmEventSender;
use xcmon_sdk::objects::XcmEvent;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: usize,
    pub malformed: usize,
}

/// Reads events from `reader` into `event_tx` until EOF, shutdown, or the
/// engine going away.
pub async fn run<R>(
    reader: R,
    event_tx: XcmEventSender,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = SplitStream::new(reader.split(b'\n'));
    let mut stats = IngestStats::default();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Ingest received shutdown signal");
                    break;
                }
                continue;
            }

            line = lines.next() => match line {
                Some(line) => line?,
                None => {
                    info!(accepted = stats.accepted, malformed = stats.malformed, "Input closed");
                    break;
                }
            },
        };
        line_no += 1;

        let Ok(text) = std::str::from_utf8(&line) else {
            warn!(line = line_no, "Skipping line that is not valid UTF-8");
            stats.malformed += 1;
            continue;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<XcmEvent>(trimmed) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed event");
                stats.malformed += 1;
                continue;
            }
        };

        debug!(
            line = line_no,
            subscription_id = %event.subscription_id(),
            message_hash = %event.message_hash(),
            "Ingested event"
        );
        if event_tx.send(event).await.is_err() {
            warn!("Matching engine is gone, stopping ingest");
            break;
        }
        stats.accepted += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_skips_bad_lines() {
        let input = concat!(
            r#"{"type":"xcm.received","subscriptionId":"s","messageHash":"0x01","chainId":"urn:ocn:polkadot:0","blockHash":"0xb","blockNumber":1,"outcome":"Success"}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"type":"xcm.unknown"}"#,
            "\n",
        );
        let (tx, mut rx) = xcmon_core::events::xcm_event_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let stats = run(input.as_bytes(), tx, shutdown_rx).await.unwrap();
        assert_eq!(
            stats,
            IngestStats {
                accepted: 1,
                malformed: 2
            }
        );
        assert!(matches!(rx.recv().await, Some(XcmEvent::Received(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_end_input() {
        let mut input: Vec<u8> = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(
            br#"{"type":"xcm.received","subscriptionId":"s","messageHash":"0x01","chainId":"urn:ocn:polkadot:0","blockHash":"0xb","blockNumber":1,"outcome":"Success"}"#,
        );
        input.push(b'\n');
        let (tx, mut rx) = xcmon_core::events::xcm_event_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let stats = run(input.as_slice(), tx, shutdown_rx).await.unwrap();
        assert_eq!(
            stats,
            IngestStats {
                accepted: 1,
                malformed: 1
            }
        );
        assert!(matches!(rx.recv().await, Some(XcmEvent::Received(_))));
    }
}
