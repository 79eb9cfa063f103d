//! Notification output.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info};
use xcmon_core::events::NotificationReceiver;

/// Writes every notification as one JSON line.
pub struct NotificationWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> NotificationWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Runs until every sender is dropped. Returns the number written.
    pub async fn run(mut self, mut notification_rx: NotificationReceiver) -> usize {
        let mut written = 0;
        while let Some(notification) = notification_rx.recv().await {
            let mut line = match serde_json::to_vec(&notification) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to encode notification");
                    continue;
                }
            };
            line.push(b'\n');
            if let Err(e) = self.write_line(&line).await {
                error!(error = %e, "Failed to write notification, stopping output");
                break;
            }
            written += 1;
        }
        info!(written, "Notification output closed");
        written
    }

    async fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(line).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;
    use xcmon_sdk::objects::{
        ChainId, Destination, Leg, LegType, NotificationKind, Outcome, Waypoint, XcmNotification,
    };

    fn notification(hash: &str) -> XcmNotification {
        let waypoint = Waypoint {
            chain_id: ChainId::from("urn:ocn:polkadot:0"),
            block_hash: "0xb".to_owned(),
            block_number: 1,
            timestamp: None,
            outcome: Outcome::Success,
            error: None,
            event: serde_json::Value::Null,
        };
        XcmNotification {
            kind: NotificationKind::Received,
            subscription_id: "s".to_owned(),
            message_hash: hash.to_owned(),
            message_id: None,
            sender: serde_json::Value::Null,
            legs: smallvec![Leg {
                from: ChainId::from("urn:ocn:polkadot:1000"),
                to: ChainId::from("urn:ocn:polkadot:0"),
                leg_type: LegType::Vmp,
                relay: None,
            }],
            leg_index: 0,
            origin: waypoint.clone(),
            destination: Destination {
                chain_id: ChainId::from("urn:ocn:polkadot:0"),
            },
            waypoint,
            assets_trapped: None,
        }
    }

    #[tokio::test]
    async fn test_writes_one_line_per_notification() {
        let (tx, rx) = xcmon_core::events::notification_channel(4);
        tx.send(notification("0x01")).await.unwrap();
        tx.send(notification("0x02")).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        let written = NotificationWriter::new(&mut out).run(rx).await;
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "xcm.received");
        assert_eq!(first["messageHash"], "0x01");
    }
}
