//! Downstream consumer of price changes.

use async_trait::async_trait;
use tracing::info;

/// One price change handed to the notifee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub base: String,
    pub quote: String,
    pub denominated_price: u64,
    pub decimals: u64,
    pub timestamp: i64,
}

/// Receives batches of price changes. Delivery atomicity is up to the implementation.
#[async_trait]
pub trait PriceNotifee: Send + Sync {
    async fn price_changed(&self, changes: &[ChangeRecord]) -> anyhow::Result<()>;
}

/// `submitBatch` smart contract call data.
///
/// Layout: `submitBatch@hex(base)@hex(quote)@hex(timestamp)@hex(price)@hex(decimals)`
/// repeated per record, integers as minimal big-endian bytes (zero is empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitBatchPayload(String);

impl SubmitBatchPayload {
    pub const FUNCTION: &'static str = "submitBatch";

    pub fn new(changes: &[ChangeRecord]) -> Self {
        let mut data = String::from(Self::FUNCTION);
        for change in changes {
            for arg in [
                hex::encode(change.base.as_bytes()),
                hex::encode(change.quote.as_bytes()),
                hex_int(change.timestamp.unsigned_abs()),
                hex_int(change.denominated_price),
                hex_int(change.decimals),
            ] {
                data.push('@');
                data.push_str(&arg);
            }
        }
        Self(data)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_int(value: u64) -> String {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    hex::encode(&bytes[first..])
}

/// Logs every batch instead of submitting it on chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifee;

#[async_trait]
impl PriceNotifee for LoggingNotifee {
    async fn price_changed(&self, changes: &[ChangeRecord]) -> anyhow::Result<()> {
        for change in changes {
            info!(
                base = %change.base,
                quote = %change.quote,
                denominated_price = change.denominated_price,
                decimals = change.decimals,
                timestamp = change.timestamp,
                "Price changed"
            );
        }
        let payload = SubmitBatchPayload::new(changes);
        info!(records = changes.len(), data = payload.as_str(), "Prepared submitBatch payload");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(base: &str, quote: &str, price: u64, decimals: u64, timestamp: i64) -> ChangeRecord {
        ChangeRecord {
            base: base.to_string(),
            quote: quote.to_string(),
            denominated_price: price,
            decimals,
            timestamp,
        }
    }

    #[test]
    fn test_hex_int_is_minimal_big_endian() {
        assert_eq!(hex_int(0), "");
        assert_eq!(hex_int(1), "01");
        assert_eq!(hex_int(255), "ff");
        assert_eq!(hex_int(256), "0100");
        assert_eq!(hex_int(1_700_000_000), "6553f100");
    }

    #[test]
    fn test_submit_batch_payload() {
        let payload = SubmitBatchPayload::new(&[
            record("ETH", "USD", 380_000, 2, 1_700_000_000),
            record("BTC", "USD", 0, 0, 16),
        ]);

        assert_eq!(
            payload.as_str(),
            "submitBatch@455448@555344@6553f100@05cc60@02@425443@555344@10@@"
        );
    }

    #[test]
    fn test_empty_batch_is_function_only() {
        assert_eq!(SubmitBatchPayload::new(&[]).as_str(), SubmitBatchPayload::FUNCTION);
    }

    #[tokio::test]
    async fn test_logging_notifee_accepts_batches() {
        let notifee = LoggingNotifee;
        assert!(notifee
            .price_changed(&[record("ETH", "USD", 1, 2, 3)])
            .await
            .is_ok());
    }
}
