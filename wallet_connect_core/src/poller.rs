// Chain metadata poller - block height and gas price for the wallet panel

use crate::chain_client::ChainClient;
use crate::network::format_gwei;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::future::Future;

/// Last good values; a failed query never clears what is already here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub block_number: Option<u64>,
    /// Gas price in gwei, two decimals
    pub gas_price_gwei: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct ChainMetadataPoller {
    interval_ms: u64,
    metadata: RefCell<ChainMetadata>,
    running: Cell<bool>,
    generation: Cell<u64>,
}

impl ChainMetadataPoller {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            metadata: RefCell::new(ChainMetadata::default()),
            running: Cell::new(false),
            generation: Cell::new(0),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn metadata(&self) -> ChainMetadata {
        self.metadata.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Query block height and fee data once. Results that arrive after
    /// [`stop`](Self::stop) are dropped.
    pub async fn refresh<C: ChainClient + ?Sized>(&self, client: &C) {
        let generation = self.generation.get();
        let block = client.get_block_number().await;
        let fees = client.get_fee_data().await;

        if self.generation.get() != generation {
            debug!("Discarding chain metadata from stopped poller");
            return;
        }

        let mut metadata = self.metadata.borrow_mut();
        let mut updated = false;

        match block {
            Ok(block) => {
                metadata.block_number = Some(block);
                updated = true;
            }
            Err(e) => warn!("Error fetching block number: {}", e),
        }

        match fees.map(|f| f.gas_price) {
            Ok(Some(price)) => match format_gwei(price) {
                Ok(gwei) => {
                    metadata.gas_price_gwei = Some(gwei);
                    updated = true;
                }
                Err(e) => warn!("Error formatting gas price: {}", e),
            },
            Ok(None) => debug!("Provider reported no gas price"),
            Err(e) => warn!("Error fetching gas price: {}", e),
        }

        if updated {
            metadata.updated_at = Some(Utc::now());
        }
    }

    /// Refresh now and then once per interval until [`stop`](Self::stop) is
    /// called, another `run` takes over, or `keep_going` says the session this
    /// loop serves has ended.
    /// `sleep` is the platform timer (tokio on native, setTimeout on wasm).
    pub async fn run<C, F, Fut>(&self, client: &C, keep_going: impl Fn() -> bool, sleep: F)
    where
        C: ChainClient + ?Sized,
        F: Fn(u64) -> Fut,
        Fut: Future<Output = ()>,
    {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.running.set(true);
        debug!("Chain metadata polling started ({} ms)", self.interval_ms);

        while self.generation.get() == generation && keep_going() {
            self.refresh(client).await;
            sleep(self.interval_ms).await;
        }

        if self.generation.get() == generation {
            self.running.set(false);
        }
        debug!("Chain metadata polling loop {} finished", generation);
    }

    pub fn stop(&self) {
        self.generation.set(self.generation.get() + 1);
        self.running.set(false);
    }

    /// Forget the last values, e.g. after the wallet disconnects
    pub fn reset(&self) {
        *self.metadata.borrow_mut() = ChainMetadata::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_client::ProviderChainClient;
    use crate::testing::MockProvider;
    use serde_json::json;
    use std::rc::Rc;

    fn client(provider: &Rc<MockProvider>) -> ProviderChainClient {
        ProviderChainClient::new(provider.clone())
    }

    #[tokio::test]
    async fn refresh_reads_block_and_gas() {
        let provider = MockProvider::new();
        provider.respond("eth_blockNumber", json!("0x1312d00"));
        provider.respond("eth_gasPrice", json!("0x2dfdc1c35"));
        let poller = ChainMetadataPoller::new(15_000);

        poller.refresh(&client(&provider)).await;

        let metadata = poller.metadata();
        assert_eq!(metadata.block_number, Some(20_000_000));
        assert_eq!(metadata.gas_price_gwei.as_deref(), Some("12.35"));
        assert!(metadata.updated_at.is_some());
    }

    #[tokio::test]
    async fn failures_keep_last_good_values() {
        let provider = MockProvider::new();
        provider.respond("eth_blockNumber", json!("0x10"));
        provider.respond("eth_gasPrice", json!("0x3b9aca00"));
        let poller = ChainMetadataPoller::new(15_000);
        poller.refresh(&client(&provider)).await;

        provider.fail("eth_blockNumber", "timeout");
        provider.fail("eth_gasPrice", "timeout");
        poller.refresh(&client(&provider)).await;

        let metadata = poller.metadata();
        assert_eq!(metadata.block_number, Some(16));
        assert_eq!(metadata.gas_price_gwei.as_deref(), Some("1.00"));
    }

    #[tokio::test]
    async fn run_polls_until_stopped() {
        let provider = MockProvider::new();
        provider.respond("eth_blockNumber", json!("0x1"));
        provider.respond("eth_gasPrice", json!("0x1"));
        let poller = ChainMetadataPoller::new(15_000);
        let client = client(&provider);
        let ticks = Cell::new(0u32);

        poller
            .run(
                &client,
                || true,
                |ms| {
                    assert_eq!(ms, 15_000);
                    ticks.set(ticks.get() + 1);
                    if ticks.get() == 3 {
                        poller.stop();
                    }
                    async {}
                },
            )
            .await;

        assert_eq!(provider.call_count("eth_blockNumber"), 3);
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn newer_run_supersedes_older_one() {
        let provider = MockProvider::new();
        provider.respond("eth_blockNumber", json!("0x1"));
        provider.respond("eth_gasPrice", json!("0x1"));
        let poller = ChainMetadataPoller::new(15_000);
        let client = client(&provider);

        let mut old = Box::pin(poller.run(&client, || true, |_| futures_util::future::pending::<()>()));
        assert!(futures_util::poll!(old.as_mut()).is_pending());

        let ticks = Cell::new(0u32);
        poller
            .run(&client, || true, |_| {
                ticks.set(ticks.get() + 1);
                if ticks.get() == 2 {
                    poller.stop();
                }
                async {}
            })
            .await;

        assert_eq!(provider.call_count("eth_blockNumber"), 3);
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn stop_discards_refresh_in_flight() {
        let provider = MockProvider::new();
        provider.respond("eth_blockNumber", json!("0x10"));
        provider.respond("eth_gasPrice", json!("0x3b9aca00"));
        let gate = provider.gate("eth_blockNumber");
        let poller = ChainMetadataPoller::new(15_000);
        let client = client(&provider);

        let mut pending = Box::pin(poller.run(&client, || true, |_| async {}));
        assert!(futures_util::poll!(pending.as_mut()).is_pending());

        poller.stop();
        poller.reset();
        gate.send(()).unwrap();
        pending.await;

        assert_eq!(poller.metadata(), ChainMetadata::default());
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn run_ends_with_session() {
        let provider = MockProvider::new();
        let poller = ChainMetadataPoller::new(15_000);
        let client = client(&provider);

        poller.run(&client, || false, |_| async {}).await;

        assert_eq!(provider.call_count("eth_blockNumber"), 0);
        assert_eq!(poller.metadata(), ChainMetadata::default());
    }
}
