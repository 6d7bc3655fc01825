// Provider registry - wallets discovered through multi-provider announcements

use crate::models::ProviderInfo;
use crate::provider::{same_provider, EthereumProvider, ProviderDetail};
use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;

/// Event a wallet dispatches to announce itself
pub const ANNOUNCE_EVENT: &str = "eip6963:announceProvider";
/// Event the page dispatches to ask wallets to announce themselves
pub const REQUEST_EVENT: &str = "eip6963:requestProvider";

/// Discovered providers in announcement order, de-duplicated by uuid.
/// Entries are never removed for the lifetime of the page.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RefCell<Vec<ProviderDetail>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, as held by the discovery listener and the connection manager
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Record an announcement. Returns `false` if a provider with the same uuid
    /// is already known (first occurrence wins).
    pub fn announce(&self, detail: ProviderDetail) -> bool {
        let mut providers = self.providers.borrow_mut();
        if providers.iter().any(|p| p.info.uuid == detail.info.uuid) {
            debug!("Ignoring duplicate announcement for {}", detail.info.uuid);
            return false;
        }
        info!("Provider announced: {}", detail.info.name);
        providers.push(detail);
        true
    }

    /// Snapshot of every discovered provider
    pub fn list(&self) -> Vec<ProviderDetail> {
        self.providers.borrow().clone()
    }

    /// Announced info for every discovered provider, for pickers
    pub fn infos(&self) -> Vec<ProviderInfo> {
        self.providers.borrow().iter().map(|p| p.info.clone()).collect()
    }

    pub fn first(&self) -> Option<ProviderDetail> {
        self.providers.borrow().first().cloned()
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<ProviderDetail> {
        self.providers
            .borrow()
            .iter()
            .find(|p| p.info.uuid == uuid)
            .cloned()
    }

    /// Announced info for a provider handle, if it came from the registry
    pub fn info_for(&self, provider: &Rc<dyn EthereumProvider>) -> Option<ProviderInfo> {
        self.providers
            .borrow()
            .iter()
            .find(|p| same_provider(&p.provider, provider))
            .map(|p| p.info.clone())
    }

    pub fn len(&self) -> usize {
        self.providers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.borrow().is_empty()
    }
}
