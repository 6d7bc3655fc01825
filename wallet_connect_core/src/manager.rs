// Connection manager - negotiates a wallet connection and keeps the session in sync
// with the events the active provider pushes

use crate::chain_client::{ChainClient, ProviderChainClient};
use crate::error::CoreError;
use crate::models::{ConnectionSession, ConnectionStatus, WalletState};
use crate::network::{checksum_address, format_ether_balance, friendly_network_label, same_address};
use crate::provider::{events, methods, parse_accounts, EthereumProvider, EventHandler};
use crate::registry::ProviderRegistry;
use crate::storage_trait::{keys, StorageBackend};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Something the active provider reported, tagged with the session it was bound for
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session_id: u64,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    AccountsChanged(Value),
    ChainChanged(Value),
}

/// What handling a [`SessionEvent`] did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Stale session, malformed payload or failed refresh; nothing changed
    Ignored,
    /// The active account is still the first entry
    Unchanged,
    /// A different account became active and its balance was fetched
    AccountSwitched,
    /// The wallet exposed no accounts any more
    Disconnected,
    /// The network changed; the host must reload (or re-run the restore path)
    ReloadRequired,
}

/// Listeners currently attached to the active provider
struct Binding {
    provider: Rc<dyn EthereumProvider>,
    accounts_handler: EventHandler,
    chain_handler: EventHandler,
    session_id: u64,
}

/// Owns the single wallet session.
///
/// All methods take `&self`; state lives in cells and no borrow is held across
/// an `.await`, so commands and event handling may interleave on one thread.
/// Every suspended operation remembers the attempt counter it started under and
/// drops its result if the counter moved in the meantime.
pub struct WalletManager<S: StorageBackend> {
    storage: S,
    registry: Rc<ProviderRegistry>,
    legacy: Option<Rc<dyn EthereumProvider>>,
    status: Cell<ConnectionStatus>,
    error: RefCell<Option<String>>,
    session: RefCell<Option<ConnectionSession>>,
    binding: RefCell<Option<Binding>>,
    attempt: Cell<u64>,
    account_refresh: Cell<u64>,
    next_session_id: Cell<u64>,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: RefCell<Option<UnboundedReceiver<SessionEvent>>>,
}

impl<S: StorageBackend> WalletManager<S> {
    /// Provider events are queued from the moment a session is installed.
    /// The queue is unbounded, so the host must drain [`take_events`](Self::take_events)
    /// for as long as the manager lives.
    pub fn new(
        storage: S,
        registry: Rc<ProviderRegistry>,
        legacy: Option<Rc<dyn EthereumProvider>>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            storage,
            registry,
            legacy,
            status: Cell::new(ConnectionStatus::NotConnected),
            error: RefCell::new(None),
            session: RefCell::new(None),
            binding: RefCell::new(None),
            attempt: Cell::new(0),
            account_refresh: Cell::new(0),
            next_session_id: Cell::new(0),
            events_tx,
            events_rx: RefCell::new(Some(events_rx)),
        }
    }

    /// Receiving end of the provider event queue. Can be taken once; the host
    /// drains it and feeds each event to [`WalletManager::handle_event`].
    pub fn take_events(&self) -> Option<UnboundedReceiver<SessionEvent>> {
        self.events_rx.borrow_mut().take()
    }

    pub fn registry(&self) -> &Rc<ProviderRegistry> {
        &self.registry
    }

    pub fn has_legacy_provider(&self) -> bool {
        self.legacy.is_some()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Identifier of the bound session, if any
    pub fn session_id(&self) -> Option<u64> {
        self.binding.borrow().as_ref().map(|b| b.session_id)
    }

    /// Chain client over the active provider, for metadata polling
    pub fn chain_client(&self) -> Option<ProviderChainClient> {
        self.binding
            .borrow()
            .as_ref()
            .map(|b| ProviderChainClient::new(b.provider.clone()))
    }

    /// Read-only view of the current state
    pub fn snapshot(&self) -> WalletState {
        WalletState::from_parts(
            self.status.get(),
            self.error.borrow().clone(),
            self.session.borrow().as_ref(),
            self.registry.infos(),
        )
    }

    /// Give the storage backend back, e.g. to simulate a page reload in tests
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Connect `explicit`, or the first discovered provider, or the legacy
    /// injected one. Failures end up in the state's error string.
    pub async fn connect(&self, explicit: Option<Rc<dyn EthereumProvider>>) {
        if self.status.get() == ConnectionStatus::Connecting {
            debug!("Already connecting, skipping duplicate request");
            return;
        }

        let provider = match explicit.or_else(|| self.resolve_default()) {
            Some(provider) => provider,
            None => {
                warn!("No wallet provider available");
                *self.error.borrow_mut() = Some(CoreError::NoProviderFound.user_message());
                return;
            }
        };

        let attempt = self.next_attempt();
        self.status.set(ConnectionStatus::Connecting);
        *self.error.borrow_mut() = None;

        let result = self.establish(&provider, methods::REQUEST_ACCOUNTS).await;
        if self.attempt.get() != attempt {
            debug!("Discarding result of superseded connect attempt {}", attempt);
            return;
        }

        match result {
            Ok(session) => {
                self.clear_disconnect_preference().await;
                if self.attempt.get() != attempt {
                    debug!("Discarding result of superseded connect attempt {}", attempt);
                    return;
                }
                self.install(provider, session);
            }
            Err(e) => {
                error!("Error connecting wallet: {}", e);
                let fallback = if self.session.borrow().is_some() {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::NotConnected
                };
                self.status.set(fallback);
                *self.error.borrow_mut() = Some(e.user_message());
            }
        }
    }

    /// Connect the discovered provider with the given uuid
    pub async fn connect_by_uuid(&self, uuid: &str) {
        match self.registry.find_by_uuid(uuid) {
            Some(detail) => self.connect(Some(detail.provider)).await,
            None => {
                if self.status.get() == ConnectionStatus::Connecting {
                    return;
                }
                warn!("No discovered provider with uuid {}", uuid);
                *self.error.borrow_mut() = Some(CoreError::NoProviderFound.user_message());
            }
        }
    }

    /// Drop the session and remember that the user asked for it
    pub async fn disconnect(&self) {
        self.next_attempt();
        self.reset_session();
        *self.error.borrow_mut() = None;
        info!("Wallet disconnected");

        if let Err(e) = self.storage.save(keys::WALLET_DISCONNECTED, &true).await {
            warn!("Failed to persist disconnect preference: {}", e);
        }
    }

    pub fn clear_error(&self) {
        *self.error.borrow_mut() = None;
    }

    /// Whether the user explicitly disconnected on a previous visit
    pub async fn is_disconnect_preferred(&self) -> bool {
        match self.storage.load::<bool>(keys::WALLET_DISCONNECTED).await {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!("Failed to read disconnect preference: {}", e);
                false
            }
        }
    }

    /// Startup check: silently rebuild the session from a legacy injected
    /// provider that already authorized this page. Never prompts and never
    /// shows a connecting state. Returns whether a session was restored.
    pub async fn restore_existing_connection(&self) -> bool {
        if self.is_disconnect_preferred().await {
            info!("User previously disconnected, skipping auto-connect");
            return false;
        }

        let provider = match &self.legacy {
            Some(provider) => provider.clone(),
            None => {
                debug!("No injected provider to check for an existing connection");
                return false;
            }
        };

        if self.status.get() != ConnectionStatus::NotConnected {
            debug!("Connection already in progress, skipping auto-connect");
            return false;
        }

        let attempt = self.next_attempt();
        match self.establish(&provider, methods::ACCOUNTS).await {
            Ok(session) if self.attempt.get() == attempt => {
                info!("Restored existing connection for {}", session.account);
                self.install(provider, session);
                true
            }
            Ok(_) => {
                debug!("Discarding superseded auto-connect");
                false
            }
            Err(CoreError::NoAccountsReturned) => {
                debug!("Wallet has no authorized accounts");
                false
            }
            Err(e) => {
                warn!("Error checking existing connection: {}", e);
                false
            }
        }
    }

    /// React to a queued provider event
    pub async fn handle_event(&self, event: SessionEvent) -> EventOutcome {
        if self.session_id() != Some(event.session_id) {
            debug!("Dropping event for stale session {}", event.session_id);
            return EventOutcome::Ignored;
        }

        match event.kind {
            SessionEventKind::AccountsChanged(payload) => self.on_accounts_changed(&payload).await,
            SessionEventKind::ChainChanged(chain_id) => {
                info!("Chain changed: {}", chain_id);
                self.next_attempt();
                self.reset_session();
                EventOutcome::ReloadRequired
            }
        }
    }

    async fn on_accounts_changed(&self, payload: &Value) -> EventOutcome {
        let accounts = match parse_accounts(payload) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Ignoring malformed accountsChanged payload: {}", e);
                return EventOutcome::Ignored;
            }
        };
        info!("Accounts changed: {:?}", accounts);

        let Some(first) = accounts.first() else {
            self.disconnect().await;
            return EventOutcome::Disconnected;
        };

        let current = self.session.borrow().as_ref().map(|s| s.account.clone());
        if current.as_deref().is_some_and(|c| same_address(c, first)) {
            return EventOutcome::Unchanged;
        }

        let accounts: Vec<String> = accounts
            .iter()
            .map(|a| checksum_address(a).unwrap_or_else(|_| a.clone()))
            .collect();
        let Some(client) = self.chain_client() else {
            return EventOutcome::Ignored;
        };

        let attempt = self.attempt.get();
        let refresh = self.account_refresh.get() + 1;
        self.account_refresh.set(refresh);

        let balance = client.get_balance(&accounts[0]).await;
        if self.attempt.get() != attempt || self.account_refresh.get() != refresh {
            debug!("Discarding superseded account refresh");
            return EventOutcome::Ignored;
        }

        match balance {
            Ok(balance) => {
                if let Some(session) = self.session.borrow_mut().as_mut() {
                    session.account = accounts[0].clone();
                    session.balance = format_ether_balance(balance);
                    session.available_accounts = accounts;
                }
                EventOutcome::AccountSwitched
            }
            Err(e) => {
                error!("Error updating account balance: {}", e);
                EventOutcome::Ignored
            }
        }
    }

    fn resolve_default(&self) -> Option<Rc<dyn EthereumProvider>> {
        self.registry
            .first()
            .map(|detail| detail.provider)
            .or_else(|| self.legacy.clone())
    }

    fn next_attempt(&self) -> u64 {
        let attempt = self.attempt.get() + 1;
        self.attempt.set(attempt);
        attempt
    }

    /// Ask `provider` for accounts with `method` and read the rest of the session
    async fn establish(
        &self,
        provider: &Rc<dyn EthereumProvider>,
        method: &str,
    ) -> Result<ConnectionSession, CoreError> {
        let accounts = parse_accounts(&provider.request(method, json!([])).await?)?;
        if accounts.is_empty() {
            return Err(CoreError::NoAccountsReturned);
        }
        let accounts = accounts
            .iter()
            .map(|a| checksum_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        let account = accounts[0].clone();

        let client = ProviderChainClient::new(provider.clone());
        let balance = client.get_balance(&account).await?;
        let network = client.get_network().await?;
        info!("Connected to network: {} ({})", network.name, network.chain_id);

        Ok(ConnectionSession {
            account,
            balance: format_ether_balance(balance),
            network: friendly_network_label(&network.name),
            chain_id: network.chain_id,
            provider_info: self.registry.info_for(provider),
            available_accounts: accounts,
        })
    }

    async fn clear_disconnect_preference(&self) {
        if let Err(e) = self.storage.remove(keys::WALLET_DISCONNECTED).await {
            warn!("Failed to clear disconnect preference: {}", e);
        }
    }

    /// Make `session` the active one, moving listeners to `provider`
    fn install(&self, provider: Rc<dyn EthereumProvider>, session: ConnectionSession) {
        self.unbind();

        let session_id = self.next_session_id.get() + 1;
        self.next_session_id.set(session_id);

        let accounts_handler = self.forwarder(session_id, SessionEventKind::AccountsChanged);
        let chain_handler = self.forwarder(session_id, SessionEventKind::ChainChanged);
        if let Err(e) = provider.on(events::ACCOUNTS_CHANGED, &accounts_handler) {
            warn!("Failed to subscribe to accountsChanged: {}", e);
        }
        if let Err(e) = provider.on(events::CHAIN_CHANGED, &chain_handler) {
            warn!("Failed to subscribe to chainChanged: {}", e);
        }

        *self.binding.borrow_mut() = Some(Binding {
            provider,
            accounts_handler,
            chain_handler,
            session_id,
        });
        *self.session.borrow_mut() = Some(session);
        *self.error.borrow_mut() = None;
        self.status.set(ConnectionStatus::Connected);
    }

    fn forwarder(&self, session_id: u64, kind: fn(Value) -> SessionEventKind) -> EventHandler {
        let tx = self.events_tx.clone();
        Rc::new(move |payload: Value| {
            let event = SessionEvent {
                session_id,
                kind: kind(payload),
            };
            if tx.unbounded_send(event).is_err() {
                debug!("Event queue closed, dropping provider event");
            }
        })
    }

    fn unbind(&self) {
        let binding = self.binding.borrow_mut().take();
        if let Some(binding) = binding {
            if let Err(e) = binding
                .provider
                .remove_listener(events::ACCOUNTS_CHANGED, &binding.accounts_handler)
            {
                warn!("Failed to remove accountsChanged listener: {}", e);
            }
            if let Err(e) = binding
                .provider
                .remove_listener(events::CHAIN_CHANGED, &binding.chain_handler)
            {
                warn!("Failed to remove chainChanged listener: {}", e);
            }
        }
    }

    fn reset_session(&self) {
        self.unbind();
        *self.session.borrow_mut() = None;
        self.status.set(ConnectionStatus::NotConnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderInfo;
    use crate::provider::ProviderDetail;
    use crate::storage_trait::MemoryStorage;
    use crate::testing::{FailingStorage, MockProvider};
    use futures_util::{poll, StreamExt};

    const ALICE: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const ALICE_CHECKSUM: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const BOB: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
    const BOB_CHECKSUM: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const ONE_ETHER: &str = "0xde0b6b3a7640000";

    fn detail(uuid: &str, name: &str, provider: Rc<MockProvider>) -> ProviderDetail {
        ProviderDetail {
            info: ProviderInfo {
                uuid: uuid.to_string(),
                name: name.to_string(),
                icon: String::new(),
                rdns: format!("io.{}", name.to_lowercase()),
            },
            provider,
        }
    }

    fn with_legacy(provider: Rc<MockProvider>) -> WalletManager<MemoryStorage> {
        WalletManager::new(MemoryStorage::new(), ProviderRegistry::shared(), Some(provider))
    }

    fn with_registry(details: Vec<ProviderDetail>) -> WalletManager<MemoryStorage> {
        let registry = ProviderRegistry::shared();
        for d in details {
            registry.announce(d);
        }
        WalletManager::new(MemoryStorage::new(), registry, None)
    }

    async fn stored_preference(manager: &WalletManager<MemoryStorage>) -> bool {
        manager.is_disconnect_preferred().await
    }

    #[tokio::test]
    async fn connect_builds_session() {
        let provider = MockProvider::wallet(&[ALICE, BOB], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());

        manager.connect(None).await;

        let state = manager.snapshot();
        assert!(state.is_connected);
        assert!(!state.is_connecting);
        assert_eq!(state.account.as_deref(), Some(ALICE_CHECKSUM));
        assert_eq!(state.balance, "1.0");
        assert_eq!(state.network, "Ethereum Mainnet");
        assert_eq!(state.available_accounts, vec![ALICE_CHECKSUM, BOB_CHECKSUM]);
        assert_eq!(state.selected_provider_info, None);
        assert_eq!(state.error, None);
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 1);
        assert_eq!(provider.listener_count(events::CHAIN_CHANGED), 1);
    }

    #[tokio::test]
    async fn non_mainnet_label_passes_through() {
        let provider = MockProvider::wallet(&[ALICE], 11155111, "0x0");
        let manager = with_legacy(provider);

        manager.connect(None).await;

        let state = manager.snapshot();
        assert_eq!(state.network, "sepolia");
        assert_eq!(state.balance, "0.0");
    }

    #[tokio::test]
    async fn first_discovered_provider_wins_over_legacy() {
        let announced = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let legacy = MockProvider::wallet(&[BOB], 1, ONE_ETHER);
        let registry = ProviderRegistry::shared();
        registry.announce(detail("uuid-mm", "MetaMask", announced.clone()));
        let manager = WalletManager::new(MemoryStorage::new(), registry, Some(legacy.clone()));

        manager.connect(None).await;

        let state = manager.snapshot();
        assert_eq!(state.account.as_deref(), Some(ALICE_CHECKSUM));
        assert_eq!(state.selected_provider_info.unwrap().uuid, "uuid-mm");
        assert_eq!(legacy.call_count("eth_requestAccounts"), 0);
    }

    #[tokio::test]
    async fn missing_provider_is_reported_not_thrown() {
        let manager = with_registry(Vec::new());

        manager.connect(None).await;

        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert!(!state.is_connecting);
        assert_eq!(state.error.as_deref(), Some("Please install MetaMask or Rabby Wallet!"));
    }

    #[tokio::test]
    async fn rejection_surfaces_provider_message() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        provider.reject("eth_requestAccounts", Some(4001), "User rejected the request.");
        let manager = with_legacy(provider.clone());

        manager.connect(None).await;

        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert!(!state.is_connecting);
        assert_eq!(state.error.as_deref(), Some("User rejected the request."));
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 0);
        assert_eq!(manager.session_id(), None);
    }

    #[tokio::test]
    async fn empty_account_list_is_an_error() {
        let provider = MockProvider::wallet(&[], 1, ONE_ETHER);
        let manager = with_legacy(provider);

        manager.connect(None).await;

        assert_eq!(
            manager.snapshot().error.as_deref(),
            Some("No accounts returned from wallet")
        );
    }

    #[tokio::test]
    async fn next_connect_clears_previous_error() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        provider.reject("eth_requestAccounts", Some(4001), "User rejected the request.");
        let manager = with_legacy(provider.clone());
        manager.connect(None).await;
        assert!(manager.snapshot().error.is_some());

        provider.respond("eth_requestAccounts", json!([ALICE]));
        manager.connect(None).await;

        let state = manager.snapshot();
        assert!(state.is_connected);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn connect_while_connecting_is_a_no_op() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let gate = provider.gate("eth_requestAccounts");
        let manager = with_legacy(provider.clone());

        let mut first = Box::pin(manager.connect(None));
        assert!(poll!(first.as_mut()).is_pending());
        let before = manager.snapshot();
        assert!(before.is_connecting);

        manager.connect(None).await;
        assert_eq!(provider.call_count("eth_requestAccounts"), 1);
        assert_eq!(manager.snapshot(), before);

        gate.send(()).unwrap();
        first.await;
        assert!(manager.snapshot().is_connected);
        assert_eq!(provider.call_count("eth_requestAccounts"), 1);
    }

    #[tokio::test]
    async fn disconnect_during_connect_discards_late_result() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let gate = provider.gate("eth_requestAccounts");
        let manager = with_legacy(provider.clone());

        let mut pending = Box::pin(manager.connect(None));
        assert!(poll!(pending.as_mut()).is_pending());

        manager.disconnect().await;
        gate.send(()).unwrap();
        pending.await;

        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert_eq!(state.account, None);
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 0);
        assert!(stored_preference(&manager).await);
    }

    #[tokio::test]
    async fn disconnect_resets_to_sentinels_and_is_idempotent() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        manager.connect(None).await;

        manager.disconnect().await;
        manager.disconnect().await;

        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert_eq!(state.account, None);
        assert_eq!(state.balance, "0");
        assert_eq!(state.network, "Not Connected");
        assert_eq!(state.error, None);
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 0);
        assert_eq!(provider.listener_count(events::CHAIN_CHANGED), 0);
        assert!(manager.chain_client().is_none());
    }

    #[tokio::test]
    async fn explicit_connect_clears_disconnect_preference() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider);
        manager.disconnect().await;
        assert!(stored_preference(&manager).await);

        manager.connect(None).await;

        assert!(!stored_preference(&manager).await);
    }

    #[tokio::test]
    async fn switching_provider_moves_listeners() {
        let metamask = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let rabby = MockProvider::wallet(&[BOB], 1, ONE_ETHER);
        let manager = with_registry(vec![
            detail("uuid-mm", "MetaMask", metamask.clone()),
            detail("uuid-rabby", "Rabby", rabby.clone()),
        ]);

        manager.connect_by_uuid("uuid-mm").await;
        manager.connect_by_uuid("uuid-rabby").await;

        let state = manager.snapshot();
        assert_eq!(state.account.as_deref(), Some(BOB_CHECKSUM));
        assert_eq!(state.selected_provider_info.unwrap().name, "Rabby");
        assert_eq!(state.discovered_providers.len(), 2);
        assert_eq!(metamask.listener_count(events::ACCOUNTS_CHANGED), 0);
        assert_eq!(metamask.listener_count(events::CHAIN_CHANGED), 0);
        assert_eq!(rabby.listener_count(events::ACCOUNTS_CHANGED), 1);
        assert_eq!(rabby.listener_count(events::CHAIN_CHANGED), 1);
    }

    #[tokio::test]
    async fn unknown_uuid_reports_missing_provider() {
        let manager = with_registry(Vec::new());
        manager.connect_by_uuid("nope").await;
        assert!(manager.snapshot().error.unwrap().contains("install"));
    }

    #[tokio::test]
    async fn empty_accounts_event_disconnects() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;

        provider.emit(events::ACCOUNTS_CHANGED, json!([]));
        let event = queue.next().await.unwrap();
        assert_eq!(manager.handle_event(event).await, EventOutcome::Disconnected);

        let state = manager.snapshot();
        assert_eq!(state.account, None);
        assert_eq!(state.balance, "0");
        assert_eq!(state.network, "Not Connected");
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 0);
        assert!(stored_preference(&manager).await);
    }

    #[tokio::test]
    async fn unchanged_first_account_skips_balance_refetch() {
        let provider = MockProvider::wallet(&[ALICE, BOB], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;
        let balance_calls = provider.call_count("eth_getBalance");

        provider.emit(events::ACCOUNTS_CHANGED, json!([ALICE, BOB]));
        let event = queue.next().await.unwrap();

        assert_eq!(manager.handle_event(event).await, EventOutcome::Unchanged);
        assert_eq!(provider.call_count("eth_getBalance"), balance_calls);
        assert_eq!(manager.snapshot().account.as_deref(), Some(ALICE_CHECKSUM));
    }

    #[tokio::test]
    async fn new_first_account_switches_and_refetches_balance() {
        let provider = MockProvider::wallet(&[ALICE, BOB], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;
        let balance_calls = provider.call_count("eth_getBalance");

        provider.respond("eth_getBalance", json!("0x1bc16d674ec80000"));
        provider.emit(events::ACCOUNTS_CHANGED, json!([BOB, ALICE]));
        let event = queue.next().await.unwrap();

        assert_eq!(manager.handle_event(event).await, EventOutcome::AccountSwitched);
        assert_eq!(provider.call_count("eth_getBalance"), balance_calls + 1);
        assert_eq!(
            provider.last_params("eth_getBalance"),
            Some(json!([BOB_CHECKSUM, "latest"]))
        );

        let state = manager.snapshot();
        assert_eq!(state.account.as_deref(), Some(BOB_CHECKSUM));
        assert_eq!(state.balance, "2.0");
        assert_eq!(state.available_accounts, vec![BOB_CHECKSUM, ALICE_CHECKSUM]);
        assert_eq!(state.network, "Ethereum Mainnet");
    }

    #[tokio::test]
    async fn failed_balance_refresh_keeps_session() {
        let provider = MockProvider::wallet(&[ALICE, BOB], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;

        provider.fail("eth_getBalance", "header not found");
        provider.emit(events::ACCOUNTS_CHANGED, json!([BOB]));
        let event = queue.next().await.unwrap();

        assert_eq!(manager.handle_event(event).await, EventOutcome::Ignored);
        let state = manager.snapshot();
        assert_eq!(state.account.as_deref(), Some(ALICE_CHECKSUM));
        assert_eq!(state.balance, "1.0");
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn chain_change_requires_reload() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;

        provider.emit(events::CHAIN_CHANGED, json!("0xaa36a7"));
        let event = queue.next().await.unwrap();

        assert_eq!(manager.handle_event(event).await, EventOutcome::ReloadRequired);
        assert!(!manager.snapshot().is_connected);
        assert_eq!(provider.listener_count(events::CHAIN_CHANGED), 0);
        assert!(!stored_preference(&manager).await);
    }

    #[tokio::test]
    async fn events_from_previous_session_are_dropped() {
        let provider = MockProvider::wallet(&[ALICE, BOB], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        let mut queue = manager.take_events().unwrap();
        manager.connect(None).await;

        provider.emit(events::ACCOUNTS_CHANGED, json!([BOB]));
        manager.disconnect().await;
        manager.connect(None).await;

        let stale = queue.next().await.unwrap();
        assert_eq!(manager.handle_event(stale).await, EventOutcome::Ignored);
        assert_eq!(manager.snapshot().account.as_deref(), Some(ALICE_CHECKSUM));
    }

    #[tokio::test]
    async fn restore_uses_silent_query() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());

        assert!(manager.restore_existing_connection().await);

        assert!(manager.snapshot().is_connected);
        assert_eq!(provider.call_count("eth_accounts"), 1);
        assert_eq!(provider.call_count("eth_requestAccounts"), 0);
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 1);
    }

    #[tokio::test]
    async fn restore_never_shows_connecting() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let gate = provider.gate("eth_accounts");
        let manager = with_legacy(provider.clone());

        let mut restore = Box::pin(manager.restore_existing_connection());
        assert!(poll!(restore.as_mut()).is_pending());
        assert!(!manager.snapshot().is_connecting);

        gate.send(()).unwrap();
        assert!(restore.await);
    }

    #[tokio::test]
    async fn restore_without_authorized_accounts_stays_disconnected() {
        let provider = MockProvider::wallet(&[], 1, ONE_ETHER);
        let manager = with_legacy(provider);

        assert!(!manager.restore_existing_connection().await);
        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn restore_failure_is_not_surfaced() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        provider.fail("eth_accounts", "Internal JSON-RPC error");
        let manager = with_legacy(provider);

        assert!(!manager.restore_existing_connection().await);
        assert_eq!(manager.snapshot().error, None);
    }

    #[tokio::test]
    async fn restore_ignores_discovered_providers() {
        let announced = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_registry(vec![detail("uuid-mm", "MetaMask", announced.clone())]);

        assert!(!manager.restore_existing_connection().await);
        assert_eq!(announced.call_count("eth_accounts"), 0);
    }

    #[tokio::test]
    async fn disconnect_survives_reload() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        manager.connect(None).await;
        manager.disconnect().await;

        // a fresh manager over the same storage stands in for a page reload
        let storage = manager.into_storage();
        let reloaded = WalletManager::new(storage, ProviderRegistry::shared(), Some(provider.clone()));

        assert!(!reloaded.restore_existing_connection().await);
        assert!(!reloaded.snapshot().is_connected);
        assert_eq!(provider.call_count("eth_accounts"), 0);
    }

    #[tokio::test]
    async fn failed_reconnect_keeps_existing_session() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = with_legacy(provider.clone());
        manager.connect(None).await;

        provider.fail("eth_requestAccounts", "nope");
        manager.connect(None).await;

        let state = manager.snapshot();
        assert!(state.is_connected);
        assert!(!state.is_connecting);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(state.account.as_deref(), Some(ALICE_CHECKSUM));
        assert_eq!(state.error.as_deref(), Some("nope"));
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 1);
    }

    #[tokio::test]
    async fn storage_failures_do_not_block_connect_or_disconnect() {
        let provider = MockProvider::wallet(&[ALICE], 1, ONE_ETHER);
        let manager = WalletManager::new(FailingStorage, ProviderRegistry::shared(), Some(provider.clone()));

        manager.connect(None).await;
        let state = manager.snapshot();
        assert!(state.is_connected);
        assert_eq!(state.error, None);

        manager.disconnect().await;
        let state = manager.snapshot();
        assert!(!state.is_connected);
        assert_eq!(state.account, None);
        assert_eq!(state.error, None);
        assert_eq!(provider.listener_count(events::ACCOUNTS_CHANGED), 0);
    }
}
