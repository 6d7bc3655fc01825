// Page-side session host - owns the manager and drives the event pump,
// metadata polling and the simulated swap

use crate::storage::AppStorage;
use futures_util::StreamExt;
use log::{debug, error, info};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wallet_connect_core::swap::{format_usd, max_amount};
use wallet_connect_core::views;
use wallet_connect_core::wasm::{legacy_injected, reload_page, sleep_ms, ProviderDiscovery};
use wallet_connect_core::{
    ChainMetadataPoller, CoreError, EventOutcome, InstallLink, ProviderRegistry, Settings,
    SwapError, SwapForm, SwapStatus, WalletManager, WalletState,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

/// Everything the wallet button, wallet panel and swap form render
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub state: WalletState,
    pub button_label: &'static str,
    pub show_picker: bool,
    pub has_no_wallet: bool,
    pub short_account: Option<String>,
    pub display_balance: String,
    pub explorer_url: Option<String>,
    pub install_links: Vec<InstallLink>,
    pub recipients: Vec<views::RecipientOption>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapView {
    pub amount: String,
    pub recipient: String,
    pub status: SwapStatus,
    pub button_label: Option<&'static str>,
    pub usd_estimate: String,
}

pub struct Session {
    pub settings: Settings,
    pub manager: WalletManager<AppStorage>,
    pub poller: ChainMetadataPoller,
    swap: RefCell<SwapForm>,
    discovery: RefCell<Option<ProviderDiscovery>>,
    subscribers: RefCell<Vec<js_sys::Function>>,
    polled_session: Cell<Option<u64>>,
    started: Cell<bool>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let storage = AppStorage::detect(&settings.storage_prefix);
        let manager = WalletManager::new(storage, ProviderRegistry::shared(), legacy_injected());
        let poller = ChainMetadataPoller::new(settings.poll_interval_ms);
        Self {
            settings,
            manager,
            poller,
            swap: RefCell::new(SwapForm::default()),
            discovery: RefCell::new(None),
            subscribers: RefCell::new(Vec::new()),
            polled_session: Cell::new(None),
            started: Cell::new(false),
        }
    }

    /// Discovery, event pump and the silent reconnect check. Runs once per page.
    pub async fn start(self: &Rc<Self>) -> Result<(), CoreError> {
        if self.started.replace(true) {
            debug!("Session already started");
            return Ok(());
        }

        // Announcements arrive synchronously while the request event is dispatched
        let discovery = ProviderDiscovery::start(self.manager.registry().clone())?;
        *self.discovery.borrow_mut() = Some(discovery);
        self.spawn_event_pump();

        if self.manager.restore_existing_connection().await {
            self.ensure_polling();
        }
        self.notify();
        Ok(())
    }

    pub async fn connect(self: &Rc<Self>, uuid: Option<String>) {
        match uuid {
            Some(uuid) => self.manager.connect_by_uuid(&uuid).await,
            None => self.manager.connect(None).await,
        }
        self.ensure_polling();
        self.notify();
    }

    pub async fn disconnect(&self) {
        self.stop_polling();
        self.manager.disconnect().await;
        self.notify();
    }

    pub fn clear_error(&self) {
        self.manager.clear_error();
        self.notify();
    }

    pub fn subscribe(&self, callback: js_sys::Function) {
        self.subscribers.borrow_mut().push(callback);
    }

    /// Push the current view model to every subscriber
    pub fn notify(&self) {
        let payload = match serde_json::to_string(&self.view_model()) {
            Ok(json) => JsValue::from_str(&json),
            Err(e) => {
                error!("Failed to serialize view model: {}", e);
                return;
            }
        };
        let subscribers = self.subscribers.borrow().clone();
        for callback in subscribers {
            if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                error!("Subscriber threw: {:?}", e);
            }
        }
    }

    pub fn view_model(&self) -> ViewModel {
        let state = self.manager.snapshot();
        let has_legacy = self.manager.has_legacy_provider();
        let explorer_url = state
            .account
            .as_deref()
            .map(|account| views::explorer_address_url(&self.settings, &state.network, account));

        ViewModel {
            button_label: views::connect_button_label(&state, has_legacy),
            show_picker: views::should_show_picker(&state),
            has_no_wallet: views::has_no_wallet(&state, has_legacy),
            short_account: state.account.as_deref().map(views::format_address),
            display_balance: views::format_balance(&state.balance),
            explorer_url,
            install_links: views::install_links_for(state.error.as_deref(), &self.settings).to_vec(),
            recipients: views::recipient_options(&state),
            state,
        }
    }

    pub fn swap_view(&self) -> SwapView {
        let state = self.manager.snapshot();
        let swap = self.swap.borrow();
        SwapView {
            amount: swap.amount.clone(),
            recipient: swap.recipient.clone(),
            status: swap.status,
            button_label: swap.status.button_label(),
            usd_estimate: format_usd(swap.usd_estimate(&state, self.settings.reference_usd_rate)),
        }
    }

    pub fn set_swap_amount(&self, amount: &str) {
        self.swap.borrow_mut().amount = amount.to_string();
    }

    pub fn set_swap_recipient(&self, recipient: &str) {
        self.swap.borrow_mut().recipient = recipient.to_string();
    }

    pub fn swap_max(&self) -> Option<String> {
        let state = self.manager.snapshot();
        self.swap.borrow_mut().set_max(&state);
        max_amount(&state)
    }

    /// Loading for the simulation time, then success, then idle again
    pub async fn simulate_swap(&self) -> Result<(), SwapError> {
        let state = self.manager.snapshot();
        self.swap.borrow_mut().start(&state)?;
        info!("Simulating swap of {}", self.swap.borrow().amount);
        self.notify();

        sleep_ms(self.settings.swap_simulation_ms).await;
        self.swap.borrow_mut().complete();
        self.notify();

        sleep_ms(self.settings.swap_reset_ms).await;
        self.swap.borrow_mut().reset();
        self.notify();
        Ok(())
    }

    fn spawn_event_pump(self: &Rc<Self>) {
        let Some(mut events) = self.manager.take_events() else {
            return;
        };
        let session = self.clone();
        spawn_local(async move {
            while let Some(event) = events.next().await {
                match session.manager.handle_event(event).await {
                    EventOutcome::ReloadRequired => {
                        session.stop_polling();
                        if let Err(e) = reload_page() {
                            error!("{}", e);
                        }
                    }
                    EventOutcome::Disconnected => session.stop_polling(),
                    EventOutcome::AccountSwitched
                    | EventOutcome::Unchanged
                    | EventOutcome::Ignored => {}
                }
                session.notify();
            }
        });
    }

    /// Start polling for the current session unless that session is already polled
    fn ensure_polling(self: &Rc<Self>) {
        let Some(session_id) = self.manager.session_id() else {
            return;
        };
        if self.polled_session.get() == Some(session_id) {
            return;
        }
        let Some(client) = self.manager.chain_client() else {
            return;
        };
        self.polled_session.set(Some(session_id));
        self.poller.reset();

        let session = self.clone();
        spawn_local(async move {
            let keep_going = || session.manager.session_id() == Some(session_id);
            let sleep = |ms: u64| {
                session.notify();
                sleep_ms(ms)
            };
            session.poller.run(&client, keep_going, sleep).await;
        });
    }

    fn stop_polling(&self) {
        self.poller.stop();
        self.poller.reset();
        self.polled_session.set(None);
    }
}
