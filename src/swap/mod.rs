//! Risk-gated swap controller.
//!
//! Owns the one piece of mutable dashboard state: the latest risk snapshot
//! and prediction price, the wallet session, balances, the pending sell
//! amount and direction, and the status line. Reads are absorbed silently
//! (stale data stays on screen); every write-path failure ends up in the
//! status line and is also returned as a typed `SwapError`.
//!
//! Flow:
//! - `start()` spawns the poll loop, `stop()` tears it down
//! - `refresh()` reads risk signal, prediction price and balances concurrently
//! - `connect()` → network check → balances
//! - `set_sell_amount()` / `toggle_direction()` → `refresh_approval()`
//! - `approve()` / `swap()` submit through the wallet

pub mod error;
pub mod status;


use crate::config::{Deployment, TokenSpec};
use crate::feeds::PredictionFetcher;
use crate::onchain::abi;
use crate::onchain::{OnChainState, ReadTransport, RiskSignalReader, RiskTier, TokenReader};
use crate::units::{format_units, is_positive_amount, parse_positive_units, parse_units};
use crate::wallet::{ChainParams, TransactionRequest, WalletEvent, WalletProvider};
use alloy::primitives::{Address, B256, I256, U256};
use futures::future::OptionFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use error::{SwapError, BLOCKED_MESSAGE};
pub use status::{StatusKind, SwapStatus};

/// Seconds from submission until the router rejects the swap.
pub const SWAP_DEADLINE_SECS: u64 = 300;

/// Which token is being sold. `zero_for_one` sells USDC for WETH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapDirection {
    pub zero_for_one: bool,
}

impl Default for SwapDirection {
    fn default() -> Self {
        Self { zero_for_one: true }
    }
}

impl SwapDirection {
    pub const SELL_USDC: SwapDirection = SwapDirection { zero_for_one: true };
    pub const SELL_WETH: SwapDirection = SwapDirection { zero_for_one: false };

    pub fn toggled(self) -> Self {
        Self {
            zero_for_one: !self.zero_for_one,
        }
    }

    pub fn sell_token(self, d: &Deployment) -> TokenSpec {
        if self.zero_for_one {
            d.usdc
        } else {
            d.weth
        }
    }

    pub fn buy_token(self, d: &Deployment) -> TokenSpec {
        self.toggled().sell_token(d)
    }

    /// Price bound that lets the swap run to completion in this direction.
    pub fn sqrt_price_limit(self) -> U256 {
        if self.zero_for_one {
            abi::MIN_SQRT_PRICE_PLUS_1
        } else {
            abi::MAX_SQRT_PRICE_MINUS_1
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSession {
    pub address: Address,
    pub network_matches: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(WalletSession),
}

/// Raw token balances of the connected address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub usdc: U256,
    pub weth: U256,
}

impl Balances {
    pub fn of(&self, token: &TokenSpec, d: &Deployment) -> U256 {
        if token.address == d.usdc.address {
            self.usdc
        } else {
            self.weth
        }
    }
}

/// Everything the dashboard displays, as of now.
#[derive(Debug, Clone, Default)]
pub struct SwapState {
    pub on_chain: Option<OnChainState>,
    pub probability: Option<f64>,
    pub connection: ConnectionState,
    pub balances: Balances,
    pub direction: SwapDirection,
    pub sell_amount: String,
    /// Advisory: last allowance check for the current amount and direction.
    pub approved: bool,
    pub status: SwapStatus,
}

impl SwapState {
    /// Effective tier, if a snapshot has landed yet.
    pub fn tier(&self) -> Option<RiskTier> {
        self.on_chain.map(|s| s.tier())
    }

    pub fn session(&self) -> Option<WalletSession> {
        match self.connection {
            ConnectionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<Address> {
        self.session().map(|s| s.address)
    }

    pub fn has_amount(&self) -> bool {
        is_positive_amount(&self.sell_amount)
    }

    fn reset_session(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.balances = Balances::default();
        self.approved = false;
    }
}

struct Inner {
    deployment: Deployment,
    risk: RiskSignalReader,
    prediction: PredictionFetcher,
    tokens: TokenReader,
    wallet: Option<Arc<dyn WalletProvider>>,
    state: RwLock<SwapState>,
    /// Bumped on every amount/direction/session change; allowance results
    /// computed under an older value are dropped.
    approval_gen: AtomicU64,
    poller: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct SwapController {
    inner: Arc<Inner>,
}

impl SwapController {
    pub fn new(
        deployment: Deployment,
        transport: Arc<dyn ReadTransport>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Self {
        let risk = RiskSignalReader::new(transport.clone(), deployment.risk_signal);
        let prediction = PredictionFetcher::new(
            transport.clone(),
            deployment.clob_url.clone(),
            deployment.condition_id,
        );
        let tokens = TokenReader::new(transport);

        Self {
            inner: Arc::new(Inner {
                deployment,
                risk,
                prediction,
                tokens,
                wallet,
                state: RwLock::new(SwapState::default()),
                approval_gen: AtomicU64::new(0),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.inner.deployment
    }

    pub async fn snapshot(&self) -> SwapState {
        self.inner.state.read().await.clone()
    }

    pub async fn status(&self) -> SwapStatus {
        self.inner.state.read().await.status.clone()
    }

    async fn set_status(&self, status: SwapStatus) {
        debug!(status = %status, "status");
        self.inner.state.write().await.status = status;
    }

    /// Record a failure in the status line and hand it back.
    async fn fail<T>(&self, err: SwapError) -> Result<T, SwapError> {
        self.set_status(SwapStatus::error(err.user_message())).await;
        Err(err)
    }

    fn bump_generation(&self) -> u64 {
        self.inner.approval_gen.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ─── Polling lifecycle ──────────────────────────────────────────────────

    /// Spawn the poll loop. The first refresh runs immediately. Calling
    /// `start` again replaces the running loop.
    pub async fn start(&self, every: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SwapController { inner }.refresh().await;
            }
        });

        if let Some(prev) = self.inner.poller.lock().await.replace(handle) {
            prev.abort();
        }
        info!(interval_secs = every.as_secs(), "polling started");
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.inner.poller.lock().await.take() {
            handle.abort();
            info!("polling stopped");
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    /// Poll risk signal, prediction price and (with a session) balances
    /// concurrently. Each result is applied on its own; failures keep the
    /// previous value.
    pub async fn refresh(&self) {
        let owner = self.inner.state.read().await.address();
        let balances: OptionFuture<_> = owner.map(|o| self.read_balances(o)).into();

        let (state, prob, balances) = tokio::join!(
            self.inner.risk.fetch(),
            self.inner.prediction.fetch_probability(),
            balances,
        );

        let mut s = self.inner.state.write().await;

        match state {
            Ok(next) => {
                if s.tier() != Some(next.tier()) {
                    info!(
                        tier = %next.tier(),
                        raw = next.raw_tier,
                        stale = next.is_stale,
                        "effective tier changed"
                    );
                }
                s.on_chain = Some(next);
            }
            Err(e) => debug!(error = %e, "risk signal poll failed, keeping last snapshot"),
        }

        match prob {
            Ok(p) => s.probability = Some(p),
            Err(e) => debug!(error = %e, "prediction poll failed, keeping last price"),
        }

        if let Some(Some(b)) = balances {
            // session may have changed while we were reading
            if s.address() == owner {
                s.balances = b;
            }
        }
    }

    async fn read_balances(&self, owner: Address) -> Option<Balances> {
        let d = &self.inner.deployment;
        let (usdc, weth) = tokio::join!(
            self.inner.tokens.balance_of(d.usdc.address, owner),
            self.inner.tokens.balance_of(d.weth.address, owner),
        );
        match (usdc, weth) {
            (Ok(usdc), Ok(weth)) => Some(Balances { usdc, weth }),
            (Err(e), _) | (_, Err(e)) => {
                debug!(owner = %owner, error = %e, "balance read failed");
                None
            }
        }
    }

    // ─── Wallet session ─────────────────────────────────────────────────────

    /// Request accounts, then make sure the wallet is on the right chain.
    /// A failed network switch keeps the connection but flags the mismatch.
    pub async fn connect(&self) -> Result<Address, SwapError> {
        let Some(wallet) = self.inner.wallet.clone() else {
            warn!("connect requested but no wallet provider is injected");
            return self.fail(SwapError::ProviderMissing).await;
        };

        self.inner.state.write().await.connection = ConnectionState::Connecting;

        let address = match wallet.request_accounts().await {
            Ok(accounts) => accounts.first().copied(),
            Err(e) => {
                warn!(error = %e, "eth_requestAccounts failed");
                None
            }
        };
        let Some(address) = address else {
            self.inner.state.write().await.reset_session();
            return self
                .fail(SwapError::ConnectionFailed("no account returned".to_string()))
                .await;
        };

        {
            let mut s = self.inner.state.write().await;
            s.connection = ConnectionState::Connected(WalletSession {
                address,
                network_matches: false,
            });
            s.approved = false;
        }
        self.bump_generation();
        info!(address = %address, "wallet connected");

        let network_matches = match self.ensure_network(wallet.as_ref()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "wallet left on wrong network");
                self.set_status(SwapStatus::error(e.user_message())).await;
                false
            }
        };

        let balances = self.read_balances(address).await;
        {
            let mut s = self.inner.state.write().await;
            if let ConnectionState::Connected(session) = &mut s.connection {
                if session.address == address {
                    session.network_matches = network_matches;
                    if let Some(b) = balances {
                        s.balances = b;
                    }
                }
            }
        }

        Ok(address)
    }

    async fn ensure_network(&self, wallet: &dyn WalletProvider) -> Result<(), SwapError> {
        let d = &self.inner.deployment;
        let mismatch = SwapError::NetworkMismatch {
            expected: d.chain_id,
        };

        let actual = match wallet.chain_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "could not read wallet chain id");
                return Err(mismatch);
            }
        };
        if actual == d.chain_id {
            return Ok(());
        }

        warn!(expected = d.chain_id, actual, "wallet on wrong chain, requesting switch");
        match wallet.switch_chain(d.chain_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                info!(chain = %d.chain_name, "chain unknown to wallet, registering it");
                let params = ChainParams::new(d.chain_id, &d.chain_name, &d.rpc_url, &d.explorer_url);
                if let Err(e) = wallet.add_chain(&params).await {
                    warn!(error = %e, "wallet_addEthereumChain failed");
                    return Err(mismatch);
                }
                wallet.switch_chain(d.chain_id).await.map_err(|e| {
                    warn!(error = %e, "switch after add failed");
                    mismatch
                })
            }
            Err(e) => {
                warn!(error = %e, "wallet_switchEthereumChain failed");
                Err(mismatch)
            }
        }
    }

    /// Account or chain changed underneath us: drop the session entirely.
    pub async fn handle_wallet_event(&self, event: WalletEvent) {
        info!(event = ?event, "wallet event, resetting session");
        self.inner.state.write().await.reset_session();
        self.bump_generation();
    }

    // ─── Inputs ─────────────────────────────────────────────────────────────

    /// Replace the pending amount and schedule an allowance re-check.
    pub async fn set_sell_amount(&self, amount: &str) {
        {
            let mut s = self.inner.state.write().await;
            s.sell_amount = amount.to_string();
            s.approved = false;
            self.bump_generation();
        }
        self.spawn_approval_check();
    }

    /// Flip sell/buy, clearing the amount, approval flag and status line.
    pub async fn toggle_direction(&self) -> SwapDirection {
        let direction = {
            let mut s = self.inner.state.write().await;
            s.direction = s.direction.toggled();
            s.sell_amount.clear();
            s.approved = false;
            s.status = SwapStatus::default();
            self.bump_generation();
            s.direction
        };
        self.spawn_approval_check();
        direction
    }

    /// Run `refresh_approval` in the background. Overlapping checks are
    /// fine: only the one matching the latest generation lands.
    fn spawn_approval_check(&self) {
        let ctl = self.clone();
        tokio::spawn(async move {
            ctl.refresh_approval().await;
        });
    }

    /// Set the sell amount to the full balance of the sell token. A failed
    /// read does nothing.
    pub async fn fill_max(&self) {
        let (owner, direction) = {
            let s = self.inner.state.read().await;
            (s.address(), s.direction)
        };
        let Some(owner) = owner else {
            return;
        };

        let token = direction.sell_token(&self.inner.deployment);
        match self.inner.tokens.balance_of(token.address, owner).await {
            Ok(balance) => {
                let mut s = self.inner.state.write().await;
                if s.direction == direction && s.address() == Some(owner) {
                    s.sell_amount = format_units(balance, token.decimals);
                    s.approved = false;
                    self.bump_generation();
                    drop(s);
                    self.spawn_approval_check();
                }
            }
            Err(e) => debug!(token = token.symbol, error = %e, "fill-max balance read failed"),
        }
    }

    // ─── Allowance ──────────────────────────────────────────────────────────

    /// Does the router's allowance on the sell token cover `amount`?
    /// False on any failure.
    pub async fn check_allowance(&self, amount: &str, direction: SwapDirection) -> bool {
        let Some(owner) = self.inner.state.read().await.address() else {
            return false;
        };
        let token = direction.sell_token(&self.inner.deployment);
        let Ok(needed) = parse_units(amount, token.decimals) else {
            return false;
        };

        match self
            .inner
            .tokens
            .allowance(token.address, owner, self.inner.deployment.router)
            .await
        {
            Ok(allowance) => allowance >= needed,
            Err(e) => {
                debug!(token = token.symbol, error = %e, "allowance read failed");
                false
            }
        }
    }

    /// Re-run the allowance check for the current amount and direction.
    ///
    /// Returns `None` when the inputs changed while the read was in flight;
    /// the stale answer is dropped.
    pub async fn refresh_approval(&self) -> Option<bool> {
        let generation = self.inner.approval_gen.load(Ordering::SeqCst);
        let (amount, direction, connected) = {
            let s = self.inner.state.read().await;
            (s.sell_amount.clone(), s.direction, s.address().is_some())
        };

        let approved = if connected && is_positive_amount(&amount) {
            self.check_allowance(&amount, direction).await
        } else {
            false
        };

        let mut s = self.inner.state.write().await;
        if self.inner.approval_gen.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding stale allowance result");
            return None;
        }
        s.approved = approved;
        Some(approved)
    }

    fn signer(&self, state: &SwapState) -> Result<(Arc<dyn WalletProvider>, Address), SwapError> {
        let wallet = self.inner.wallet.clone().ok_or(SwapError::ProviderMissing)?;
        let owner = state.address().ok_or(SwapError::WalletNotConnected)?;
        Ok((wallet, owner))
    }

    // ─── Writes ─────────────────────────────────────────────────────────────

    /// Approve the router to spend `amount` of the sell token.
    pub async fn approve(&self, amount: &str, direction: SwapDirection) -> Result<B256, SwapError> {
        let result = self.try_approve(amount, direction).await;
        match &result {
            Ok(hash) => {
                self.set_status(SwapStatus::success("Approved!").with_hash(*hash))
                    .await;
                self.refresh_approval().await;
            }
            Err(e) => {
                warn!(error = %e, "approval failed");
                self.set_status(SwapStatus::error(format!(
                    "Approval failed: {}",
                    e.user_message()
                )))
                .await;
            }
        }
        result
    }

    async fn try_approve(&self, amount: &str, direction: SwapDirection) -> Result<B256, SwapError> {
        let (wallet, owner) = self.signer(&*self.inner.state.read().await)?;
        let token = direction.sell_token(&self.inner.deployment);
        let parsed = parse_positive_units(amount, token.decimals)?;

        self.set_status(SwapStatus::info("Approving...")).await;
        info!(token = token.symbol, amount = %amount, "submitting approval");

        let tx = TransactionRequest {
            from: owner,
            to: token.address,
            data: abi::approve_call(self.inner.deployment.router, parsed),
        };
        let hash = wallet.send_transaction(&tx).await?;
        let receipt = wallet.wait_for_receipt(hash).await?;
        if !receipt.success {
            return Err(SwapError::Reverted);
        }
        Ok(hash)
    }

    /// Swap exactly `amount` of the sell token.
    ///
    /// Refuses before any network call when the effective tier is Red or no
    /// wallet is connected, and refuses without touching the router when the
    /// allowance no longer covers the amount.
    pub async fn swap(&self, amount: &str) -> Result<B256, SwapError> {
        let (tier, direction, signer) = {
            let s = self.inner.state.read().await;
            (s.tier(), s.direction, self.signer(&s))
        };

        if tier.is_some_and(RiskTier::blocks_swaps) {
            info!("swap refused: effective tier is Red");
            return self.fail(SwapError::TierBlocked).await;
        }
        let (wallet, owner) = match signer {
            Ok(signer) => signer,
            Err(e) => return self.fail(e).await,
        };

        let d = &self.inner.deployment;
        let token = direction.sell_token(d);
        let needed = match parse_positive_units(amount, token.decimals) {
            Ok(v) => v,
            Err(e) => return self.fail(e.into()).await,
        };

        // allowance may have changed since the last advisory check
        let allowance = match self.inner.tokens.allowance(token.address, owner, d.router).await {
            Ok(a) => a,
            Err(e) => return self.fail(SwapError::ReadUnavailable(e.to_string())).await,
        };
        if allowance < needed {
            info!(token = token.symbol, %allowance, %needed, "swap refused: allowance too low");
            return self.fail(SwapError::InsufficientAllowance).await;
        }

        let amount_specified = match I256::try_from(needed) {
            Ok(v) => -v,
            Err(_) => return self.fail(SwapError::Rejected("amount too large".to_string())).await,
        };
        let deadline = U256::from(chrono::Utc::now().timestamp().max(0) as u64 + SWAP_DEADLINE_SECS);

        self.set_status(SwapStatus::info("Sending swap...")).await;
        info!(
            sell = token.symbol,
            amount = %amount,
            zero_for_one = direction.zero_for_one,
            "submitting swap"
        );

        let tx = TransactionRequest {
            from: owner,
            to: d.router,
            data: abi::swap_call(
                direction.zero_for_one,
                amount_specified,
                direction.sqrt_price_limit(),
                deadline,
            ),
        };

        let hash = match wallet.send_transaction(&tx).await {
            Ok(hash) => hash,
            Err(e) => {
                let err = SwapError::from(e);
                warn!(error = %err, "swap submission failed");
                return self.fail(err).await;
            }
        };

        self.set_status(SwapStatus::info("Confirming...").with_hash(hash))
            .await;

        let failure = match wallet.wait_for_receipt(hash).await {
            Ok(receipt) if receipt.success => None,
            Ok(_) => Some(SwapError::Reverted),
            Err(e) => Some(SwapError::from(e)),
        };
        if let Some(err) = failure {
            warn!(tx = %hash, error = %err, "swap failed after broadcast");
            self.set_status(SwapStatus::error(err.user_message()).with_hash(hash))
                .await;
            return Err(err);
        }

        info!(tx = %hash, "swap confirmed");
        {
            let mut s = self.inner.state.write().await;
            s.status = SwapStatus::success("Swap confirmed!").with_hash(hash);
            s.sell_amount.clear();
            s.approved = false;
            self.bump_generation();
        }

        if let Some(b) = self.read_balances(owner).await {
            let mut s = self.inner.state.write().await;
            if s.address() == Some(owner) {
                s.balances = b;
            }
        }

        Ok(hash)
    }
}
