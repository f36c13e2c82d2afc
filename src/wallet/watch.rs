//! Wallet change notifications for providers that cannot push them.
//!
//! A browser wallet emits `accountsChanged` / `chainChanged`; over plain
//! JSON-RPC there is no subscription, so the watcher polls `eth_accounts`
//! and `eth_chainId` and turns differences into `WalletEvent`s.

use crate::wallet::{WalletEvent, WalletProvider};
use alloy::primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    accounts: Vec<Address>,
    chain_id: u64,
}

/// Events implied by moving from `prev` to `next`.
fn changes(prev: &Observed, next: &Observed) -> Vec<WalletEvent> {
    let mut events = Vec::new();
    if prev.accounts != next.accounts {
        events.push(WalletEvent::AccountsChanged(next.accounts.clone()));
    }
    if prev.chain_id != next.chain_id {
        events.push(WalletEvent::ChainChanged(next.chain_id));
    }
    events
}

pub struct WalletWatcher {
    provider: Arc<dyn WalletProvider>,
    event_tx: mpsc::UnboundedSender<WalletEvent>,
}

impl WalletWatcher {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        event_tx: mpsc::UnboundedSender<WalletEvent>,
    ) -> Self {
        Self { provider, event_tx }
    }

    /// Start polling. The first observation is the baseline and emits
    /// nothing. The task ends once the receiver is dropped.
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            run_watch(self.provider, self.event_tx, every).await;
        })
    }
}

async fn observe(provider: &dyn WalletProvider) -> Option<Observed> {
    let (accounts, chain_id) = tokio::join!(provider.accounts(), provider.chain_id());
    match (accounts, chain_id) {
        (Ok(accounts), Ok(chain_id)) => Some(Observed { accounts, chain_id }),
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "wallet poll failed");
            None
        }
    }
}

async fn run_watch(
    provider: Arc<dyn WalletProvider>,
    event_tx: mpsc::UnboundedSender<WalletEvent>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Observed> = None;

    loop {
        ticker.tick().await;
        if event_tx.is_closed() {
            break;
        }

        let Some(next) = observe(provider.as_ref()).await else {
            continue;
        };

        if let Some(prev) = &last {
            for event in changes(prev, &next) {
                info!(event = ?event, "wallet changed");
                if event_tx.send(event).is_err() {
                    return;
                }
            }
        }
        last = Some(next);
    }
}
