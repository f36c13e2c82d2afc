use riskgate::config::Config;
use riskgate::dashboard::DashboardView;
use riskgate::onchain::HttpTransport;
use riskgate::swap::SwapController;
use riskgate::wallet::{JsonRpcWallet, WalletProvider, WalletWatcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How often the headless runner logs the dashboard.
const SUMMARY_EVERY: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = if Path::new("riskgate.toml").exists() {
        Config::load(Path::new("riskgate.toml"))?
    } else {
        Config::from_env()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("riskgate v{} starting", env!("CARGO_PKG_VERSION"));

    let deployment = config.deployment()?;
    info!(
        chain = %deployment.chain_name,
        chain_id = deployment.chain_id,
        router = %deployment.router,
        risk_signal = %deployment.risk_signal,
        "deployment resolved"
    );

    let transport = Arc::new(HttpTransport::new(deployment.rpc_url.clone()));

    let wallet: Option<Arc<dyn WalletProvider>> = if config.has_wallet() {
        info!(url = %config.wallet.url, "using JSON-RPC wallet");
        Some(Arc::new(JsonRpcWallet::new(
            config.wallet.url.clone(),
            Duration::from_millis(config.wallet.receipt_poll_ms),
            config.wallet.receipt_max_polls,
        )))
    } else {
        warn!("no wallet configured (set RISKGATE_WALLET_URL), running read-only");
        None
    };

    // Sender stays alive for the whole run so `recv` just pends without a wallet.
    let (wallet_tx, mut wallet_rx) = mpsc::unbounded_channel();
    if let Some(w) = &wallet {
        WalletWatcher::new(w.clone(), wallet_tx.clone())
            .spawn(Duration::from_millis(config.wallet.watch_ms.max(100)));
    }
    let has_wallet = wallet.is_some();

    let controller = SwapController::new(deployment, transport, wallet);
    controller.start(config.poll_interval()).await;

    if has_wallet {
        match controller.connect().await {
            Ok(address) => info!(address = %address, "wallet session open"),
            Err(e) => warn!(error = %e, "wallet connect failed"),
        }
    }

    let mut summary = tokio::time::interval(SUMMARY_EVERY);
    loop {
        tokio::select! {
            _ = summary.tick() => {
                let state = controller.snapshot().await;
                let now = chrono::Utc::now().timestamp().max(0) as u64;
                let view = DashboardView::build(&state, controller.deployment(), now);
                info!(
                    tier = view.tier,
                    fee = view.fee,
                    confidence = %view.confidence,
                    updated = %view.staleness,
                    prediction = %view.probability,
                    fill = ?view.probability_fill,
                    action = ?view.action,
                    "dashboard"
                );
                if let Some(account) = &view.account {
                    info!(
                        account = %account,
                        network_ok = view.network_ok,
                        sell = %view.sell_balance,
                        buy = %view.buy_balance,
                        "wallet"
                    );
                }
            }

            Some(event) = wallet_rx.recv() => {
                controller.handle_wallet_event(event).await;
                warn!("wallet session reset, reconnect to keep swapping");
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
                controller.stop().await;
                break;
            }
        }
    }

    Ok(())
}
