use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use nexbot_core::{config::Config, logging::TracingSink, services::Services};
use nexbot_http::{HttpConfig, HttpState};
use nexbot_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), nexbot_core::Error> {
    nexbot_core::logging::init("nexbot")?;

    let cfg = Config::load()?;
    tracing::info!(env = %cfg.bot_env, "starting nexbot");
    if let Some(domain) = &cfg.railway.public_domain {
        tracing::info!("public domain: {domain}");
    }

    let messenger = TelegramMessenger::from_token(cfg.telegram_bot_token.clone());
    let services = Services::new(
        Arc::new(messenger.clone()),
        Arc::new(TracingSink),
        cfg.poll_default_duration,
    );

    let shutdown = CancellationToken::new();

    let http = HttpConfig::from_config(&cfg).map(|http_cfg| {
        let state = HttpState::from_services(&services);
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = nexbot_http::serve(http_cfg, state, token).await {
                tracing::error!("HTTP API failed: {e:#}");
            }
        })
    });

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => tracing::warn!("cannot listen for ctrl-c: {e}"),
            }
        });
    }

    let result = nexbot_telegram::router::run_polling(&messenger, services, shutdown.clone()).await;
    shutdown.cancel();
    join_http(http).await;

    result.map_err(|e| nexbot_core::Error::External(format!("telegram bot failed: {e:#}")))
}

/// Wait for the HTTP task. Returns `false` when it panicked or was aborted.
async fn join_http(handle: Option<JoinHandle<()>>) -> bool {
    let Some(handle) = handle else {
        return true;
    };
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("HTTP API task did not finish cleanly: {e}");
            false
        }
    }
}
