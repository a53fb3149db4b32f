use std::{sync::Arc, time::Duration};

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    prelude::*,
    types::{BotCommand, UserId},
};
use tokio_util::sync::CancellationToken;

use nexbot_core::{commands::CATALOG, services::Services};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub bot_id: UserId,
    pub bot_username: String,
}

pub fn bot_commands() -> Vec<BotCommand> {
    CATALOG
        .iter()
        .map(|c| BotCommand::new(c.name, c.description))
        .collect()
}

/// Long-poll Telegram until `shutdown` is cancelled.
pub async fn run_polling(
    messenger: &TelegramMessenger,
    services: Services,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bot = messenger.bot();

    let me = bot.get_me().await?;
    let bot_username = me.username().to_string();
    tracing::info!("Logged in as @{bot_username}");

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!("failed to register bot commands: {e}");
    }

    let state = Arc::new(AppState {
        services,
        bot_id: me.user.id,
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    if shutdown.is_cancelled() {
        tracing::info!("shutdown requested before polling started");
        return Ok(());
    }

    let token = dispatcher.shutdown_token();
    let stopper = tokio::spawn(stop_on_cancel(shutdown, move || match token.shutdown() {
        Ok(_) => {
            tracing::info!("stopping telegram dispatcher");
            true
        }
        Err(e) => {
            tracing::debug!("dispatcher not running yet: {e}");
            false
        }
    }));

    dispatcher.dispatch().await;
    stopper.abort();
    tracing::info!("telegram dispatcher stopped");
    Ok(())
}

const STOP_RETRY: Duration = Duration::from_millis(50);

/// Once `shutdown` fires, call `try_stop` until it reports success.
///
/// A dispatcher refuses to stop while it is still starting up, so a single attempt can be
/// lost.
async fn stop_on_cancel(shutdown: CancellationToken, mut try_stop: impl FnMut() -> bool) {
    shutdown.cancelled().await;
    while !try_stop() {
        tokio::time::sleep(STOP_RETRY).await;
    }
}
