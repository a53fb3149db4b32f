use std::sync::Arc;

use chrono::Utc;
use teloxide::types::CallbackQuery;

use nexbot_core::{
    commands::{execute_callback, CallbackAction},
    interaction::{replies::CallbackRequester, requester::Requester},
};

use super::{message_ref, user_id};
use crate::router::AppState;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) {
    let services = state.services.clone();
    let origin = q.message.as_ref().map(message_ref);
    let requester = Arc::new(CallbackRequester::new(
        services.messenger.clone(),
        q.id.clone(),
        origin,
    ));

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        // Stale or foreign button: just stop the spinner.
        if let Err(e) = requester.ensure_answered().await {
            services.boundary.handle_interactive(e.into(), None).await;
        }
        return;
    };

    let user = user_id(&q.from);
    let task = {
        let requester = requester.clone();
        let services = services.clone();
        async move {
            tracing::debug!(?action, user = user.0, "button pressed");
            execute_callback(&services, action, user, Utc::now(), &requester).await
        }
    };

    services
        .boundary
        .run(Some(requester as Arc<dyn Requester>), task)
        .await;
}
