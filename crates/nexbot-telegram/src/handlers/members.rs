use teloxide::types::{Message, User};

use nexbot_core::{domain::ChatId, events::welcome_members};

use crate::router::AppState;

/// Nobody asked for the welcome, so failures are only logged.
pub async fn handle_new_members(msg: &Message, users: &[User], state: &AppState) {
    let names: Vec<String> = users
        .iter()
        .filter(|u| !u.is_bot)
        .map(User::full_name)
        .collect();
    let chat = ChatId(msg.chat.id.0);
    let services = state.services.clone();

    state
        .services
        .boundary
        .run(None, async move {
            welcome_members(&services, chat, &names).await
        })
        .await;
}
