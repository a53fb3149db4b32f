//! Gateway events that are not commands.

use crate::{domain::ChatId, services::Services, Result};

/// Greet members who just joined the chat.
pub async fn welcome_members(services: &Services, chat: ChatId, names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let text = format!("👋 **Welcome!** Hey {}!", names.join(", "));
    services
        .messenger
        .send_html(chat, &crate::formatting::markdown_to_html(&text))
        .await?;
    Ok(())
}
