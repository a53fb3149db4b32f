use std::sync::Arc;

use teloxide::types::Message;

use nexbot_core::{
    domain::MessageRef,
    feedback,
    interaction::{replies::MessageRequester, requester::Requester},
};

use super::{message_ref, user_profile};
use crate::router::AppState;

pub async fn handle_feedback(msg: &Message, prompt: MessageRef, text: &str, state: &AppState) {
    let Some(author) = msg.from().map(user_profile) else {
        return;
    };
    let services = state.services.clone();
    let requester = Arc::new(MessageRequester::new(
        services.messenger.clone(),
        message_ref(msg),
    ));

    let task = {
        let requester = requester.clone();
        let services = services.clone();
        let text = text.to_string();
        async move { feedback::receive(&services, prompt, &author, &text, &requester).await }
    };
    services
        .boundary
        .run(Some(requester as Arc<dyn Requester>), task)
        .await;
}
