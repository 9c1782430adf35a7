use chrono::{DateTime, Utc};
use tracing::{debug, info};

use secondserve_shared::models::{Conversation, Message, NewMessage};
use secondserve_shared::types::{ListingId, UserId};

use crate::error::{Action, ClientError, ClientResult, ValidationError};
use crate::state::App;

pub async fn send_message(
    app: &App,
    to: UserId,
    listing: ListingId,
    content: &str,
) -> ClientResult<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyMessage.into());
    }

    let me = app.user_id(Action::SendMessage).await?;
    let message = app
        .store
        .insert_message(&NewMessage {
            sender_id: me,
            receiver_id: to,
            listing_id: listing,
            content: content.to_string(),
        })
        .await
        .map_err(ClientError::remote(Action::SendMessage))?;

    info!(message = %message.id, listing = %listing, "Message sent");
    Ok(message)
}

/// One row per (other participant, listing), newest first.
pub async fn conversations(app: &App) -> ClientResult<Vec<Conversation>> {
    let me = app.user_id(Action::LoadMessages).await?;
    let list = app
        .store
        .conversations(me)
        .await
        .map_err(ClientError::remote(Action::LoadMessages))?;
    debug!(count = list.len(), "Conversations loaded");
    Ok(list)
}

/// Messages with `other` about `listing`, oldest first.
pub async fn conversation_thread(
    app: &App,
    other: UserId,
    listing: ListingId,
) -> ClientResult<Vec<Message>> {
    let me = app.user_id(Action::LoadMessages).await?;
    app.store
        .thread(me, other, listing)
        .await
        .map_err(ClientError::remote(Action::LoadMessages))
}

/// Mark everything `other` sent me about `listing` as read.
pub async fn mark_conversation_read(
    app: &App,
    other: UserId,
    listing: ListingId,
) -> ClientResult<usize> {
    let me = app.user_id(Action::LoadMessages).await?;
    let changed = app
        .store
        .mark_read(me, other, listing)
        .await
        .map_err(ClientError::remote(Action::LoadMessages))?;
    debug!(changed, listing = %listing, "Conversation marked read");
    Ok(changed)
}

/// Timestamp shown in the conversation list.
pub fn message_time_label(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - at;
    match (elapsed.num_minutes(), elapsed.num_hours(), elapsed.num_days()) {
        (m, _, _) if m < 1 => "Just now".to_string(),
        (m, _, _) if m < 60 => format!("{m}m ago"),
        (_, h, _) if h < 24 => format!("{h}h ago"),
        (_, _, d) if d < 7 => format!("{d}d ago"),
        _ => at.format("%d/%m/%Y").to_string(),
    }
}
