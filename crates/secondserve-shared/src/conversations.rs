//! Conversation grouping over a user's message history.
//!
//! Conversations are not stored; a thread is identified by the pair
//! (other participant, listing). The fold keeps the newest message per
//! thread (max by `created_at`, ties broken by message id) and counts the
//! unread messages addressed to the current user, so the result does not
//! depend on the order the messages arrive in.

use std::collections::HashMap;

use crate::models::{Conversation, MessageWithContext};
use crate::types::{ListingId, MessageId, UserId};

pub const FALLBACK_RECEIVER_NAME: &str = "Hotel";
pub const FALLBACK_SENDER_NAME: &str = "User";
pub const FALLBACK_LISTING_TITLE: &str = "Unknown Food Listing";

struct Thread<'a> {
    latest: &'a MessageWithContext,
    unread: usize,
}

fn is_newer(candidate: &MessageWithContext, current: &MessageWithContext) -> bool {
    let key = |m: &MessageWithContext| -> (chrono::DateTime<chrono::Utc>, MessageId) {
        (m.message.created_at, m.message.id)
    };
    key(candidate) > key(current)
}

/// Group `messages` into conversations from `me`'s point of view, newest
/// conversation first. Messages `me` neither sent nor received are ignored.
pub fn group_conversations(me: UserId, messages: &[MessageWithContext]) -> Vec<Conversation> {
    let mut threads: HashMap<(UserId, ListingId), Thread<'_>> = HashMap::new();

    for m in messages {
        let msg = &m.message;
        let other = if msg.sender_id == me {
            msg.receiver_id
        } else if msg.receiver_id == me {
            msg.sender_id
        } else {
            continue;
        };

        let unread = usize::from(msg.receiver_id == me && !msg.is_read);

        threads
            .entry((other, msg.listing_id))
            .and_modify(|t| {
                t.unread += unread;
                if is_newer(m, t.latest) {
                    t.latest = m;
                }
            })
            .or_insert(Thread { latest: m, unread });
    }

    let mut conversations: Vec<Conversation> = threads
        .into_iter()
        .map(|((other_user_id, listing_id), t)| {
            let latest = t.latest;
            let other_user_name = if latest.message.sender_id == me {
                latest.receiver_name().unwrap_or(FALLBACK_RECEIVER_NAME)
            } else {
                latest.sender_name().unwrap_or(FALLBACK_SENDER_NAME)
            };

            Conversation {
                other_user_id,
                other_user_name: other_user_name.to_string(),
                listing_id,
                listing_title: latest
                    .listing_title()
                    .unwrap_or(FALLBACK_LISTING_TITLE)
                    .to_string(),
                last_message: latest.message.content.clone(),
                last_message_time: latest.message.created_at,
                unread_count: t.unread,
            }
        })
        .collect();

    conversations.sort_by(|a, b| {
        b.last_message_time
            .cmp(&a.last_message_time)
            .then_with(|| a.other_user_id.cmp(&b.other_user_id))
            .then_with(|| a.listing_id.cmp(&b.listing_id))
    });
    conversations
}
