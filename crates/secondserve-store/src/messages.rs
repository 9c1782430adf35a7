use chrono::Utc;
use rusqlite::params;

use secondserve_shared::conversations::{
    FALLBACK_LISTING_TITLE, FALLBACK_RECEIVER_NAME, FALLBACK_SENDER_NAME,
};
use secondserve_shared::models::{
    Conversation, ListingTitle, Message, MessageWithContext, NewMessage, ProfileName,
};
use secondserve_shared::types::{ListingId, MessageId, UserId};

use crate::database::{parse_ts, parse_uuid, ts, Database};
use crate::error::Result;

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.receiver_id, m.listing_id, m.content, m.created_at, m.is_read";

// Newest row per (other participant, listing) plus the unread count
// addressed to ?1. Ties on created_at fall back to the message id.
const CONVERSATIONS_SQL: &str = "
WITH mine AS (
    SELECT m.id, m.sender_id, m.receiver_id, m.listing_id, m.content, m.created_at, m.is_read,
           CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END AS other_id
    FROM messages m
    WHERE m.sender_id = ?1 OR m.receiver_id = ?1
),
ranked AS (
    SELECT mine.*,
           ROW_NUMBER() OVER (
               PARTITION BY other_id, listing_id
               ORDER BY created_at DESC, id DESC
           ) AS rn,
           SUM(CASE WHEN receiver_id = ?1 AND is_read = 0 THEN 1 ELSE 0 END) OVER (
               PARTITION BY other_id, listing_id
           ) AS unread
    FROM mine
)
SELECT r.other_id,
       CASE WHEN r.sender_id = ?1 THEN COALESCE(rp.name, ?2) ELSE COALESCE(sp.name, ?3) END,
       r.listing_id,
       COALESCE(l.title, ?4),
       r.content,
       r.created_at,
       r.unread
FROM ranked r
LEFT JOIN profiles sp ON sp.id = r.sender_id
LEFT JOIN profiles rp ON rp.id = r.receiver_id
LEFT JOIN food_listings l ON l.id = r.listing_id
WHERE r.rn = 1
ORDER BY r.created_at DESC, r.other_id ASC, r.listing_id ASC";

impl Database {
    pub fn insert_message(&self, message: &NewMessage) -> Result<Message> {
        let stored = Message {
            id: MessageId::new(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            listing_id: message.listing_id,
            content: message.content.clone(),
            created_at: Utc::now(),
            is_read: false,
        };

        self.conn().execute(
            "INSERT INTO messages (id, sender_id, receiver_id, listing_id, content, created_at, is_read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                stored.id.to_string(),
                stored.sender_id.to_string(),
                stored.receiver_id.to_string(),
                stored.listing_id.to_string(),
                stored.content,
                ts(&stored.created_at),
            ],
        )?;
        Ok(stored)
    }

    /// Everything `user` sent or received with names and titles joined,
    /// newest first.
    pub fn messages_for_user(&self, user: UserId) -> Result<Vec<MessageWithContext>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}, sp.name, rp.name, l.title
             FROM messages m
             LEFT JOIN profiles sp ON sp.id = m.sender_id
             LEFT JOIN profiles rp ON rp.id = m.receiver_id
             LEFT JOIN food_listings l ON l.id = m.listing_id
             WHERE m.sender_id = ?1 OR m.receiver_id = ?1
             ORDER BY m.created_at DESC, m.id DESC"
        ))?;

        let rows = stmt.query_map(params![user.to_string()], |row| {
            let sender: Option<String> = row.get(7)?;
            let receiver: Option<String> = row.get(8)?;
            let title: Option<String> = row.get(9)?;
            Ok(MessageWithContext {
                message: row_to_message(row)?,
                sender: sender.map(|name| ProfileName { name: Some(name) }),
                receiver: receiver.map(|name| ProfileName { name: Some(name) }),
                listing: title.map(|title| ListingTitle { title: Some(title) }),
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn thread(&self, user: UserId, other: UserId, listing: ListingId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             WHERE m.listing_id = ?3
               AND ((m.sender_id = ?1 AND m.receiver_id = ?2)
                 OR (m.sender_id = ?2 AND m.receiver_id = ?1))
             ORDER BY m.created_at ASC, m.id ASC"
        ))?;

        let rows = stmt.query_map(
            params![user.to_string(), other.to_string(), listing.to_string()],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn mark_read(&self, receiver: UserId, sender: UserId, listing: ListingId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_read = 1
             WHERE receiver_id = ?1 AND sender_id = ?2 AND listing_id = ?3 AND is_read = 0",
            params![receiver.to_string(), sender.to_string(), listing.to_string()],
        )?;
        Ok(affected)
    }

    /// Conversation summaries aggregated in SQL.
    pub fn conversations(&self, user: UserId) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(CONVERSATIONS_SQL)?;
        let rows = stmt.query_map(
            params![
                user.to_string(),
                FALLBACK_RECEIVER_NAME,
                FALLBACK_SENDER_NAME,
                FALLBACK_LISTING_TITLE,
            ],
            |row| {
                let other: String = row.get(0)?;
                let listing: String = row.get(2)?;
                let created: String = row.get(5)?;
                let unread: i64 = row.get(6)?;
                Ok(Conversation {
                    other_user_id: UserId(parse_uuid(0, &other)?),
                    other_user_name: row.get(1)?,
                    listing_id: ListingId(parse_uuid(2, &listing)?),
                    listing_title: row.get(3)?,
                    last_message: row.get(4)?,
                    last_message_time: parse_ts(5, &created)?,
                    unread_count: usize::try_from(unread).unwrap_or_default(),
                })
            },
        )?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let receiver_str: String = row.get(2)?;
    let listing_str: String = row.get(3)?;
    let created_str: String = row.get(5)?;

    Ok(Message {
        id: MessageId(parse_uuid(0, &id_str)?),
        sender_id: UserId(parse_uuid(1, &sender_str)?),
        receiver_id: UserId(parse_uuid(2, &receiver_str)?),
        listing_id: ListingId(parse_uuid(3, &listing_str)?),
        content: row.get(4)?,
        created_at: parse_ts(5, &created_str)?,
        is_read: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::tests::{hotel, new_listing};
    use chrono::Duration;
    use secondserve_shared::conversations::group_conversations;
    use secondserve_shared::models::{NewProfile, Role};

    fn ngo(db: &Database, name: &str) -> UserId {
        let id = UserId::new();
        db.insert_profile(&NewProfile {
            id,
            name: name.into(),
            role: Role::Ngo,
            phone: None,
        })
        .unwrap();
        id
    }

    fn send(db: &Database, from: UserId, to: UserId, listing: ListingId, text: &str) -> Message {
        db.insert_message(&NewMessage {
            sender_id: from,
            receiver_id: to,
            listing_id: listing,
            content: text.into(),
        })
        .unwrap()
    }

    #[test]
    fn thread_is_oldest_first_and_scoped() {
        let db = Database::open_in_memory().unwrap();
        let h = hotel(&db);
        let n = ngo(&db, "Roti Bank");
        let other = ngo(&db, "Food For All");
        let l = db
            .insert_listing(&new_listing(h, "Dal", Utc::now() + Duration::hours(3)))
            .unwrap();

        send(&db, n, h, l.id, "Is it still there?");
        send(&db, h, n, l.id, "Yes");
        send(&db, other, h, l.id, "Me too");

        let thread = db.thread(n, h, l.id).unwrap();
        let texts: Vec<_> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["Is it still there?", "Yes"]);
    }

    #[test]
    fn mark_read_only_touches_incoming() {
        let db = Database::open_in_memory().unwrap();
        let h = hotel(&db);
        let n = ngo(&db, "Roti Bank");
        let l = ListingId::new();

        send(&db, h, n, l, "one");
        send(&db, h, n, l, "two");
        send(&db, n, h, l, "mine");

        assert_eq!(db.mark_read(n, h, l).unwrap(), 2);
        assert_eq!(db.mark_read(n, h, l).unwrap(), 0);

        let thread = db.thread(n, h, l).unwrap();
        let mine = thread.iter().find(|m| m.content == "mine").unwrap();
        assert!(!mine.is_read);
    }

    #[test]
    fn sql_conversations_agree_with_fold() {
        let db = Database::open_in_memory().unwrap();
        let h = hotel(&db);
        let n = ngo(&db, "Roti Bank");
        let other = ngo(&db, "Food For All");
        let dal = db
            .insert_listing(&new_listing(h, "Dal", Utc::now() + Duration::hours(3)))
            .unwrap();
        let gone = ListingId::new();

        send(&db, n, h, dal.id, "hello");
        send(&db, h, n, dal.id, "hi there");
        send(&db, other, h, dal.id, "also interested");
        send(&db, n, h, gone, "about the old one");
        send(&db, h, n, gone, "sorry, taken");

        let from_sql = db.conversations(h).unwrap();
        let folded = group_conversations(h, &db.messages_for_user(h).unwrap());
        assert_eq!(from_sql, folded);

        assert_eq!(from_sql.len(), 3);
        let orphan = from_sql.iter().find(|c| c.listing_id == gone).unwrap();
        assert_eq!(orphan.listing_title, FALLBACK_LISTING_TITLE);
        assert_eq!(orphan.other_user_name, "Roti Bank");

        let with_other = from_sql.iter().find(|c| c.other_user_id == other).unwrap();
        assert_eq!(with_other.unread_count, 1);
        assert_eq!(with_other.listing_title, "Dal");
    }
}
