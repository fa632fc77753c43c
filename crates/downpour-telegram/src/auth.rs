// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering for incoming Telegram messages.

use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Checks whether the message sender is authorized.
///
/// Authorization passes if the sender's user ID (as string) or username
/// matches any entry in the `allowed_users` list. An empty list rejects
/// everyone (secure default).
///
/// Messages without a sender (e.g., channel posts) always return `false`.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }

    let user = match msg.from.as_ref() {
        Some(u) => u,
        None => return false,
    };

    let user_id_str = user.id.0.to_string();

    for allowed in allowed_users {
        if *allowed == user_id_str {
            return true;
        }
        if let Some(ref username) = user.username {
            let allowed_clean = allowed.strip_prefix('@').unwrap_or(allowed);
            if username.eq_ignore_ascii_case(allowed_clean) {
                return true;
            }
        }
    }

    false
}

/// Whether the message is from a private (DM) chat. The bot only takes
/// orders over DM; group and channel traffic is ignored.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_private_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let from = if let Some(uname) = username {
            serde_json::json!({
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
                "username": uname,
            })
        } else {
            serde_json::json!({
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            })
        };

        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    #[test]
    fn authorized_by_user_id() {
        let msg = make_private_message(12345, None, "hello");
        assert!(is_authorized(&msg, &["12345".into()]));
    }

    #[test]
    fn authorized_by_username_with_or_without_at() {
        let msg = make_private_message(12345, Some("testuser"), "hello");
        assert!(is_authorized(&msg, &["testuser".into()]));
        assert!(is_authorized(&msg, &["@testuser".into()]));
        assert!(is_authorized(&msg, &["TESTUSER".into()]));
    }

    #[test]
    fn not_authorized_wrong_user_or_empty_list() {
        let msg = make_private_message(12345, Some("testuser"), "hello");
        assert!(!is_authorized(&msg, &["99999".into()]));
        assert!(!is_authorized(&msg, &[]));
    }

    #[test]
    fn dm_filter() {
        assert!(is_dm(&make_private_message(1, None, "x")));
        assert!(!is_dm(&make_group_message(1, "x")));
    }
}
