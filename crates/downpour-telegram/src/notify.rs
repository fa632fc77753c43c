// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notifications over Telegram.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::warn;

use downpour_core::Notifier;

/// [`Notifier`] that sends plain-text messages with the bot. Delivery
/// failures are logged and swallowed; a dead chat must never fail a
/// download cycle.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat: i64, text: &str) {
        if let Err(err) = self.bot.send_message(ChatId(chat), text).await {
            warn!(chat, error = %err, "notification delivery failed");
        }
    }
}
