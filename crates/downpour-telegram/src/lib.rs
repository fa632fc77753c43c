// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram front end for the Downpour download agent.
//!
//! Long polling via teloxide: commands drive the controller, free-text
//! messages are mined for URLs, and forwarded media is captured into the
//! chat-media seen-cache and queued as self-references.

pub mod auth;
pub mod commands;
pub mod links;
pub mod media_strategy;
pub mod notify;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use teloxide::prelude::*;
use teloxide::types::{
    Chat, InlineKeyboardButton, InlineKeyboardMarkup, MessageOrigin, User,
};
use tracing::{debug, info, warn};

use downpour_config::model::TelegramConfig;
use downpour_core::types::{ChatLinkJob, ChatRefJob, UrlJob};
use downpour_core::{DownpourError, JobKind, JobPayload};
use downpour_engine::router::{classify, looks_like_playlist, UrlClass};
use downpour_engine::Controller;

use crate::commands::{menu_text, render_list, render_status, Command};
use crate::media_strategy::{ChatMediaStrategy, MediaRef};

/// Build the bot from configuration. Requires `telegram.bot_token`.
pub fn bot_from_config(config: &TelegramConfig) -> Result<Bot, DownpourError> {
    let token = config
        .bot_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            DownpourError::Config("telegram.bot_token is required for the bot front end".into())
        })?;
    Ok(Bot::new(token))
}

struct PendingChoice {
    url: String,
    chat_id: i64,
}

/// Telegram front end: command handling, URL intake, media capture.
pub struct DownpourBot {
    bot: Bot,
    controller: Arc<Controller>,
    media: Arc<ChatMediaStrategy>,
    allowed_users: Vec<String>,
    choices: DashMap<u64, PendingChoice>,
    next_choice: AtomicU64,
}

impl DownpourBot {
    pub fn new(
        bot: Bot,
        config: &TelegramConfig,
        controller: Arc<Controller>,
        media: Arc<ChatMediaStrategy>,
    ) -> Self {
        Self {
            bot,
            controller,
            media,
            allowed_users: config.allowed_users.clone(),
            choices: DashMap::new(),
            next_choice: AtomicU64::new(1),
        }
    }

    /// Run long polling until the process shuts down.
    pub async fn dispatch(self: Arc<Self>) {
        info!("starting Telegram long polling");
        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(
                        |bot: Bot, msg: Message, cmd: Command, me: Arc<DownpourBot>| async move {
                            if !auth::is_dm(&msg) || !auth::is_authorized(&msg, &me.allowed_users)
                            {
                                debug!(chat_id = msg.chat.id.0, "ignoring unauthorized command");
                                return respond(());
                            }
                            let reply = me.handle_command(cmd).await;
                            if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                                warn!(error = %e, "failed to send command reply");
                            }
                            respond(())
                        },
                    ),
            )
            .branch(Update::filter_message().endpoint(
                |bot: Bot, msg: Message, me: Arc<DownpourBot>| async move {
                    if !auth::is_dm(&msg) || !auth::is_authorized(&msg, &me.allowed_users) {
                        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized message");
                        return respond(());
                    }
                    me.handle_message(&bot, &msg).await;
                    respond(())
                },
            ))
            .branch(Update::filter_callback_query().endpoint(
                |bot: Bot, q: CallbackQuery, me: Arc<DownpourBot>| async move {
                    me.handle_callback(&bot, &q).await;
                    respond(())
                },
            ));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.clone()])
            .default_handler(|_| async {})
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(&self, cmd: Command) -> String {
        match cmd {
            Command::Start | Command::Help | Command::Menu => menu_text(),
            Command::Now => match self.controller.run_now(true).await {
                Ok(true) => "⬇️ cycle started".to_string(),
                Ok(false) => "a cycle is already running".to_string(),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Pause => match self.controller.pause().await {
                Ok(()) => "⏸ downloads paused".to_string(),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Resume => match self.controller.resume().await {
                Ok(n) => format!("▶️ resumed, {n} item(s) re-queued"),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Status => match self.controller.status().await {
                Ok(summary) => render_status(&summary),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::List => match self.controller.list(20).await {
                Ok(items) => render_list(&items),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Retry => match self.controller.retry_errors().await {
                Ok(n) => format!("🔁 {n} failed item(s) re-queued"),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Purge => match self.controller.purge_finished().await {
                Ok(n) => format!("🧹 {n} finished item(s) removed"),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::Cancel(arg) => match arg.trim().parse::<i64>() {
                Ok(id) => match self.controller.cancel(id).await {
                    Ok(true) => format!("🚫 #{id} canceled"),
                    Ok(false) => format!("#{id} not found or already finished"),
                    Err(e) => format!("⚠️ {e}"),
                },
                Err(_) => "usage: /cancel <id>".to_string(),
            },
            Command::Clear => match self.controller.clear_all().await {
                Ok(n) => format!("🗑 queue cleared ({n} item(s) removed)"),
                Err(e) => format!("⚠️ {e}"),
            },
            Command::When => self.render_schedule().await,
            Command::Schedule(arg) => self.set_schedule(arg.trim()).await,
        }
    }

    async fn render_schedule(&self) -> String {
        let hour = match self.controller.schedule_hour().await {
            Ok(h) => h,
            Err(e) => return format!("⚠️ {e}"),
        };
        let tz = self.controller.settings().timezone;
        match self.controller.window_enabled().await {
            Ok(true) => format!("daily window starts at {hour:02}:00 {tz}"),
            Ok(false) => "scheduled window is off (manual /now only)".to_string(),
            Err(e) => format!("⚠️ {e}"),
        }
    }

    async fn set_schedule(&self, arg: &str) -> String {
        match arg {
            "on" => match self.controller.set_window_enabled(true).await {
                Ok(()) => "daily window enabled".to_string(),
                Err(e) => format!("⚠️ {e}"),
            },
            "off" => match self.controller.set_window_enabled(false).await {
                Ok(()) => "daily window disabled".to_string(),
                Err(e) => format!("⚠️ {e}"),
            },
            other => match other.parse::<u8>() {
                Ok(hour) => match self.controller.set_schedule_hour(hour).await {
                    Ok(()) => {
                        let tz = self.controller.settings().timezone;
                        format!("daily window moved to {hour:02}:00 {tz}")
                    }
                    Err(e) => format!("⚠️ {e}"),
                },
                Err(_) => "usage: /schedule <hour 0-23> | on | off".to_string(),
            },
        }
    }

    async fn handle_message(&self, bot: &Bot, msg: &Message) {
        let reply = if let Some(media) = extract_media(msg) {
            self.intake_media(msg, media).await
        } else {
            let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
            self.intake_text(bot, msg, text).await
        };
        if let Some(reply) = reply {
            if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                warn!(error = %e, "failed to send reply");
            }
        }
    }

    /// Register a media attachment and queue it as a self-reference.
    async fn intake_media(&self, msg: &Message, media: MediaRef) -> Option<String> {
        let chat_id = msg.chat.id.0;
        let message_id = msg.id.0;
        let name = media.file_name.clone();
        self.media.register_media(chat_id, message_id, media.clone());

        // Forwarded channel posts stay resolvable through their t.me link.
        if let Some(MessageOrigin::Channel {
            chat,
            message_id: origin_id,
            ..
        }) = msg.forward_origin()
        {
            let mut origin_media = media;
            origin_media.chat_title = chat_label(chat);
            self.media
                .register_media(chat.id.0, origin_id.0, origin_media);
            if let Some(username) = chat.username() {
                self.media.register_alias(username, chat.id.0);
            }
        }

        let payload = JobPayload::ChatRef(ChatRefJob {
            chat_id,
            message_id,
            notify_chat: Some(chat_id),
        });
        match self
            .controller
            .enqueue(JobKind::SelfRef, &payload, self.default_schedule().await.as_deref())
            .await
        {
            Ok(id) => Some(format!("🕘 queued #{id} ({name})")),
            Err(e) => Some(format!("⚠️ {e}")),
        }
    }

    /// Mine free text for URLs and queue them.
    async fn intake_text(&self, bot: &Bot, msg: &Message, text: &str) -> Option<String> {
        let urls = links::extract_urls(text);
        if urls.is_empty() {
            return Some("no links found; send a URL or forward a file".to_string());
        }

        let chat_id = msg.chat.id.0;
        let when = self.default_schedule().await;
        let mut queued = Vec::new();
        for url in urls {
            if links::is_tme_link(&url) {
                let payload = JobPayload::ChatLink(ChatLinkJob {
                    url,
                    notify_chat: Some(chat_id),
                });
                match self
                    .controller
                    .enqueue(JobKind::TgLink, &payload, when.as_deref())
                    .await
                {
                    Ok(id) => queued.push(id),
                    Err(e) => return Some(format!("⚠️ {e}")),
                }
                continue;
            }

            if classify(&url) == UrlClass::Video && looks_like_playlist(&url) {
                self.offer_playlist_choice(bot, chat_id, url).await;
                continue;
            }

            let payload = JobPayload::Url(UrlJob {
                url,
                allow_playlist: None,
                max_items: None,
                notify_chat: Some(chat_id),
            });
            match self
                .controller
                .enqueue(JobKind::Url, &payload, when.as_deref())
                .await
            {
                Ok(id) => queued.push(id),
                Err(e) => return Some(format!("⚠️ {e}")),
            }
        }

        if queued.is_empty() {
            None
        } else {
            let ids: Vec<String> = queued.iter().map(|id| format!("#{id}")).collect();
            Some(format!("🕘 queued {}", ids.join(", ")))
        }
    }

    /// Ask whether a playlist-looking URL means one video or the whole list.
    async fn offer_playlist_choice(&self, bot: &Bot, chat_id: i64, url: String) {
        let token = self.next_choice.fetch_add(1, Ordering::Relaxed);
        self.choices.insert(token, PendingChoice { url, chat_id });

        let keyboard = InlineKeyboardMarkup::new([[
            InlineKeyboardButton::callback("Single video", format!("pl:{token}:one")),
            InlineKeyboardButton::callback("Whole playlist", format!("pl:{token}:all")),
        ]]);
        if let Err(e) = bot
            .send_message(ChatId(chat_id), "That looks like a playlist. Download what?")
            .reply_markup(keyboard)
            .await
        {
            warn!(error = %e, "failed to send playlist prompt");
            self.choices.remove(&token);
        }
    }

    async fn handle_callback(&self, bot: &Bot, q: &CallbackQuery) {
        if !user_allowed(&q.from, &self.allowed_users) {
            debug!(user = q.from.id.0, "ignoring unauthorized callback");
            return;
        }
        let Some((token, whole_playlist)) = q.data.as_deref().and_then(parse_choice_data) else {
            return;
        };
        let Some((_, choice)) = self.choices.remove(&token) else {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            return;
        };

        let payload = JobPayload::Url(UrlJob {
            url: choice.url,
            allow_playlist: Some(whole_playlist),
            max_items: None,
            notify_chat: Some(choice.chat_id),
        });
        let reply = match self
            .controller
            .enqueue(JobKind::Url, &payload, self.default_schedule().await.as_deref())
            .await
        {
            Ok(id) if whole_playlist => format!("🕘 queued #{id} (whole playlist)"),
            Ok(id) => format!("🕘 queued #{id} (single video)"),
            Err(e) => format!("⚠️ {e}"),
        };

        let _ = bot.answer_callback_query(q.id.clone()).await;
        if let Some(message) = &q.message {
            let _ = bot
                .edit_message_text(message.chat().id, message.id(), reply)
                .await;
        }
    }

    /// Default enqueue time: the next window start when scheduling is on,
    /// otherwise due immediately.
    async fn default_schedule(&self) -> Option<String> {
        match self.controller.window_enabled().await {
            Ok(true) => match self.controller.schedule_hour().await {
                Ok(hour) => Some(links::next_schedule_time(
                    hour,
                    self.controller.settings().timezone,
                )),
                Err(_) => None,
            },
            _ => None,
        }
    }
}

fn user_allowed(user: &User, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return false;
    }
    let id = user.id.0.to_string();
    allowed.iter().any(|entry| {
        *entry == id
            || user.username.as_deref().is_some_and(|name| {
                name.eq_ignore_ascii_case(entry.strip_prefix('@').unwrap_or(entry))
            })
    })
}

fn parse_choice_data(data: &str) -> Option<(u64, bool)> {
    let rest = data.strip_prefix("pl:")?;
    let (token, choice) = rest.split_once(':')?;
    let whole = match choice {
        "all" => true,
        "one" => false,
        _ => return None,
    };
    Some((token.parse().ok()?, whole))
}

/// Pull a downloadable attachment out of a message, if it carries one.
fn extract_media(msg: &Message) -> Option<MediaRef> {
    let chat_title = chat_label(&msg.chat);
    if let Some(doc) = msg.document() {
        return Some(MediaRef {
            file: doc.file.clone(),
            file_name: doc
                .file_name
                .clone()
                .unwrap_or_else(|| "document".to_string()),
            chat_title,
        });
    }
    if let Some(video) = msg.video() {
        return Some(MediaRef {
            file: video.file.clone(),
            file_name: video
                .file_name
                .clone()
                .unwrap_or_else(|| format!("video_{}.mp4", video.file.unique_id)),
            chat_title,
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(MediaRef {
            file: audio.file.clone(),
            file_name: audio
                .file_name
                .clone()
                .unwrap_or_else(|| format!("audio_{}.mp3", audio.file.unique_id)),
            chat_title,
        });
    }
    if let Some(photos) = msg.photo() {
        // Telegram lists sizes ascending; the last is the largest.
        let largest = photos.last()?;
        return Some(MediaRef {
            file: largest.file.clone(),
            file_name: format!("photo_{}.jpg", largest.file.unique_id),
            chat_title,
        });
    }
    None
}

fn chat_label(chat: &Chat) -> String {
    chat.title()
        .or_else(|| chat.username())
        .unwrap_or("telegram")
        .to_string()
}
