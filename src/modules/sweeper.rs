//! Scheduled deletion of group messages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMemberKind, MessageEntityKind, MessageId};
use tokio::task::AbortHandle;

use crate::common::{BotEnv, UpdateHandler};
use crate::utils::ResultExt;

/// Registry of not-yet-fired deletions, keyed by chat and message. Entries
/// deregister themselves once the delete call completes; [`Self::cancel`]
/// aborts the timer. Lost on restart: messages scheduled before a crash are
/// never deleted.
#[derive(Default)]
pub struct PendingDeletions(Mutex<HashMap<(ChatId, MessageId), AbortHandle>>);

impl PendingDeletions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        self.0.lock().unwrap().contains_key(&(chat_id, message_id))
    }

    /// Abort a pending deletion. Returns false if it already fired or was
    /// never scheduled.
    pub fn cancel(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        match self.0.lock().unwrap().remove(&(chat_id, message_id)) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn insert(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        handle: AbortHandle,
    ) {
        self.0.lock().unwrap().insert((chat_id, message_id), handle);
    }

    fn remove(&self, chat_id: ChatId, message_id: MessageId) {
        self.0.lock().unwrap().remove(&(chat_id, message_id));
    }
}

pub fn message_handler() -> UpdateHandler {
    dptree::filter(|msg: Message| {
        !msg.chat.is_private() && !is_command(&msg)
    })
    .endpoint(handle_message)
}

/// Apply the scheduling policy to a single group message. The decision is
/// made once, at arrival time; later settings changes do not affect it.
async fn handle_message(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
) -> Result<()> {
    let Some(settings) = env.settings.get(msg.chat.id) else {
        return Ok(());
    };
    let Some(from) = &msg.from else { return Ok(()) };

    if settings.admin_exclude {
        let member = bot.get_chat_member(msg.chat.id, from.id).await?;
        if matches!(
            member.kind,
            ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_)
        ) {
            return Ok(());
        }
    }

    if env.config.moderation.per_chat_exemptions
        && settings.authorized_users.contains(&from.id)
    {
        return Ok(());
    }

    schedule(
        &bot,
        &env,
        msg.chat.id,
        msg.id,
        Duration::from_secs(settings.delete_time),
    );
    Ok(())
}

/// Spawn a one-shot task that deletes the message after `delay`. Delete
/// failures (already deleted, missing permission, message too old) are
/// logged and swallowed; there are no retries.
pub fn schedule(
    bot: &Bot,
    env: &Arc<BotEnv>,
    chat_id: ChatId,
    message_id: MessageId,
    delay: Duration,
) {
    metrics::counter!("sweepbot_deletions_scheduled_total", 1);
    let bot = bot.clone();
    let env = Arc::clone(env);
    let task_env = Arc::clone(&env);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let res = bot.delete_message(chat_id, message_id).await;
        metrics::counter!(
            "sweepbot_deletions_total",
            1,
            "status" => if res.is_ok() { "ok" } else { "error" },
        );
        res.log_error("Failed to delete message");
        task_env.pending_deletions.remove(chat_id, message_id);
    })
    .abort_handle();
    env.pending_deletions.insert(chat_id, message_id, handle);
}

fn is_command(msg: &Message) -> bool {
    msg.entities().and_then(|e| e.first()).is_some_and(|e| {
        e.kind == MessageEntityKind::BotCommand && e.offset == 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_aborts_pending_deletion() {
        let pending = PendingDeletions::new();
        let chat_id = ChatId(-1001);
        let message_id = MessageId(7);

        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
        .abort_handle();
        pending.insert(chat_id, message_id, handle);
        assert!(pending.contains(chat_id, message_id));

        assert!(pending.cancel(chat_id, message_id));
        assert!(!pending.contains(chat_id, message_id));
        assert!(!pending.cancel(chat_id, message_id));
    }

    #[tokio::test]
    async fn completed_deletion_deregisters_itself() {
        let pending = Arc::new(PendingDeletions::new());
        let chat_id = ChatId(-1001);
        let message_id = MessageId(8);

        let pending2 = Arc::clone(&pending);
        let task = tokio::spawn(async move {
            pending2.remove(chat_id, message_id);
        });
        pending.insert(chat_id, message_id, task.abort_handle());
        task.await.unwrap();
        assert!(!pending.contains(chat_id, message_id));
    }
}
