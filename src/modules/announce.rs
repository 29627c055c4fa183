//! Startup notices for configured chats.

use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::common::BotEnv;
use crate::utils::ResultExt;

/// Tell every configured chat that the bot is back and what its current
/// deletion delay is. Per-chat send failures are logged and do not stop the
/// loop.
pub async fn task(env: Arc<BotEnv>, bot: Bot, shutdown: CancellationToken) {
    for (chat_id, settings) in env.settings.snapshot() {
        if shutdown.is_cancelled() {
            break;
        }
        let text = format!(
            "I'm back! I will start deleting messages from this point \
             onward. Current deletion time: {}",
            format_delete_time(settings.delete_time),
        );
        bot.send_message(chat_id, text)
            .await
            .log_error("Failed to send restart notification");
    }
}

fn format_delete_time(secs: u64) -> String {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_delete_time() {
        assert_eq!(format_delete_time(3600), "1h 0m 0s");
        assert_eq!(format_delete_time(5400), "1h 30m 0s");
        assert_eq!(format_delete_time(45), "0h 0m 45s");
        assert_eq!(format_delete_time(90061), "25h 1m 1s");
    }
}
