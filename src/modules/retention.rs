//! Commands controlling per-chat deletion settings.

use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use macro_rules_attribute::derive;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;

use crate::common::{filter_command, BotCommandsExt, BotEnv, UpdateHandler};
use crate::utils::{parse_delete_time, BotExt};

#[derive(Clone, BotCommands, BotCommandsExt!)]
#[command(rename_rule = "snake_case")]
pub enum Commands {
    #[command(
        description = "set the message deletion delay, e.g. <code>1h30m</code>."
    )]
    #[custom(authorized = true)]
    SetDelete(String),

    #[command(description = "enable or disable admin exclusion.")]
    #[custom(authorized = true)]
    AdminExclude(String),

    #[command(description = "exempt the replied-to user from deletion.")]
    #[custom(authorized = true, in_private = false)]
    Auth,

    #[command(description = "remove the replied-to user's exemption.")]
    #[custom(authorized = true, in_private = false)]
    Deauth,
}

pub fn command_handler() -> UpdateHandler {
    filter_command::<Commands>().endpoint(handle_command)
}

async fn handle_command(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::SetDelete(args) => cmd_set_delete(bot, env, msg, args).await,
        Commands::AdminExclude(args) => {
            cmd_admin_exclude(bot, env, msg, args).await
        }
        Commands::Auth => cmd_exempt(bot, env, msg, true).await,
        Commands::Deauth => cmd_exempt(bot, env, msg, false).await,
    }
}

async fn cmd_set_delete(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    args: String,
) -> Result<()> {
    let time_str = args.trim();
    if time_str.is_empty() {
        bot.reply_message(&msg, "Please provide a time for message deletion.")
            .await?;
        return Ok(());
    }

    let Some(seconds) = parse_delete_time(time_str) else {
        bot.reply_message(
            &msg,
            "Invalid time format. Use combinations of d, h, m, s (e.g., 1h30m).",
        )
        .await?;
        return Ok(());
    };

    env.settings.mutate(|table| {
        table.entry(msg.chat.id).or_default().delete_time = seconds;
    })?;
    bot.reply_message(&msg, format!("Message deletion time set to {time_str}."))
        .await?;
    Ok(())
}

async fn cmd_admin_exclude(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    args: String,
) -> Result<()> {
    let enable = match args.trim() {
        "enable" => true,
        "disable" => false,
        _ => {
            bot.reply_message(
                &msg,
                "Please specify 'enable' or 'disable' for admin exclusion.",
            )
            .await?;
            return Ok(());
        }
    };

    env.settings.mutate(|table| {
        table.entry(msg.chat.id).or_default().admin_exclude = enable;
    })?;
    bot.reply_message(
        &msg,
        format!(
            "Admin message exclusion has been {}.",
            if enable { "enabled" } else { "disabled" },
        ),
    )
    .await?;
    Ok(())
}

async fn cmd_exempt(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    add: bool,
) -> Result<()> {
    if !env.config.moderation.per_chat_exemptions {
        bot.reply_message(
            &msg,
            "Per-chat exemptions are disabled in this deployment.",
        )
        .await?;
        return Ok(());
    }

    let Some(target) = msg.reply_to_message().and_then(|m| m.from.clone())
    else {
        bot.reply_message(
            &msg,
            "Reply to a message from the target user to use this command.",
        )
        .await?;
        return Ok(());
    };

    let exempt = env.settings.mutate(|table| {
        let entry = table.entry(msg.chat.id).or_default();
        if add {
            entry.authorized_users.insert(target.id);
        } else {
            entry.authorized_users.remove(&target.id);
        }
        entry.authorized_users.clone()
    })?;

    let list = if exempt.is_empty() {
        "(no one)".to_string()
    } else {
        exempt.iter().map(|u| u.0).join(", ")
    };
    bot.reply_message(
        &msg,
        format!(
            "{} {} exempt from deletion. Currently exempt: {list}.",
            target.full_name(),
            if add { "is now" } else { "is no longer" },
        ),
    )
    .await?;
    Ok(())
}
