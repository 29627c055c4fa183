use anyhow::Result;
use macro_rules_attribute::derive;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::common::{filter_command, BotCommandsExt, UpdateHandler};
use crate::utils::BotExt;

#[derive(BotCommands, Clone, BotCommandsExt!)]
#[command(
    rename_rule = "snake_case",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "show what this bot does.")]
    Start,

    #[command(description = "display this text.")]
    Help,

    #[command(description = "check whether the bot is responsive.")]
    Ping,

    #[command(description = "show bot version.")]
    Version,
}

const START_MESSAGE: &str = "\
Hello! I am a message deletion bot.\n\
\n\
I automatically delete messages in group chats after a set time.\n\
Authorized users and group owners can change the deletion time using the \
/set_delete command, and toggle admin message exclusion with /admin_exclude.\n\
Use /ping to check if I'm responsive.";

pub fn command_handler() -> UpdateHandler {
    filter_command::<Command>().endpoint(start)
}

async fn start(bot: Bot, msg: Message, command: Command) -> Result<()> {
    match command {
        Command::Start => {
            bot.reply_message(&msg, START_MESSAGE).await?;
        }
        Command::Help => {
            bot.reply_message(&msg, Command::descriptions().to_string())
                .await?;
        }
        Command::Ping => {
            bot.reply_message(&msg, "Pong! I'm here and responsive.").await?;
        }
        Command::Version => {
            bot.reply_message(&msg, crate::version()).await?;
        }
    }
    Ok(())
}
