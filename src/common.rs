//! Common helpers to be used by various bot modules.

use std::sync::Arc;

use anyhow::Result;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, ChatMemberKind, Me, Message, UserId};
use teloxide::utils::command::BotCommands;
use teloxide::Bot;

use crate::config::{AuthPolicy, Config};
use crate::modules::sweeper::PendingDeletions;
use crate::settings::SettingsStore;
use crate::utils::BotExt;

/// Wrapper around [`teloxide::dispatching::UpdateHandler`] to be used in this
/// crate.
pub type UpdateHandler = teloxide::dispatching::UpdateHandler<anyhow::Error>;

/// Access rules describing where and who can execute a command.
#[derive(Eq, PartialEq, Debug)]
pub struct CommandAccessRules {
    /// Require the sender to pass the authorization check: member of the
    /// global allowlist, or holder of an elevated role in the chat.
    pub authorized: bool,
    /// Allow users to execute this command in private chat with bot
    pub in_private: bool,
    /// Allow users to execute this command in group chat
    pub in_group: bool,
}

impl CommandAccessRules {
    pub const fn new() -> Self {
        Self { authorized: false, in_private: true, in_group: true }
    }
}

impl Default for CommandAccessRules {
    fn default() -> Self {
        Self::new()
    }
}

/// An extension to [`BotCommands`] trait that allows to specify command rules
/// for each command.
///
/// [`BotCommands`]: teloxide::utils::command::BotCommands
pub trait BotCommandsExtTrait: BotCommands {
    const COMMAND_RULES: &'static [CommandAccessRules];
    fn command_rules(&self) -> CommandAccessRules;
}

/// Bot environment: shared state injected into all handlers.
pub struct BotEnv {
    pub config: Arc<Config>,
    pub settings: SettingsStore,
    pub pending_deletions: PendingDeletions,
}

/// Derive macro for [`BotCommandsExtTrait`] trait. Should be applied with
/// [`macro_rules_attribute::derive`].
macro_rules! BotCommandsExt {
    (
        $( #[ $_attr:meta ] )*
        $pub:vis
        enum $name:ident {
            $(
                $( #[ $($attr:tt)* ] )*
                $item:ident $( ( $($item_args:tt)* ) )?
            ),* $(,)?
        }
    ) => {
        impl $crate::common::BotCommandsExtTrait for $name {
            const COMMAND_RULES: &'static [$crate::common::CommandAccessRules] =
                &[$({
                    #[allow(unused_mut)]
                    let mut meta = $crate::common::CommandAccessRules::new();
                    BotCommandsExt!(
                        impl set_meta;
                        meta;
                        $( #[ $($attr)* ] )*
                    );
                    meta
                }),*]
            ;
            fn command_rules(&self) -> $crate::common::CommandAccessRules {
                match self {$(
                    BotCommandsExt!(
                        impl skip_item_args;
                        $item $( ( $($item_args)* ) )?
                    ) => {
                        #[allow(unused_mut)]
                        let mut meta =
                            $crate::common::CommandAccessRules::default();
                        BotCommandsExt!(
                            impl set_meta;
                            meta;
                            $( #[ $($attr)* ] )*
                        );
                        meta
                    }
                )*}
            }
        }
    };

    // Internal rules, using <https://stackoverflow.com/a/40484901> trick
    // set_meta
    (
        impl set_meta;
        $name:expr;
        #[custom( $( $meta_key:ident = $meta_value:expr ),* $(,)? )]
        $( #[ $( $rest:tt )* ] )*
    ) => {
        $( $name.$meta_key = $meta_value; )*
        BotCommandsExt!(impl set_meta; $name; $( #[ $( $rest )* ] )* );
    };
    (
        impl set_meta;
        $name:expr;
        #[ $attr:meta ]
        $( #[ $( $rest:tt )* ] )*
    ) => {
        BotCommandsExt!(impl set_meta; $name; $( #[ $( $rest )* ] )* );
    };
    (
        impl set_meta;
        $name:expr;
    ) => {};

    // skip_item_args
    (impl skip_item_args; $v:ident ) => { Self::$v };
    (impl skip_item_args; $v:ident($($t:ty),+) ) => { Self::$v(..) };
}

pub(crate) use BotCommandsExt;

/// Check whether a user may change a chat's moderation settings: member of
/// the deployment-time allowlist, or holder of an elevated chat role under
/// the configured policy.
pub async fn is_user_authorized(
    bot: &Bot,
    env: &BotEnv,
    chat_id: ChatId,
    user_id: UserId,
) -> Result<bool> {
    if env.config.telegram.admins.contains(&user_id) {
        return Ok(true);
    }
    let member = bot.get_chat_member(chat_id, user_id).await?;
    Ok(match env.config.moderation.auth_policy {
        AuthPolicy::OwnerOnly => {
            matches!(member.kind, ChatMemberKind::Owner(_))
        }
        AuthPolicy::AdminOrOwner => matches!(
            member.kind,
            ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_)
        ),
    })
}

/// Similar to [`teloxide::filter_command`], but for commands implementing
/// [`BotCommandsExtTrait`].
#[must_use]
pub fn filter_command<C>() -> UpdateHandler
where
    C: BotCommands + BotCommandsExtTrait + Send + Sync + 'static,
{
    dptree::filter_map_async(filter_command_impl::<C>)
}

async fn filter_command_impl<C>(
    bot: Bot,
    me: Me,
    msg: Message,
    env: Arc<BotEnv>,
) -> Option<C>
where
    C: BotCommands + BotCommandsExtTrait + Send + Sync + 'static,
{
    let cmd = C::parse(msg.text()?, &me.user.username?).ok()?;
    let rules = cmd.command_rules();

    let error_text = if !rules.in_group
        && (msg.chat.is_group() || msg.chat.is_supergroup())
    {
        Some("This command is not allowed in group chats")
    } else if !rules.in_private && msg.chat.is_private() {
        Some("This command is not allowed in private chats")
    } else if rules.authorized {
        match is_user_authorized(&bot, &env, msg.chat.id, msg.from.as_ref()?.id)
            .await
        {
            Ok(true) => None,
            Ok(false) => Some(
                "You are not authorized to use this command. Only group \
                 owners and authorized users can change these settings.",
            ),
            Err(e) => {
                log::error!("Failed to check permissions: {e:?}");
                Some("Could not verify your permissions, try again later.")
            }
        }
    } else {
        None
    };

    if let Some(error_text) = error_text {
        let _ = bot.reply_message(&msg, error_text).await;
        return None;
    }

    Some(cmd)
}

#[cfg(test)]
mod tests {
    use macro_rules_attribute::derive;

    use super::*;

    #[derive(Debug, BotCommands, BotCommandsExt!)]
    #[command(parse_with = "split")]
    enum MyCommand {
        Defaults,

        #[doc = "Variant 2"]
        WithDoc,

        #[custom(authorized = true)]
        WithCustom,

        #[doc = "Variant 4"]
        #[custom(authorized = true, in_private = false)]
        WithDocAndCustom,

        #[custom(in_private = true, in_group = true)]
        WithArgsAndCustom(i32, i32),
    }

    #[test]
    fn test() {
        assert_eq!(
            MyCommand::Defaults.command_rules(),
            CommandAccessRules::default()
        );
        assert_eq!(
            MyCommand::WithDoc.command_rules(),
            CommandAccessRules::default()
        );
        assert_eq!(
            MyCommand::WithCustom.command_rules(),
            CommandAccessRules { authorized: true, ..Default::default() }
        );
        assert_eq!(
            MyCommand::WithDocAndCustom.command_rules(),
            CommandAccessRules {
                authorized: true,
                in_private: false,
                ..Default::default()
            }
        );
        assert_eq!(
            MyCommand::WithArgsAndCustom(1, 2).command_rules(),
            CommandAccessRules {
                in_private: true,
                in_group: true,
                ..Default::default()
            }
        );
    }
}
