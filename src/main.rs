#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Restriction lints
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::deref_by_slicing,
    clippy::if_then_some_else_none,
    clippy::undocumented_unsafe_blocks,
    clippy::unnecessary_cast,
    clippy::unnecessary_safety_comment
)]
// False positives
#![allow(clippy::needless_pass_by_value)] // for dptree handlers
// Style
#![allow(clippy::items_after_statements)]

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use argh::FromArgs;
use metrics_exporter_prometheus::PrometheusBuilder;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::types::{Message, Update};
use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use crate::settings::SettingsStore;

mod common;
mod config;
mod metrics;
mod modules;
mod settings;
mod utils;

static VERSION: OnceLock<String> = OnceLock::new();

fn version() -> &'static str {
    VERSION.get().expect("VERSION is not set")
}

/// sweepbot
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    #[argh(option, hidden_help = true, long = "-set-revision")]
    set_revision: Option<String>,

    #[argh(subcommand)]
    subcommand: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Bot(SubCommandBot),
}

/// run the bot
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "bot")]
struct SubCommandBot {
    /// config file
    #[argh(positional)]
    config_file: OsString,
}

#[tokio::main]
async fn main() -> Result<()> {
    std::env::set_var("RUST_LOG", "info");
    pretty_env_logger::init();
    let args: Args = argh::from_env();
    VERSION
        .set(args.set_revision.unwrap_or_else(|| {
            git_version::git_version!(fallback = "unknown").to_string()
        }))
        .unwrap();
    log::info!("Version {}", version());
    match args.subcommand {
        SubCommand::Bot(c) => run_bot(&c.config_file).await?,
    }
    Ok(())
}

async fn run_bot(config_fpath: &OsStr) -> Result<()> {
    let config: config::Config =
        serde_yaml::from_reader(File::open(config_fpath)?)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))?;

    PrometheusBuilder::new()
        .with_http_listener(config.server_addr)
        .install()?;
    metrics::register_metrics();

    let settings = SettingsStore::load(config.settings_file.clone())?;

    let bot_env = Arc::new(common::BotEnv {
        settings,
        pending_deletions: modules::sweeper::PendingDeletions::new(),
        config: Arc::new(config),
    });

    let bot = Bot::new(&bot_env.config.telegram.token);

    let mut dispatcher = Dispatcher::builder(
        bot.clone(),
        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| !msg.chat.is_channel())
                    .branch(modules::basic::command_handler())
                    .branch(modules::retention::command_handler())
                    .branch(modules::sweeper::message_handler())
                    .endpoint(drop_endpoint),
            )
            .endpoint(drop_endpoint),
    )
    .dependencies(dptree::deps![Arc::clone(&bot_env)])
    .build();
    let bot_shutdown_token = dispatcher.shutdown_token().clone();
    let mut join_handles = Vec::new();
    join_handles.push(tokio::spawn(async move { dispatcher.dispatch().await }));

    let cancel = CancellationToken::new();

    if bot_env.config.moderation.announce_restart {
        join_handles.push(tokio::spawn(modules::announce::task(
            Arc::clone(&bot_env),
            bot.clone(),
            cancel.clone(),
        )));
    }

    run_signal_handler(bot_shutdown_token.clone(), cancel.clone());

    futures::future::join_all(join_handles).await;

    Ok(())
}

async fn drop_endpoint() -> Result<()> {
    Ok(())
}

fn run_signal_handler(
    bot_shutdown_token: teloxide::dispatching::ShutdownToken,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.expect("Failed to listen for SIGINT");
            cancel.cancel();
            match bot_shutdown_token.shutdown() {
                Ok(f) => {
                    log::info!(
                        "^C received, trying to shutdown the dispatcher..."
                    );
                    tokio::select! {
                        () = f => {
                            log::info!("dispatcher is shutdown...");
                        }
                        _ = tokio::signal::ctrl_c() => {
                            log::info!("Got another ^C, exiting immediately");
                            std::process::exit(0);
                        }
                    }
                }
                Err(_) => {
                    log::info!("^C received, the dispatcher isn't running, ignoring the signal");
                }
            }
        }
    });
}
