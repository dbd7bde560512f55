use std::collections::HashMap;
use std::sync::Arc;

use serenity::{
    async_trait,
    client::{Client, Context, EventHandler},
    framework::StandardFramework,
    model::{gateway::Ready, guild::Member, mention::Mentionable, voice::VoiceState},
    prelude::GatewayIntents,
};
use songbird::{SerenityInit, Songbird};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::chat::check_msg;
use crate::commands::games::GAMES_GROUP;
use crate::commands::music::MUSIC_GROUP;
use crate::commands::quotes::QUOTING_GROUP;
use crate::commands::sounds::SOUNDS_GROUP;
use crate::commands::speech::SPEAK_GROUP;
use crate::commands::GENERAL_GROUP;
use crate::config::{BotConfig, Config};
use crate::error::BotResult;
use crate::quotes::QuoteStore;
use crate::speech::Speech;
use crate::voice::{teardown, ServersManager};

mod betrayal;
mod chat;
mod commands;
mod config;
mod dice;
mod error;
mod files;
mod models;
mod playback;
mod playlists;
mod quotes;
mod speech;
mod voice;

const DEFAULT_LOG_FILTER: &str = "jerry=info,serenity=warn,songbird=warn";

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected with id {}!", ready.user.name, ready.user.id.0);
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let Some(guild) = ctx.cache.guild(new_member.guild_id) else {
            warn!("Member joined unknown guild {}", new_member.guild_id.0);
            return;
        };

        let Some(channel_id) = guild.system_channel_id else {
            info!("Guild {} has no system channel to greet in", guild.name);
            return;
        };

        let greeting = format!("Welcome {} to {}!", new_member.mention(), guild.name);
        check_msg(channel_id.say(&ctx.http, greeting).await);
    }

    async fn voice_state_update(&self, ctx: Context, _: Option<VoiceState>, new: VoiceState) {
        if new.channel_id.is_some() || new.user_id != ctx.cache.current_user_id() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("Disconnected from voice in guild {}", guild_id.0);

            if let Err(error) = teardown(&ctx, guild_id).await {
                warn!("Could not tear down playback for guild {}: {error:?}", guild_id.0);
            }
        }
    }
}

#[tokio::main]
async fn main() -> BotResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let config = Arc::new(Config::load()?);

    let framework = StandardFramework::new()
        .configure(|c| c.prefix(&config.prefix))
        .before(commands::before)
        .after(commands::after)
        .unrecognised_command(commands::unknown_command)
        .group(&GENERAL_GROUP)
        .group(&MUSIC_GROUP)
        .group(&SOUNDS_GROUP)
        .group(&SPEAK_GROUP)
        .group(&QUOTING_GROUP)
        .group(&GAMES_GROUP);

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT | GatewayIntents::GUILD_MEMBERS;

    let songbird = Songbird::serenity();

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler)
        .framework(framework)
        .register_songbird_with(Arc::clone(&songbird))
        .await?;

    let quote_store = Arc::new(QuoteStore::new(&config.quotes_path));

    match quote_store.load().await {
        Ok(quotes) => info!("Loaded quotes for {} people", quotes.users().count()),
        Err(why) => warn!("Quote file {} is unreadable: {why}", config.quotes_path.display()),
    }

    {
        let mut data = client.data.write().await;

        data.insert::<BotConfig>(Arc::clone(&config));
        data.insert::<ServersManager>(HashMap::new());
        data.insert::<QuoteStore>(quote_store);
        data.insert::<Speech>(Arc::new(Speech::new(&config.tts_url, config.speech_path())));
    }

    let data = Arc::clone(&client.data);
    let cache = Arc::clone(&client.cache_and_http.cache);
    let shard_manager = Arc::clone(&client.shard_manager);

    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!("Client ended: {why:?}");
        }
    });

    tokio::signal::ctrl_c().await?;

    info!("Received Ctrl-C, shutting down.");

    let servers = data
        .write()
        .await
        .get_mut::<ServersManager>()
        .map(std::mem::take)
        .unwrap_or_default();

    for (guild_id, playback) in servers {
        if let Err(why) = playback.shutdown().await {
            warn!("Could not stop playback in guild {}: {why:?}", guild_id.0);
        }
    }

    for guild_id in cache.guilds() {
        if songbird.get(guild_id).is_some() {
            if let Err(why) = songbird.remove(guild_id).await {
                warn!("Could not leave voice in guild {}: {why:?}", guild_id.0);
            }
        }
    }

    shard_manager.lock().await.shutdown_all().await;

    Ok(())
}
