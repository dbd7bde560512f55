use std::any::type_name;

use serenity::client::Context;
use serenity::framework::standard::macros::{command, group, hook};
use serenity::framework::standard::CommandResult;
use serenity::model::channel::Message;
use serenity::prelude::TypeMapKey;
use tracing::{info, warn};

use crate::chat::check_msg;
use crate::config::BotConfig;
use crate::error::{describe, describe_command_error, BotError, BotResult};
use crate::models::Requester;

use self::cleanup::CLEANUP_COMMAND;

pub mod cleanup;
pub mod games;
pub mod music;
pub mod quotes;
pub mod sounds;
pub mod speech;

#[group]
#[commands(help, cleanup)]
struct General;

/// Clones a value the client put in its `TypeMap` at startup.
pub async fn shared<K>(ctx: &Context) -> BotResult<K::Value>
where
    K: TypeMapKey,
    K::Value: Clone,
{
    ctx.data
        .read()
        .await
        .get::<K>()
        .cloned()
        .ok_or_else(|| BotError::Config(format!("{} was not initialised", type_name::<K>())))
}

pub async fn requester(ctx: &Context, msg: &Message) -> Requester {
    let display_name = msg
        .author_nick(ctx)
        .await
        .unwrap_or_else(|| msg.author.name.clone());

    Requester {
        id: msg.author.id,
        display_name,
        channel_id: msg.channel_id,
    }
}

#[hook]
pub async fn before(_ctx: &Context, msg: &Message, command_name: &str) -> bool {
    info!("Command '{command_name}' invoked by {}", msg.author.tag());

    true
}

/// Reports any failed command back to the channel it came from.
#[hook]
pub async fn after(ctx: &Context, msg: &Message, command_name: &str, command_result: CommandResult) {
    if let Err(why) = command_result {
        warn!("Command '{command_name}' returned error {why:?}");
        check_msg(msg.channel_id.say(&ctx.http, describe_command_error(&why)).await);
    }
}

/// Anything the framework does not know might be a sound clip trigger.
#[hook]
pub async fn unknown_command(ctx: &Context, msg: &Message, unknown_command_name: &str) {
    match sounds::play_clip(ctx, msg, unknown_command_name).await {
        Ok(true) => {}
        Ok(false) => info!("Unknown command '{unknown_command_name}'"),
        Err(why) => {
            warn!("Clip '{unknown_command_name}' failed: {why:?}");
            check_msg(msg.channel_id.say(&ctx.http, describe(&why)).await);
        }
    }
}

#[command]
async fn help(ctx: &Context, msg: &Message) -> CommandResult {
    let prefix = shared::<BotConfig>(ctx).await?.prefix.clone();

    check_msg(msg.channel_id.say(&ctx.http, help_text(&prefix)).await);

    Ok(())
}

fn help_text(p: &str) -> String {
    format!(
        r#"
**Music:**
    **{p}play [URL|Title]** - Queues a track given a URL or a video title (supports youtube playlists).
    **{p}skip** - Skips the current track.
    **{p}pause** / **{p}resume** - Pauses or resumes the current track.
    **{p}stop** - Stops the current track, clears the queue and leaves the voice channel.
    **{p}vol [N]** - Shows the volume of the current track, or sets it to N percent.
    **{p}playing** - Shows the current track.
    **{p}queue** - Shows the queue of tracks.
    **{p}summon** - Joins your voice channel.
**Sounds:**
    **{p}clips** - Lists the sound clips.
    **{p}say** / **{p}slow** / **{p}jap [TEXT]** - Speaks the text.
**Quotes:**
    **{p}quote [NAME] [QUOTE]** - Shows a random quote, a random quote of NAME, or adds QUOTE for NAME.
    **{p}quotes [NAME] [QUOTE]** - Same as quote, and reads it out loud.
    **{p}quoted NAME [QUOTE]** - Deletes every quote of NAME, or only QUOTE.
    **{p}qlist [NAME]** - Lists quotes.
    **{p}qcheck** - Counts quotes per person.
**Other:**
    **{p}roll NdN** - Rolls dice.
    **{p}flip** - Flips a coin.
    **{p}betrayal [PLAYERS]** - Picks characters for Betrayal at House on the Hill.
    **{p}cleanup** - Deletes recent bot messages and commands.
    "#
    )
}
