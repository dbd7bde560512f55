use serenity::client::Context;
use serenity::framework::standard::macros::{command, group};
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;
use tracing::info;

use crate::chat::check_msg;
use crate::commands::shared;
use crate::commands::sounds::play_sound;
use crate::config::BotConfig;
use crate::error::BotResult;
use crate::speech::{Speech, Voice};

#[group]
#[only_in(guilds)]
#[commands(say, slow, jap)]
struct Speak;

#[command]
async fn say(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    speak_args(ctx, msg, args, Voice::English).await
}

#[command]
async fn slow(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    speak_args(ctx, msg, args, Voice::SlowEnglish).await
}

#[command]
async fn jap(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    speak_args(ctx, msg, args, Voice::Japanese).await
}

async fn speak_args(ctx: &Context, msg: &Message, args: Args, voice: Voice) -> CommandResult {
    let text = args.rest().trim();

    if text.is_empty() {
        check_msg(msg.channel_id.say(&ctx.http, "Enter some text to say").await);

        return Ok(());
    }

    speak(ctx, msg, text, voice).await?;

    Ok(())
}

/// Renders `text` and plays it in the author's voice channel.
pub async fn speak(ctx: &Context, msg: &Message, text: &str, voice: Voice) -> BotResult<()> {
    let speech = shared::<Speech>(ctx).await?;
    let volume = shared::<BotConfig>(ctx).await?.speech_volume;

    info!("Speaking {} characters with {voice:?}", text.chars().count());

    let audio = speech.render(text, voice).await?;

    // ffmpeg opens the file on spawn, so the lock only has to outlive play_sound.
    let rendered = speech.store(audio).await?;
    play_sound(ctx, msg, rendered.path(), volume).await?;
    drop(rendered);

    Ok(())
}
