use std::path::Path;

use serenity::client::Context;
use serenity::framework::standard::macros::{command, group};
use serenity::framework::standard::CommandResult;
use serenity::model::channel::Message;
use tracing::info;

use crate::chat::check_msg;
use crate::commands::shared;
use crate::config::BotConfig;
use crate::error::BotResult;
use crate::voice::{ensure_connected, existing_playback, guild_id, play_file};

#[group]
#[commands(clips)]
struct Sounds;

/// A short sound triggered by typing its name as a command.
#[derive(Debug)]
pub struct Clip {
    pub name: &'static str,
    pub file: &'static str,
    pub volume: f32,
    /// Sent to the channel alongside the sound.
    pub says: Option<&'static str>,
}

const fn clip(name: &'static str, file: &'static str, volume: f32) -> Clip {
    Clip {
        name,
        file,
        volume,
        says: None,
    }
}

pub static CLIPS: [Clip; 9] = [
    clip("lucio", "Lúcio_-_Why_are_you_so_angry.ogg", 0.04),
    Clip {
        name: "omen",
        file: "omen.mp3",
        volume: 0.02,
        says: Some("It's a Omen!"),
    },
    clip("dva", "D.Va_Here_comes_a_new_challenger.ogg", 0.04),
    clip("tracer", "cavalry's here!.ogg", 0.04),
    clip("doomfist", "Doomfist_-_Hello_there.ogg", 0.04),
    clip("obi", "hello_there_obi.mp3", 0.1),
    clip("objection", "objection.mp3", 0.04),
    clip("mei", "Mei_-_A-Mei-Zing.mp3", 0.04),
    clip("no", "Hotel Mario  No.mp3", 0.04),
];

pub fn find_clip(name: &str) -> Option<&'static Clip> {
    CLIPS.iter().find(|clip| clip.name.eq_ignore_ascii_case(name))
}

/// Plays a local file over the author's voice channel. Music takes precedence.
pub async fn play_sound(ctx: &Context, msg: &Message, path: &Path, volume: f32) -> BotResult<()> {
    let guild_id = guild_id(msg)?;

    if !ensure_connected(ctx, msg).await? {
        return Ok(());
    }

    if let Some(playback) = existing_playback(ctx, guild_id).await {
        if playback.is_playing().await {
            check_msg(msg.channel_id.say(&ctx.http, "Can't play sounds while music is playing").await);

            return Ok(());
        }
    }

    play_file(ctx, guild_id, path, volume).await?;

    Ok(())
}

/// `false` when `name` is not a clip trigger.
pub async fn play_clip(ctx: &Context, msg: &Message, name: &str) -> BotResult<bool> {
    let Some(clip) = find_clip(name) else {
        return Ok(false);
    };

    if msg.guild_id.is_none() {
        return Ok(true);
    }

    info!("Playing clip {}", clip.name);

    if let Some(says) = clip.says {
        check_msg(msg.channel_id.say(&ctx.http, says).await);
    }

    let sound_dir = shared::<BotConfig>(ctx).await?.sound_dir.clone();
    play_sound(ctx, msg, &sound_dir.join(clip.file), clip.volume).await?;

    Ok(true)
}

#[command]
async fn clips(ctx: &Context, msg: &Message) -> CommandResult {
    let prefix = shared::<BotConfig>(ctx).await?.prefix.clone();

    check_msg(msg.channel_id.say(&ctx.http, clip_listing(&prefix)).await);

    Ok(())
}

fn clip_listing(prefix: &str) -> String {
    let triggers: Vec<String> = CLIPS.iter().map(|clip| format!("{prefix}{}", clip.name)).collect();

    format!("**Clips**: {}", triggers.join(", "))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clips_are_found_by_trigger() {
        assert_eq!(find_clip("omen").and_then(|clip| clip.says), Some("It's a Omen!"));
        assert_eq!(find_clip("OBI").map(|clip| clip.volume), Some(0.1));
        assert!(find_clip("play").is_none());
    }

    #[test]
    fn triggers_are_unique() {
        for (index, clip) in CLIPS.iter().enumerate() {
            assert!(CLIPS[index + 1..].iter().all(|other| other.name != clip.name));
        }
    }

    #[test]
    fn listing_uses_prefix() {
        let listing = clip_listing("?");

        assert!(listing.starts_with("**Clips**: ?lucio, ?omen"));
        assert!(listing.ends_with("?no"));
    }
}
