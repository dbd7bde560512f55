use std::cmp::min;
use std::sync::Arc;

use serenity::client::Context;
use serenity::framework::standard::macros::{command, group};
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;
use songbird::input::ytdl_search;
use tracing::info;

use crate::chat::check_msg;
use crate::commands::{requester, shared};
use crate::config::BotConfig;
use crate::error::{BotError, BotResult};
use crate::models::{Requester, TrackEntry, UNKNOWN_TRACK_TITLE};
use crate::playlists::{is_playlist_url, songs_list_from_playlist_url};
use crate::voice::{
    ensure_connected, existing_playback, guild_id, leave, playback_for, summon as summon_author, teardown,
    GuildPlayback,
};

const MAX_LISTED_TRACKS: usize = 20;
const NOT_PLAYING: &str = "Not playing any music right now...";

#[group]
#[commands(play, skip, pause, resume, stop, vol, playing, queue, summon)]
struct Music;

#[command]
#[only_in(guilds)]
async fn summon(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_id(msg)?;
    playback_for(ctx, guild_id).await?;

    summon_author(ctx, msg).await?;

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn play(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let user_input = args.rest().trim();

    if user_input.is_empty() {
        check_msg(msg.channel_id.say(&ctx.http, "Enter a URL or a title after play").await);

        return Ok(());
    }

    info!("User input is {user_input}");

    let guild_id = guild_id(msg)?;
    let playback = playback_for(ctx, guild_id).await?;

    if !ensure_connected(ctx, msg).await? {
        return Ok(());
    }

    let volume = shared::<BotConfig>(ctx).await?.music_volume;
    let requester = requester(ctx, msg).await;

    if is_playlist_url(user_input) {
        info!("Detected playlist in {user_input}");

        let songs = songs_list_from_playlist_url(user_input, &requester, volume).await?;
        let count = playback.enqueue_all(songs).await;

        check_msg(msg.channel_id.say(&ctx.http, format!("Queued {count} tracks from the playlist")).await);
    } else {
        let entry = resolve_track(user_input, requester, volume).await?;
        info!("Queueing {} for user {}", entry.url, entry.requester.id.0);

        check_msg(msg.channel_id.say(&ctx.http, format!("Queued {entry}")).await);
        playback.enqueue(entry).await;
    }

    Ok(())
}

/// Looks the input up (directly for URLs, as a search otherwise) and keeps what the queue needs.
async fn resolve_track(user_input: &str, requester: Requester, volume: f32) -> BotResult<TrackEntry> {
    let input = if user_input.starts_with("http") {
        songbird::ytdl(user_input).await
    } else {
        ytdl_search(user_input).await
    }?;

    let metadata = &input.metadata;
    let url = metadata
        .source_url
        .clone()
        .ok_or_else(|| BotError::Unresolved(user_input.to_string()))?;

    Ok(TrackEntry {
        requester,
        title: metadata.title.clone().unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string()),
        url,
        duration: metadata.duration,
        volume,
    })
}

async fn current_playback(ctx: &Context, msg: &Message) -> BotResult<Option<Arc<GuildPlayback>>> {
    Ok(existing_playback(ctx, guild_id(msg)?).await)
}

#[command]
#[only_in(guilds)]
async fn skip(ctx: &Context, msg: &Message) -> CommandResult {
    let skipped = match current_playback(ctx, msg).await? {
        Some(playback) => playback.skip().await?,
        None => false,
    };

    let reply = if skipped { "Skipping song..." } else { NOT_PLAYING };
    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn pause(ctx: &Context, msg: &Message) -> CommandResult {
    let paused = match current_playback(ctx, msg).await? {
        Some(playback) => playback.pause().await?,
        None => false,
    };

    if !paused {
        check_msg(msg.channel_id.say(&ctx.http, NOT_PLAYING).await);
    }

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn resume(ctx: &Context, msg: &Message) -> CommandResult {
    let resumed = match current_playback(ctx, msg).await? {
        Some(playback) => playback.resume().await?,
        None => false,
    };

    if !resumed {
        check_msg(msg.channel_id.say(&ctx.http, NOT_PLAYING).await);
    }

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn stop(ctx: &Context, msg: &Message) -> CommandResult {
    let guild_id = guild_id(msg)?;

    teardown(ctx, guild_id).await?;

    if leave(ctx, guild_id).await? {
        check_msg(msg.channel_id.say(&ctx.http, "Left voice channel").await);
    }

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn vol(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let playback = match current_playback(ctx, msg).await? {
        Some(playback) if playback.is_playing().await => playback,
        _ => {
            check_msg(msg.channel_id.say(&ctx.http, "No song is currently playing").await);
            return Ok(());
        }
    };

    let reply = if args.is_empty() {
        match playback.volume().await {
            Some(volume) => format!("Song volume is {}", percent(volume)),
            None => "No song is currently playing".to_string(),
        }
    } else {
        match args.single::<i64>() {
            Ok(value) => match playback.set_volume(volume_from_percent(value)).await? {
                Some(volume) => format!("Set the volume to {}", percent(volume)),
                None => "No song is currently playing".to_string(),
            },
            Err(_) => "Enter a number after !vol to change the volume".to_string(),
        }
    };

    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}

/// Songbird treats 1.0 as unity gain; anything past 200% only distorts.
fn volume_from_percent(value: i64) -> f32 {
    value.clamp(0, 200) as f32 / 100.0
}

fn percent(volume: f32) -> String {
    format!("{:.0}%", volume * 100.0)
}

#[command]
#[only_in(guilds)]
async fn playing(ctx: &Context, msg: &Message) -> CommandResult {
    let current = match current_playback(ctx, msg).await? {
        Some(playback) => playback.now_playing().await,
        None => None,
    };

    let reply = match current {
        Some(entry) => format!("Now playing {entry}"),
        None => "Not playing anything.".to_string(),
    };

    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}

#[command]
#[only_in(guilds)]
async fn queue(ctx: &Context, msg: &Message) -> CommandResult {
    let songs = match current_playback(ctx, msg).await? {
        Some(playback) => playback.upcoming().await,
        None => Vec::new(),
    };

    check_msg(msg.channel_id.say(&ctx.http, queue_listing(&songs)).await);

    Ok(())
}

fn queue_listing(songs: &[TrackEntry]) -> String {
    if songs.is_empty() {
        return "The queue is empty!".to_string();
    }

    let mut songs_titles: Vec<String> = Vec::with_capacity(min(songs.len(), MAX_LISTED_TRACKS));

    for (index, song) in songs.iter().take(MAX_LISTED_TRACKS).enumerate() {
        let song_index = index + 1;
        songs_titles.push(format!("{song_index} - {}", song.title));
    }

    let songs_formatted = songs_titles.join("\n");

    format!("**Queue**:\n```{songs_formatted}```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry;

    #[test]
    fn volume_percent_round_trip() {
        assert_eq!(volume_from_percent(50), 0.5);
        assert_eq!(volume_from_percent(-5), 0.0);
        assert_eq!(volume_from_percent(1000), 2.0);
        assert_eq!(percent(0.02), "2%");
        assert_eq!(percent(1.0), "100%");
    }

    #[test]
    fn queue_listing_numbers_and_caps() {
        assert_eq!(queue_listing(&[]), "The queue is empty!");

        let songs: Vec<TrackEntry> = (0..25).map(|n| entry(&format!("song{n}"))).collect();
        let listing = queue_listing(&songs);

        assert!(listing.starts_with("**Queue**:\n```1 - song0\n2 - song1"));
        assert!(listing.contains("20 - song19```"));
        assert!(!listing.contains("song20"));
    }
}
