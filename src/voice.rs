use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serenity::async_trait;
use serenity::client::Context;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::TypeMapKey;
use songbird::input::Input;
use songbird::tracks::{Track, TrackHandle};
use songbird::{create_player, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use tokio::sync::Notify;
use tracing::info;

use crate::chat::check_msg;
use crate::error::{BotError, BotResult};
use crate::models::TrackEntry;
use crate::playback::{Playback, TrackControl, VoiceBackend};

pub type GuildPlayback = Playback<SongbirdBackend>;

/// Every server's playback state, created on first use.
pub struct ServersManager;

impl TypeMapKey for ServersManager {
    type Value = HashMap<GuildId, Arc<GuildPlayback>>;
}

/// Plays queued tracks on a server's songbird call.
pub struct SongbirdBackend {
    http: Arc<Http>,
    songbird: Arc<Songbird>,
    guild_id: GuildId,
}

#[async_trait]
impl VoiceBackend for SongbirdBackend {
    type Handle = TrackHandle;

    async fn announce(&self, channel_id: ChannelId, content: String) {
        check_msg(channel_id.say(&self.http, content).await);
    }

    async fn start(&self, entry: &TrackEntry, advance: Arc<Notify>) -> BotResult<TrackHandle> {
        let handler_lock = self.songbird.get(self.guild_id).ok_or(BotError::NotConnected)?;
        let source = songbird::ytdl(&entry.url).await?;

        let (track, track_handle) = track_at_volume(source, entry.volume);
        handler_lock.lock().await.play(track);

        track_handle.add_event(Event::Track(TrackEvent::End), AdvanceOnEnd { advance })?;

        Ok(track_handle)
    }
}

impl TrackControl for TrackHandle {
    fn pause(&self) -> BotResult<()> {
        Ok(TrackHandle::pause(self)?)
    }

    fn resume(&self) -> BotResult<()> {
        Ok(self.play()?)
    }

    fn stop(&self) -> BotResult<()> {
        Ok(TrackHandle::stop(self)?)
    }

    fn set_volume(&self, volume: f32) -> BotResult<()> {
        Ok(TrackHandle::set_volume(self, volume)?)
    }
}

struct AdvanceOnEnd {
    advance: Arc<Notify>,
}

#[async_trait]
impl VoiceEventHandler for AdvanceOnEnd {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        info!("End notifier triggered");
        self.advance.notify_one();

        None
    }
}

/// Tracks start at full gain unless told otherwise before the mixer sees them.
fn track_at_volume(source: Input, volume: f32) -> (Track, TrackHandle) {
    let (mut track, track_handle) = create_player(source);
    track.set_volume(volume);

    (track, track_handle)
}

pub async fn songbird_manager(ctx: &Context) -> BotResult<Arc<Songbird>> {
    songbird::get(ctx).await.ok_or(BotError::VoiceClientMissing)
}

pub fn guild_id(msg: &Message) -> BotResult<GuildId> {
    msg.guild_id.ok_or(BotError::GuildNotFound)
}

/// The server's playback state, spawning its loop on first use.
pub async fn playback_for(ctx: &Context, guild_id: GuildId) -> BotResult<Arc<GuildPlayback>> {
    if let Some(playback) = existing_playback(ctx, guild_id).await {
        return Ok(playback);
    }

    let songbird = songbird_manager(ctx).await?;
    let mut data = ctx.data.write().await;
    let servers = data.entry::<ServersManager>().or_insert_with(HashMap::new);

    let playback = servers.entry(guild_id).or_insert_with(|| {
        info!("Creating playback state for guild {}", guild_id.0);

        Arc::new(Playback::spawn(
            guild_id,
            SongbirdBackend {
                http: Arc::clone(&ctx.http),
                songbird,
                guild_id,
            },
        ))
    });

    Ok(Arc::clone(playback))
}

pub async fn existing_playback(ctx: &Context, guild_id: GuildId) -> Option<Arc<GuildPlayback>> {
    let data = ctx.data.read().await;

    data.get::<ServersManager>()?.get(&guild_id).cloned()
}

/// Drops the server's playback state, stopping whatever it was doing.
pub async fn teardown(ctx: &Context, guild_id: GuildId) -> BotResult<()> {
    let removed = {
        let mut data = ctx.data.write().await;
        data.get_mut::<ServersManager>().and_then(|servers| servers.remove(&guild_id))
    };

    match removed {
        Some(playback) => playback.shutdown().await,
        None => Ok(()),
    }
}

fn author_channel(ctx: &Context, msg: &Message) -> BotResult<Option<ChannelId>> {
    let guild = msg.guild(&ctx.cache).ok_or(BotError::GuildNotFound)?;

    Ok(guild
        .voice_states
        .get(&msg.author.id)
        .and_then(|voice_state| voice_state.channel_id))
}

/// Joins (or moves to) the author's voice channel. `false` when the author is not in one.
pub async fn summon(ctx: &Context, msg: &Message) -> BotResult<bool> {
    let guild_id = guild_id(msg)?;

    let connect_to = match author_channel(ctx, msg)? {
        Some(channel) => channel,
        None => {
            check_msg(msg.channel_id.say(&ctx.http, "You are not in a voice channel.").await);

            return Ok(false);
        }
    };

    let manager = songbird_manager(ctx).await?;
    let (handler_lock, joined) = manager.join(guild_id, connect_to).await;
    joined?;

    let mut handler = handler_lock.lock().await;

    if handler.is_deaf() {
        info!("Already deafened")
    } else if let Err(e) = handler.deafen(true).await {
        info!("Deafen failed due to {e:?}")
    }

    Ok(true)
}

/// Summons the bot unless it is already connected where the author is.
pub async fn ensure_connected(ctx: &Context, msg: &Message) -> BotResult<bool> {
    let guild_id = guild_id(msg)?;

    // A call survives an admin disconnect; only its channel tells whether it is live.
    let bot_channel = match songbird_manager(ctx).await?.get(guild_id) {
        Some(handler_lock) => handler_lock.lock().await.current_channel().map(|channel| channel.0),
        None => None,
    };

    let author_channel = author_channel(ctx, msg)?.map(|channel| channel.0);

    if needs_summon(bot_channel, author_channel) {
        summon(ctx, msg).await
    } else {
        Ok(true)
    }
}

/// A bot in no channel has to join; a bot elsewhere follows the author when the author is in voice.
fn needs_summon(bot_channel: Option<u64>, author_channel: Option<u64>) -> bool {
    match (bot_channel, author_channel) {
        (None, _) => true,
        (Some(bot), Some(author)) => bot != author,
        (Some(_), None) => false,
    }
}

/// Leaves the voice channel. `false` when the bot was not in one.
pub async fn leave(ctx: &Context, guild_id: GuildId) -> BotResult<bool> {
    let manager = songbird_manager(ctx).await?;

    if manager.get(guild_id).is_none() {
        return Ok(false);
    }

    manager.remove(guild_id).await?;

    Ok(true)
}

/// Plays a local audio file right away, bypassing the queue.
pub async fn play_file(ctx: &Context, guild_id: GuildId, path: &Path, volume: f32) -> BotResult<TrackHandle> {
    let handler_lock = songbird_manager(ctx).await?.get(guild_id).ok_or(BotError::NotConnected)?;
    let source = songbird::ffmpeg(path).await?;

    let (track, track_handle) = track_at_volume(source, volume);
    handler_lock.lock().await.play(track);

    info!("Playing file {}", path.display());

    Ok(track_handle)
}

#[cfg(test)]
mod tests {
    use songbird::input::Reader;

    use super::*;

    #[test]
    fn connection_is_refreshed_when_not_live_or_elsewhere() {
        assert!(needs_summon(None, Some(5)));
        assert!(needs_summon(None, None));
        assert!(needs_summon(Some(4), Some(5)));
        assert!(!needs_summon(Some(5), Some(5)));
        assert!(!needs_summon(Some(5), None));
    }

    #[test]
    fn tracks_are_built_at_the_requested_volume() {
        let source = Input::float_pcm(false, Reader::from_memory(Vec::new()));

        let (track, _handle) = track_at_volume(source, 0.02);

        assert_eq!(track.volume(), 0.02);
    }
}
