use std::collections::VecDeque;
use std::sync::Arc;

use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn};
use tracing_futures::Instrument;

use crate::error::BotResult;
use crate::models::TrackEntry;

/// Control surface of a track that is already streaming.
pub trait TrackControl: Send + Sync + 'static {
    fn pause(&self) -> BotResult<()>;
    fn resume(&self) -> BotResult<()>;
    /// Must eventually fire the advance signal handed to [`VoiceBackend::start`].
    fn stop(&self) -> BotResult<()>;
    fn set_volume(&self, volume: f32) -> BotResult<()>;
}

/// Where the playback loop sends its audio and announcements.
#[async_trait]
pub trait VoiceBackend: Send + Sync + 'static {
    type Handle: TrackControl;

    async fn announce(&self, channel_id: ChannelId, content: String);

    /// Starts streaming `entry`. `advance` has to be notified once the track is over,
    /// whether it finished or was stopped.
    async fn start(&self, entry: &TrackEntry, advance: Arc<Notify>) -> BotResult<Self::Handle>;
}

struct NowPlaying<H> {
    entry: TrackEntry,
    /// `None` while the backend is still starting the track.
    handle: Option<H>,
    volume: f32,
    paused: bool,
    skipped: bool,
}

impl<H> NowPlaying<H> {
    fn starting(entry: TrackEntry) -> Self {
        Self {
            volume: entry.volume,
            entry,
            handle: None,
            paused: false,
            skipped: false,
        }
    }
}

struct Shared<H> {
    queue: Mutex<VecDeque<TrackEntry>>,
    queued: Notify,
    current: Mutex<Option<NowPlaying<H>>>,
}

impl<H> Shared<H> {
    async fn next_queued(&self) -> TrackEntry {
        loop {
            if let Some(entry) = self.queue.lock().await.pop_front() {
                return entry;
            }

            self.queued.notified().await;
        }
    }
}

impl<H: TrackControl> Shared<H> {
    /// Hands the started track to the current slot and replays whatever was asked of it meanwhile.
    async fn install(&self, handle: H) -> BotResult<()> {
        let mut current = self.current.lock().await;

        let Some(playing) = current.as_mut() else {
            return handle.stop();
        };

        let handle = playing.handle.insert(handle);

        if playing.skipped {
            return handle.stop();
        }

        if playing.volume != playing.entry.volume {
            handle.set_volume(playing.volume)?;
        }

        if playing.paused {
            handle.pause()?;
        }

        Ok(())
    }
}

/// Playback state of one server: the queue, the current track and the task consuming them.
pub struct Playback<B: VoiceBackend> {
    shared: Arc<Shared<B::Handle>>,
    consumer: JoinHandle<()>,
}

impl<B: VoiceBackend> Playback<B> {
    pub fn spawn(guild_id: GuildId, backend: B) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            queued: Notify::new(),
            current: Mutex::new(None),
        });

        let consumer = tokio::spawn(
            consume(backend, Arc::clone(&shared)).instrument(info_span!("playback", guild = guild_id.0)),
        );

        Self { shared, consumer }
    }

    /// Appends to the queue and returns the entry's 1-based position in it.
    pub async fn enqueue(&self, entry: TrackEntry) -> usize {
        let position = {
            let mut queue = self.shared.queue.lock().await;
            queue.push_back(entry);
            queue.len()
        };

        self.shared.queued.notify_one();

        position
    }

    pub async fn enqueue_all(&self, entries: Vec<TrackEntry>) -> usize {
        let count = entries.len();

        self.shared.queue.lock().await.extend(entries);
        self.shared.queued.notify_one();

        count
    }

    pub async fn is_playing(&self) -> bool {
        self.shared.current.lock().await.is_some()
    }

    pub async fn now_playing(&self) -> Option<TrackEntry> {
        self.shared.current.lock().await.as_ref().map(|playing| playing.entry.clone())
    }

    pub async fn upcoming(&self) -> Vec<TrackEntry> {
        self.shared.queue.lock().await.iter().cloned().collect()
    }

    /// Stops the current track, which lets the loop move on. `false` when idle.
    /// A track that is still starting is stopped as soon as it starts.
    pub async fn skip(&self) -> BotResult<bool> {
        match self.shared.current.lock().await.as_mut() {
            Some(playing) => {
                playing.skipped = true;

                if let Some(handle) = &playing.handle {
                    handle.stop()?;
                }

                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn pause(&self) -> BotResult<bool> {
        match self.shared.current.lock().await.as_mut() {
            Some(playing) => {
                if let Some(handle) = &playing.handle {
                    handle.pause()?;
                }

                playing.paused = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn resume(&self) -> BotResult<bool> {
        match self.shared.current.lock().await.as_mut() {
            Some(playing) => {
                if let Some(handle) = &playing.handle {
                    handle.resume()?;
                }

                playing.paused = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn volume(&self) -> Option<f32> {
        self.shared.current.lock().await.as_ref().map(|playing| playing.volume)
    }

    /// Changes the volume of the current track only. `None` when idle.
    pub async fn set_volume(&self, volume: f32) -> BotResult<Option<f32>> {
        match self.shared.current.lock().await.as_mut() {
            Some(playing) => {
                if let Some(handle) = &playing.handle {
                    handle.set_volume(volume)?;
                }

                playing.volume = volume;
                Ok(Some(volume))
            }
            None => Ok(None),
        }
    }

    /// Cancels the loop, drops everything queued and stops the current track.
    pub async fn shutdown(&self) -> BotResult<()> {
        self.consumer.abort();

        let dropped = {
            let mut queue = self.shared.queue.lock().await;
            let dropped = queue.len();
            queue.clear();
            dropped
        };

        info!("Playback shut down, {dropped} queued tracks dropped");

        match self.shared.current.lock().await.take().and_then(|playing| playing.handle) {
            Some(handle) => handle.stop(),
            None => Ok(()),
        }
    }
}

impl<B: VoiceBackend> Drop for Playback<B> {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

async fn consume<B: VoiceBackend>(backend: B, shared: Arc<Shared<B::Handle>>) {
    loop {
        let entry = shared.next_queued().await;
        let advance = Arc::new(Notify::new());

        *shared.current.lock().await = Some(NowPlaying::starting(entry.clone()));

        backend.announce(entry.channel_id(), format!("Now playing {entry}")).await;

        match backend.start(&entry, Arc::clone(&advance)).await {
            Ok(handle) => {
                info!("Started {} - {}", entry.title, entry.url);

                if let Err(why) = shared.install(handle).await {
                    warn!("Err applying controls to {}: {why:?}", entry.title);
                }
            }
            Err(why) => {
                shared.current.lock().await.take();

                warn!("Err starting {}: {why:?}", entry.url);
                backend
                    .announce(entry.channel_id(), format!("Could not play {} due to error {}", entry.title, why))
                    .await;
                continue;
            }
        }

        advance.notified().await;

        if let Some(finished) = shared.current.lock().await.take() {
            info!("Finished {}", finished.entry.title);
        }
    }
}
