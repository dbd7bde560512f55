use std::fmt;
use std::time::Duration;

use serenity::model::id::{ChannelId, UserId};

pub const UNKNOWN_TRACK_TITLE: &str = "UNKNOWN TRACK";

/// Who asked for a track and where its announcements go.
#[derive(Clone, Debug, PartialEq)]
pub struct Requester {
    pub id: UserId,
    pub display_name: String,
    pub channel_id: ChannelId,
}

/// A resolved play request, waiting in (or popped from) a server's queue.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackEntry {
    pub requester: Requester,
    pub title: String,
    pub url: String,
    pub duration: Option<Duration>,
    pub volume: f32,
}

impl TrackEntry {
    pub fn channel_id(&self) -> ChannelId {
        self.requester.channel_id
    }
}

impl fmt::Display for TrackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}* requested by {}", self.title, self.requester.display_name)?;

        if let Some(duration) = self.duration.filter(|duration| duration.as_secs() > 0) {
            let seconds = duration.as_secs();
            write!(f, " [length: {}m {}s]", seconds / 60, seconds % 60)?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn entry(title: &str) -> TrackEntry {
    TrackEntry {
        requester: Requester {
            id: UserId(7),
            display_name: "Tom".to_string(),
            channel_id: ChannelId(42),
        },
        title: title.to_string(),
        url: format!("https://example.com/{title}"),
        duration: None,
        volume: 0.02,
    }
}
