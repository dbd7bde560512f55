use std::error::Error as StdError;

use serenity::framework::standard::CommandError;
use songbird::error::JoinError;
use songbird::input::error::Error as InputError;
use songbird::tracks::TrackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("not connected to a voice channel in this server")]
    NotConnected,

    #[error("{0}")]
    Join(#[from] JoinError),

    #[error("{0}")]
    Input(#[from] InputError),

    #[error("{0}")]
    Track(#[from] TrackError),

    #[error("{0}")]
    Discord(#[from] serenity::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    QuoteRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Speech(#[from] reqwest::Error),

    #[error("Could not load song for input {0}")]
    Unresolved(String),

    #[error("{0}")]
    Playlist(String),

    #[error("{0}")]
    Config(String),

    #[error("guild not found")]
    GuildNotFound,

    #[error("songbird voice client was not registered")]
    VoiceClientMissing,
}

impl BotError {
    /// Short type-like name shown to users next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::NotConnected => "NotConnected",
            BotError::Join(_) => "JoinError",
            BotError::Input(_) => "InputError",
            BotError::Track(_) => "TrackError",
            BotError::Discord(_) => "DiscordError",
            BotError::Io(_) => "IoError",
            BotError::QuoteRecord { .. } => "QuoteRecordError",
            BotError::Json(_) => "JsonError",
            BotError::Speech(_) => "SpeechError",
            BotError::Unresolved(_) => "UnresolvedTrack",
            BotError::Playlist(_) => "PlaylistError",
            BotError::Config(_) => "ConfigError",
            BotError::GuildNotFound => "GuildNotFound",
            BotError::VoiceClientMissing => "VoiceClientMissing",
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

/// Formats a failed command for the channel it came from.
pub fn describe(error: &(dyn StdError + Send + Sync + 'static)) -> String {
    let kind = error
        .downcast_ref::<BotError>()
        .map(BotError::kind)
        .unwrap_or("Error");

    format!("An error occurred while processing this request: ```\n{kind}: {error}\n```")
}

pub fn describe_command_error(error: &CommandError) -> String {
    describe(error.as_ref())
}
