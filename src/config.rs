use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serenity::prelude::TypeMapKey;

use crate::error::{BotError, BotResult};

const DEFAULT_PREFIX: &str = "!";
const DEFAULT_SOUND_DIR: &str = "sound";
const DEFAULT_QUOTES_PATH: &str = "quotes.jsonl";
const DEFAULT_MUSIC_VOLUME: f32 = 0.02;
const DEFAULT_SPEECH_VOLUME: f32 = 0.1;
const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub prefix: String,
    pub sound_dir: PathBuf,
    pub quotes_path: PathBuf,
    pub music_volume: f32,
    pub speech_volume: f32,
    pub tts_url: String,
}

pub struct BotConfig;

impl TypeMapKey for BotConfig {
    type Value = Arc<Config>;
}

impl Config {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> BotResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| BotError::Config("Expected DISCORD_TOKEN in the environment".to_string()))?;

        let config = Self {
            discord_token,
            prefix: lookup("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            sound_dir: lookup("SOUND_DIR").unwrap_or_else(|| DEFAULT_SOUND_DIR.to_string()).into(),
            quotes_path: lookup("QUOTES_PATH").unwrap_or_else(|| DEFAULT_QUOTES_PATH.to_string()).into(),
            music_volume: parse_or(&lookup, "MUSIC_VOLUME", DEFAULT_MUSIC_VOLUME)?,
            speech_volume: parse_or(&lookup, "SPEECH_VOLUME", DEFAULT_SPEECH_VOLUME)?,
            tts_url: lookup("TTS_URL").unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.prefix.trim().is_empty() {
            return Err(BotError::Config("COMMAND_PREFIX must not be empty".to_string()));
        }

        for (name, volume) in [("MUSIC_VOLUME", self.music_volume), ("SPEECH_VOLUME", self.speech_volume)] {
            if !(0.0..=2.0).contains(&volume) {
                return Err(BotError::Config(format!("{name} must be between 0.0 and 2.0, got {volume}")));
            }
        }

        Ok(())
    }

    /// The speech renderer writes here before the clip is played.
    pub fn speech_path(&self) -> PathBuf {
        self.sound_dir.join("say.mp3")
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> BotResult<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| BotError::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> BotResult<Config> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.prefix, "!");
        assert_eq!(config.quotes_path, PathBuf::from("quotes.jsonl"));
        assert_eq!(config.music_volume, 0.02);
        assert_eq!(config.speech_path(), PathBuf::from("sound/say.mp3"));
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(matches!(config_from(&[]), Err(BotError::Config(_))));
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let result = config_from(&[("DISCORD_TOKEN", "abc"), ("MUSIC_VOLUME", "3.5")]);

        assert!(matches!(result, Err(BotError::Config(message)) if message.contains("MUSIC_VOLUME")));
    }

    #[test]
    fn unparsable_volume_is_rejected() {
        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("SPEECH_VOLUME", "loud")]).is_err());
    }
}
