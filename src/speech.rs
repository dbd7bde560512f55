use std::path::{Path, PathBuf};
use std::sync::Arc;

use serenity::prelude::TypeMapKey;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::BotResult;
use crate::files::write_atomic_async;

/// The TTS endpoint refuses longer requests.
const MAX_CHUNK_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Voice {
    English,
    SlowEnglish,
    Japanese,
}

impl Voice {
    fn language(self) -> &'static str {
        match self {
            Voice::English | Voice::SlowEnglish => "en-GB",
            Voice::Japanese => "ja",
        }
    }

    fn speed(self) -> &'static str {
        match self {
            Voice::SlowEnglish => "0.3",
            Voice::English | Voice::Japanese => "1",
        }
    }
}

/// Renders text to MP3 through the translate TTS endpoint and keeps the shared output file.
pub struct Speech {
    client: reqwest::Client,
    url: String,
    output: PathBuf,
    output_lock: Mutex<()>,
}

impl TypeMapKey for Speech {
    type Value = Arc<Speech>;
}

/// The freshly written speech file. Holding it keeps other renders from replacing the file.
pub struct Rendered<'a> {
    _guard: MutexGuard<'a, ()>,
    path: &'a Path,
}

impl Rendered<'_> {
    pub fn path(&self) -> &Path {
        self.path
    }
}

impl Speech {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            output: output.into(),
            output_lock: Mutex::new(()),
        }
    }

    pub async fn render(&self, text: &str, voice: Voice) -> BotResult<Vec<u8>> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let query = [
                ("ie", "UTF-8".to_string()),
                ("client", "tw-ob".to_string()),
                ("tl", voice.language().to_string()),
                ("ttsspeed", voice.speed().to_string()),
                ("total", total.clone()),
                ("idx", index.to_string()),
                ("textlen", chunk.chars().count().to_string()),
                ("q", chunk.clone()),
            ];

            let bytes = self
                .client
                .get(&self.url)
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            audio.extend_from_slice(&bytes);
        }

        info!("Rendered {} speech chunks ({} bytes)", chunks.len(), audio.len());

        Ok(audio)
    }

    /// Replaces the output file with `audio` and returns it still locked.
    pub async fn store(&self, audio: Vec<u8>) -> BotResult<Rendered<'_>> {
        let guard = self.output_lock.lock().await;

        write_atomic_async(&self.output, audio).await?;

        Ok(Rendered {
            _guard: guard,
            path: &self.output,
        })
    }
}

/// Splits on whitespace into pieces of at most `limit` characters; longer words are cut.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.push(word.drain(..limit).collect());
        }

        let current_len = current.chars().count();
        let needed = if current.is_empty() { word.len() } else { current_len + 1 + word.len() };

        if needed > limit {
            chunks.push(std::mem::take(&mut current));
        }

        if !word.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
