use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{BotError, BotResult};
use crate::models::{Requester, TrackEntry, UNKNOWN_TRACK_TITLE};

/// One line of `yt-dlp -j --flat-playlist` output.
#[derive(Deserialize)]
pub struct PlaylistSong {
    pub url: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
}

pub fn is_playlist_url(input: &str) -> bool {
    input.starts_with("http") && (input.contains("&list=") || input.contains("?list="))
}

pub async fn songs_list_from_playlist_url(url: &str, requester: &Requester, volume: f32) -> BotResult<Vec<TrackEntry>> {
    info!("Getting songs from playlist {url}");

    let output = Command::new("yt-dlp")
        .arg("-j")
        .arg("--flat-playlist")
        .arg(url)
        .output()
        .await
        .map_err(|why| BotError::Playlist(format!("yt-dlp failed to start: {why}")))?;

    let result = String::from_utf8_lossy(&output.stdout);

    if result.trim().is_empty() {
        let error = String::from_utf8_lossy(&output.stderr);

        return Err(BotError::Playlist(error.trim().to_string()));
    }

    Ok(parse_playlist(&result, requester, volume))
}

/// Lines that fail to parse are skipped.
pub fn parse_playlist(output: &str, requester: &Requester, volume: f32) -> Vec<TrackEntry> {
    let lines: Vec<&str> = output.lines().filter(|line| !line.trim().is_empty()).collect();

    let songs: Vec<TrackEntry> = lines
        .iter()
        .filter_map(|line| {
            let playlist_song: PlaylistSong = serde_json::from_str(line).ok()?;

            let duration = playlist_song
                .duration
                .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
                .map(Duration::from_secs_f64);

            Some(TrackEntry {
                requester: requester.clone(),
                title: playlist_song.title.unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string()),
                url: playlist_song.url,
                duration,
                volume,
            })
        })
        .collect();

    if songs.len() < lines.len() {
        warn!("{} playlist entries skipped due to errors during parsing", lines.len() - songs.len());
    }

    songs
}

#[cfg(test)]
mod tests {
    use serenity::model::id::{ChannelId, UserId};

    use super::*;

    fn requester() -> Requester {
        Requester {
            id: UserId(1),
            display_name: "Ann".to_string(),
            channel_id: ChannelId(2),
        }
    }

    #[test]
    fn detects_playlist_urls() {
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist_url("https://www.youtube.com/watch?v=abc&list=PL123"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
        assert!(!is_playlist_url("never gonna give you up list=1"));
    }

    #[test]
    fn parses_flat_playlist_lines_and_skips_garbage() {
        let output = concat!(
            r#"{"_type": "url", "url": "https://www.youtube.com/watch?v=a", "title": "First", "duration": 61.0}"#,
            "\n",
            "not json\n",
            r#"{"_type": "url", "url": "https://www.youtube.com/watch?v=b", "title": null, "duration": null}"#,
            "\n",
        );

        let songs = parse_playlist(output, &requester(), 0.02);

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "First");
        assert_eq!(songs[0].duration, Some(Duration::from_secs(61)));
        assert_eq!(songs[1].title, UNKNOWN_TRACK_TITLE);
        assert_eq!(songs[1].duration, None);
        assert_eq!(songs[1].requester.display_name, "Ann");
    }
}
