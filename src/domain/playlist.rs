//! M3U parsing and rewriting.
//!
//! Input playlists are IPTV-style M3U lists: an `#EXTINF:` metadata line
//! carrying the title after the first comma, followed by the stream URL.
//! The rewritten playlist keeps the titles and points every entry at the
//! locally served HLS output.

use regex::Regex;
use std::iter::{Enumerate, Peekable};
use std::path::Path;
use std::str::Split;
use std::sync::OnceLock;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const HEADER: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("#EXTINF on line {line} has no title")]
    MissingTitle { line: usize },
    #[error("#EXTINF on line {line} is not followed by a URL")]
    MissingUrl { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub title: String,
    pub url: String,
}

impl PlaylistEntry {
    /// Whether the entry points at something ffmpeg can repackage as HLS:
    /// a media playlist, a raw TS segment, or an Xtream-style `get.php` link.
    pub fn qualifies(&self) -> bool {
        static QUALIFYING: OnceLock<Regex> = OnceLock::new();
        QUALIFYING
            .get_or_init(|| Regex::new(r"\.m3u8|\.ts$|get\.php").expect("static regex"))
            .is_match(&self.url)
    }
}

/// Lazily walk the entries of `text`.
pub fn entries(text: &str) -> Entries<'_> {
    Entries {
        lines: text.split('\n').enumerate().peekable(),
    }
}

pub struct Entries<'a> {
    lines: Peekable<Enumerate<Split<'a, char>>>,
}

impl Iterator for Entries<'_> {
    type Item = Result<PlaylistEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, info) = loop {
            let (index, raw) = self.lines.next()?;
            if let Some(info) = raw.trim_end_matches('\r').strip_prefix(EXTINF) {
                break (index, info);
            }
        };
        let line = index + 1;

        let title = match info.split_once(',') {
            Some((_, title)) if !title.trim().is_empty() => title.trim().to_string(),
            _ => return Some(Err(ParseError::MissingTitle { line })),
        };

        // Directives such as #EXTVLCOPT may sit between the info line and the URL.
        while let Some(&(_, raw)) = self.lines.peek() {
            let candidate = raw.trim();
            if candidate.starts_with(EXTINF) {
                break;
            }
            if candidate.is_empty() || candidate.starts_with('#') {
                self.lines.next();
                continue;
            }
            let url = candidate.to_string();
            self.lines.next();
            return Some(Ok(PlaylistEntry { title, url }));
        }

        Some(Err(ParseError::MissingUrl { line }))
    }
}

/// Playlist handed back to clients, one entry per started stream.
#[derive(Debug, Default, Clone)]
pub struct OutputPlaylist {
    entries: Vec<PlaylistEntry>,
}

impl OutputPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, title: String, url: String) {
        self.entries.push(PlaylistEntry { title, url });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&format!("{}-1,{}\n{}\n", EXTINF, entry.title, entry.url));
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
