//! Command-shell parsing and dispatch

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::model::{format_seconds, PlaybackState, Track};
use super::AppController;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Play(Track),
    Favorite(Track),
    Favorites,
    ClearFavorites,
    History,
    NewPlaylist(String),
    Playlists,
    Show(i64),
    Add(i64, Track),
    Remove(i64, String),
    Delete(i64),
    PlayPlaylist(i64),
    Next,
    Previous,
    TogglePause,
    Seek(f64),
    Close,
    Status,
    Search(String),
    Sync,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "play" => Command::Play(parse_track(rest)?),
            "fav" => Command::Favorite(parse_track(rest)?),
            "favs" => Command::Favorites,
            "clearfavs" => Command::ClearFavorites,
            "history" => Command::History,
            "new" => Command::NewPlaylist(rest.to_string()),
            "lists" => Command::Playlists,
            "show" => Command::Show(parse_playlist_id(rest)?),
            "add" => {
                let (id, track) = split_first(rest).context("usage: add <playlist> <id> <title>")?;
                Command::Add(parse_playlist_id(id)?, parse_track(track)?)
            }
            "rm" => {
                let (id, track_id) = split_first(rest).context("usage: rm <playlist> <id>")?;
                if track_id.is_empty() {
                    bail!("usage: rm <playlist> <id>");
                }
                Command::Remove(parse_playlist_id(id)?, track_id.to_string())
            }
            "del" => Command::Delete(parse_playlist_id(rest)?),
            "playlist" => Command::PlayPlaylist(parse_playlist_id(rest)?),
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Previous,
            "pause" | "toggle" => Command::TogglePause,
            "seek" => {
                let seconds: f64 = rest
                    .parse()
                    .with_context(|| format!("invalid seek position '{}'", rest))?;
                Command::Seek(seconds)
            }
            "close" | "stop" => Command::Close,
            "status" => Command::Status,
            "search" => Command::Search(rest.to_string()),
            "sync" => Command::Sync,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{}'", other),
        };
        Ok(command)
    }
}

fn split_first(input: &str) -> Option<(&str, &str)> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Some(match input.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (input, ""),
    })
}

/// `<id> [title...]`; the title defaults to the id.
fn parse_track(input: &str) -> Result<Track> {
    let (id, title) = split_first(input).ok_or_else(|| anyhow!("missing track id"))?;
    let title = if title.is_empty() { id } else { title };
    Ok(Track::new(id, title))
}

fn parse_playlist_id(input: &str) -> Result<i64> {
    input
        .trim()
        .parse()
        .with_context(|| format!("invalid playlist id '{}'", input.trim()))
}

const HELP: &str = "\
play <id> <title>        play a single track
fav <id> <title>         toggle a favorite
favs | history           list favorites or play history
clearfavs                remove every favorite
new <name> | lists       create or list playlists
show <playlist>          show a playlist
add <playlist> <id> <title> | rm <playlist> <id> | del <playlist>
playlist <playlist>      play a playlist from the start
next | prev | pause | seek <secs> | close | status
search <query> | sync | quit";

impl AppController {
    /// Parse and run one shell line. Failures already surface as notices, so the
    /// returned text only carries listings and parse errors.
    pub async fn handle_command(&self, line: &str) -> String {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return format!("{:#}", e),
        };
        tracing::debug!(?command, "Handling command");

        match command {
            Command::Play(track) => {
                let _ = self.play_track(track).await;
                String::new()
            }
            Command::Favorite(track) => {
                let _ = self.toggle_favorite(track).await;
                String::new()
            }
            Command::Favorites => match self.list_favorites().await {
                Ok(entries) if entries.is_empty() => "No favorites yet.".to_string(),
                Ok(entries) => entries
                    .iter()
                    .map(|e| format!("{}  {}", e.track.id, e.track.title))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(_) => String::new(),
            },
            Command::ClearFavorites => {
                let _ = self.clear_favorites().await;
                String::new()
            }
            Command::History => match self.list_history().await {
                Ok(entries) if entries.is_empty() => "History is empty.".to_string(),
                Ok(entries) => entries
                    .iter()
                    .map(|e| {
                        format!(
                            "{}  {}  {}",
                            e.played_at.format("%Y-%m-%d %H:%M"),
                            e.track.id,
                            e.track.title
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(_) => String::new(),
            },
            Command::NewPlaylist(name) => match self.create_playlist(&name).await {
                Ok(playlist) => format!("#{}", playlist.id),
                Err(_) => String::new(),
            },
            Command::Playlists => match self.list_playlists().await {
                Ok(playlists) if playlists.is_empty() => "No playlists.".to_string(),
                Ok(playlists) => playlists
                    .iter()
                    .map(|p| format!("#{}  {} ({} videos)", p.id, p.name, p.video_count))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(_) => String::new(),
            },
            Command::Show(id) => match self.view_playlist(id).await {
                Ok(playlist) => {
                    let mut lines = vec![format!("#{}  {}", playlist.id, playlist.name)];
                    lines.extend(
                        playlist
                            .videos
                            .iter()
                            .enumerate()
                            .map(|(i, t)| format!("{:>3}. {}  {}", i + 1, t.id, t.title)),
                    );
                    lines.join("\n")
                }
                Err(_) => String::new(),
            },
            Command::Add(id, track) => {
                let _ = self.add_video_to_playlist(id, track).await;
                String::new()
            }
            Command::Remove(id, track_id) => {
                let _ = self.remove_video_from_playlist(id, &track_id).await;
                String::new()
            }
            Command::Delete(id) => {
                let _ = self.delete_playlist(id).await;
                String::new()
            }
            Command::PlayPlaylist(id) => {
                let _ = self.play_playlist(id).await;
                String::new()
            }
            Command::Next => {
                let _ = self.next().await;
                String::new()
            }
            Command::Previous => {
                let _ = self.previous().await;
                String::new()
            }
            Command::TogglePause => {
                let _ = self.toggle_playback().await;
                String::new()
            }
            Command::Seek(seconds) => {
                let _ = self.seek(seconds).await;
                format_seconds(seconds)
            }
            Command::Close => {
                self.close().await;
                String::new()
            }
            Command::Status => self.status_line().await,
            Command::Search(query) => match self.search(&query).await {
                Ok(_) => {
                    let model = self.model.lock().await;
                    model
                        .search_results()
                        .iter()
                        .map(|r| {
                            let star = if r.favorite { "*" } else { " " };
                            format!("{} {}  {}", star, r.track.id, r.track.title)
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
                Err(_) => String::new(),
            },
            Command::Sync => {
                // Completion is reported through a notice
                let _ = self.sync_library().await;
                String::new()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => {
                let mut model = self.model.lock().await;
                model.set_should_quit(true);
                String::new()
            }
        }
    }

    async fn status_line(&self) -> String {
        let info = self.playback_info().await;
        let Some(track) = info.track.as_ref() else {
            return "Idle".to_string();
        };

        let marker = if info.is_playing { ">" } else { "||" };
        let mut status = format!("{} {}  [{}]", marker, track.title, info.progress_label());
        if info.state == PlaybackState::PlayingInPlaylist {
            if let (Some(id), Some(index)) = (info.playlist_id, info.playlist_index) {
                status.push_str(&format!("  playlist #{} {}/{}", id, index + 1, info.playlist_len));
            }
        }
        status
    }
}
