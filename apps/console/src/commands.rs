//! Line commands read from stdin.

use std::sync::Arc;

use backdrop_core::{ErrorCode, SessionManager};

use crate::reflector::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tracks,
    Select(String),
    Toggle,
    Stop,
    Volume(i64),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("tracks" | "ls", _) => Self::Tracks,
            ("select" | "play", Some(id)) => Self::Select(id.to_string()),
            ("select" | "play", None) => return Err("usage: select <track-id>".into()),
            ("toggle" | "t", _) => Self::Toggle,
            ("stop", _) => Self::Stop,
            ("volume" | "vol", Some(value)) => Self::Volume(
                value
                    .parse()
                    .map_err(|_| format!("not a number: {value}"))?,
            ),
            ("volume" | "vol", None) => return Err("usage: volume <0-100>".into()),
            ("status" | "s", _) => Self::Status,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            (other, _) => return Err(format!("unknown command: {other} (try `help`)")),
        };
        Ok(Some(command))
    }
}

/// Whether the command loop should keep going.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn execute(manager: &Arc<SessionManager>, command: Command) -> Flow {
    match command {
        Command::Tracks => {
            let current = manager.state().current_track_id().map(str::to_string);
            for track in manager.catalog().tracks() {
                let marker = if current.as_deref() == Some(track.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {:<16} {}", track.id, track.label());
            }
        }
        Command::Select(id) => {
            if let Err(e) = manager.select_track_by_id(&id).await {
                println!("! {} ({})", e, e.code());
            }
        }
        Command::Toggle => match manager.toggle_playback().await {
            Ok(playing) => println!("intent: {}", if playing { "play" } else { "pause" }),
            Err(e) => println!("! {}", e.notice()),
        },
        Command::Stop => manager.stop().await,
        Command::Volume(value) => {
            let volume = manager.set_volume(value).await;
            println!("volume: {volume}");
        }
        Command::Status => {
            let view = manager.view();
            println!("{}", render(&view));
            println!(
                "phase: {:?}, intent: {}, api ready: {}",
                view.phase,
                if view.intent_playing { "play" } else { "pause" },
                view.player_ready
            );
        }
        Command::Help => {
            println!("commands: tracks | select <id> | toggle | stop | volume <n> | status | quit");
        }
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}
