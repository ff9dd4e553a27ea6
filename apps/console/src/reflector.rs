//! Status line printed to stdout whenever the session view changes.

use std::io::Write;

use backdrop_core::{ReflectError, Reflector, SessionView};
use parking_lot::Mutex;

/// Renders the view as a single line, e.g. `⏸️ 🔥 Fire Relaxing [vol 50]`.
pub fn render(view: &SessionView) -> String {
    format!("{} {} [vol {}]", view.play_glyph(), view.headline(), view.volume)
}

/// Prints the status line, skipping repeats of the last one.
#[derive(Default)]
pub struct ConsoleReflector {
    last: Mutex<Option<String>>,
}

impl ConsoleReflector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the line to print, or `None` if it matches the last one.
    fn next_line(&self, view: &SessionView) -> Option<String> {
        let line = render(view);
        let mut last = self.last.lock();
        if last.as_deref() == Some(line.as_str()) {
            return None;
        }
        *last = Some(line.clone());
        Some(line)
    }
}

impl Reflector for ConsoleReflector {
    fn name(&self) -> &str {
        "console"
    }

    fn reflect(&self, view: &SessionView) -> Result<(), ReflectError> {
        let Some(line) = self.next_line(view) else {
            return Ok(());
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "♪ {line}").map_err(|e| ReflectError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::{Catalog, SessionPhase};

    fn view(playing: bool, notice: Option<&str>) -> SessionView {
        SessionView {
            track: Catalog::builtin().find("fire-relaxing").cloned(),
            intent_playing: playing,
            playing,
            volume: 50,
            phase: SessionPhase::ReadyPlaying,
            notice: notice.map(str::to_string),
            player_ready: true,
        }
    }

    #[test]
    fn renders_glyph_headline_and_volume() {
        assert_eq!(render(&view(true, None)), "⏸️ 🔥 Fire Relaxing [vol 50]");
        assert_eq!(
            render(&view(false, Some("Invalid video URL"))),
            "▶️ ⚠️ Invalid video URL [vol 50]"
        );
    }

    #[test]
    fn repeated_view_is_printed_once() {
        let reflector = ConsoleReflector::new();
        assert!(reflector.next_line(&view(true, None)).is_some());
        assert!(reflector.next_line(&view(true, None)).is_none());
        assert!(reflector.next_line(&view(false, None)).is_some());
    }
}
