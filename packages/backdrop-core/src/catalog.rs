//! Track catalog and video id extraction.
//!
//! The catalog is static configuration: a small, fixed list of tracks known at
//! startup. Each track points at an embeddable video URL; the player is bound
//! by the video id extracted from that URL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::SOURCE_ID_MAX_LEN;

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Stable identifier, used as the persisted reference.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Embeddable video URL.
    pub source_url: String,
    /// Short glyph shown next to the name.
    pub icon: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_url: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_url: source_url.into(),
            icon: icon.into(),
        }
    }

    /// Resolves the video id for this track, if the URL is recognizable.
    pub fn source_id(&self) -> Option<SourceId> {
        SourceId::from_url(&self.source_url)
    }

    /// Label shown by observers: `<icon> <name>`.
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// Video identifier understood by the external player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceId(String);

/// URL fragments that directly precede a video id.
const ID_MARKERS: [&str; 3] = ["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/"];

/// Query parameter prefixes used by the fallback match.
const QUERY_MARKERS: [&str; 2] = ["?v=", "&v="];

impl SourceId {
    /// Extracts a video id from a watch, short or embed URL.
    ///
    /// Tries the well-known URL shapes first, then falls back to any `v=`
    /// query parameter. The id is truncated to 11 characters.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.is_empty() {
            return None;
        }

        let raw = first_capture(url, &ID_MARKERS, &['&', '\n', '?', '#'])
            .or_else(|| first_capture(url, &QUERY_MARKERS, &['&', '#']))?;

        let id: String = raw.chars().take(SOURCE_ID_MAX_LEN).collect();
        log::debug!("[Catalog] Extracted video id {} from {}", id, url);
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the non-empty run of characters after `marker`, stopping at any
/// of `terminators`.
/// Scans marker occurrences left to right and returns the first non-empty
/// run of characters after one, up to a terminator.
fn first_capture<'a>(url: &'a str, markers: &[&str], terminators: &[char]) -> Option<&'a str> {
    let mut hits: Vec<(usize, usize)> = markers
        .iter()
        .flat_map(|marker| url.match_indices(*marker).map(|(pos, m)| (pos, m.len())))
        .collect();
    // Stable: at equal positions the earlier marker wins.
    hits.sort_by_key(|(pos, _)| *pos);

    hits.into_iter().find_map(|(pos, len)| {
        let rest = &url[pos + len..];
        let end = rest.find(terminators).unwrap_or(rest.len());
        let captured = &rest[..end];
        (!captured.is_empty()).then_some(captured)
    })
}

/// Ordered, read-only list of tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// The ambient tracks shipped with the widget.
    pub fn builtin() -> Self {
        Self::new(vec![
            Track::new(
                "gentle-rain",
                "Gentle Rain",
                "https://www.youtube.com/watch?v=q76bMs-NwRk&pp=ygUKcmFpbiBhc21yIA%3D%3D",
                "🌧️",
            ),
            Track::new(
                "soothing-rain",
                "Soothing Rain",
                "https://www.youtube.com/watch?v=J4d-a7dVtiQ&pp=ygUKcmFpbiBhc21yIA%3D%3D",
                "🌧️",
            ),
            Track::new(
                "fire-relaxing",
                "Fire Relaxing",
                "https://www.youtube.com/watch?v=UgHKb_7884o&pp=ygUJZmlyZSBhc21y",
                "🔥",
            ),
            Track::new(
                "tranquil-fire",
                "Tranquil Fire",
                "https://www.youtube.com/watch?v=4ApMS8qYWo0&pp=ygUJZmlyZSBhc21y",
                "🔥",
            ),
        ])
    }

    pub fn find(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> Option<String> {
        SourceId::from_url(url).map(|s| s.as_str().to_string())
    }

    #[test]
    fn extracts_from_watch_url_with_extra_params() {
        assert_eq!(
            id("https://www.youtube.com/watch?v=q76bMs-NwRk&pp=ygUKcmFpbiBhc21yIA%3D%3D"),
            Some("q76bMs-NwRk".into())
        );
    }

    #[test]
    fn extracts_from_short_and_embed_urls() {
        assert_eq!(id("https://youtu.be/J4d-a7dVtiQ?t=10"), Some("J4d-a7dVtiQ".into()));
        assert_eq!(
            id("https://www.youtube.com/embed/UgHKb_7884o#frag"),
            Some("UgHKb_7884o".into())
        );
    }

    #[test]
    fn falls_back_to_v_query_parameter() {
        assert_eq!(
            id("https://m.example.com/player?list=abc&v=4ApMS8qYWo0&x=1"),
            Some("4ApMS8qYWo0".into())
        );
    }

    #[test]
    fn empty_v_parameter_is_skipped_for_a_later_one() {
        assert_eq!(
            id("https://m.example.com/player?v=&v=abcdefghijk"),
            Some("abcdefghijk".into())
        );
        assert_eq!(id("https://m.example.com/player?v=&list=x"), None);
    }

    #[test]
    fn leftmost_url_shape_wins() {
        assert_eq!(
            id("https://youtu.be/J4d-a7dVtiQ?next=https://www.youtube.com/watch?v=q76bMs-NwRk"),
            Some("J4d-a7dVtiQ".into())
        );
        assert_eq!(
            id("https://youtu.be/?src=https://www.youtube.com/embed/UgHKb_7884o"),
            Some("UgHKb_7884o".into())
        );
    }

    #[test]
    fn truncates_long_ids() {
        assert_eq!(id("https://youtu.be/ABCDEFGHIJKLMNOP"), Some("ABCDEFGHIJK".into()));
    }

    #[test]
    fn rejects_unrecognized_urls() {
        assert_eq!(id(""), None);
        assert_eq!(id("not a url"), None);
        assert_eq!(id("https://youtu.be/"), None);
        assert_eq!(id("https://example.com/watch?list=abc"), None);
    }

    #[test]
    fn builtin_catalog_resolves_every_track() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 4);
        for track in catalog.tracks() {
            assert!(track.source_id().is_some(), "{} should resolve", track.id);
        }
        assert_eq!(catalog.find("fire-relaxing").unwrap().name, "Fire Relaxing");
        assert!(catalog.find("missing").is_none());
    }

    #[test]
    fn label_joins_icon_and_name() {
        let track = Track::new("a", "Gentle Rain", "https://youtu.be/x", "🌧️");
        assert_eq!(track.label(), "🌧️ Gentle Rain");
    }
}
