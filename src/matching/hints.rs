//! Text hints for platform searches

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref BRACKETED: Regex =
        Regex::new(r"[\(\[\{][^\)\]\}]*[\)\]\}]").expect("Invalid bracket pattern");
    static ref PRODUCER_CREDIT: Regex =
        Regex::new(r"(?i)\b(?:prod\.|prod\s+by\b|produced\s+by\b)\s*\S.*$").expect("Invalid credit pattern");
    static ref TYPE_BEAT: Regex = Regex::new(r"(?i)\btype\s+beat\b").expect("Invalid type beat pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("Invalid whitespace pattern");
}

/// Title/artist known or guessed for the upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataHints {
    /// Track title
    pub title: Option<String>,
    /// Artist name
    pub artist: Option<String>,
}

impl MetadataHints {
    /// Hints from explicit values; blank strings count as missing
    pub fn new(title: Option<&str>, artist: Option<&str>) -> Self {
        Self {
            title: non_blank(title),
            artist: non_blank(artist),
        }
    }

    /// Guess artist and title from an upload filename
    ///
    /// Handles names like `Artist - Title (prod. X) [FREE].mp3`: directory
    /// and extension, bracketed qualifiers, producer credits, `type beat`
    /// and underscores are stripped, then `" - "` separates artist from
    /// title.
    ///
    /// # Example
    ///
    /// ```
    /// use beatscan::matching::hints::MetadataHints;
    ///
    /// let hints = MetadataHints::from_filename("uploads/Kay Moss - Night Drive (prod. Lo) [FREE].mp3");
    /// assert_eq!(hints.artist.as_deref(), Some("Kay Moss"));
    /// assert_eq!(hints.title.as_deref(), Some("Night Drive"));
    /// ```
    pub fn from_filename(filename: &str) -> Self {
        let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
        let stem = match base.rfind('.') {
            Some(dot) if dot > 0 => &base[..dot],
            _ => base,
        };

        let text = stem.replace('_', " ");
        let text = BRACKETED.replace_all(&text, " ");
        let text = TYPE_BEAT.replace_all(&text, " ");

        let mut parts = text.splitn(2, " - ");
        let first = parts.next().map(clean).unwrap_or_default();
        let second = parts.next().map(clean);

        let hints = match second {
            Some(title) => Self::new(Some(&title), Some(&first)),
            None => Self::new(Some(&first), None),
        };

        log::debug!("Filename hints for {:?}: {:?}", filename, hints);
        hints
    }

    /// True when neither field is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }

    /// Search query text: `"artist title"`, or whichever part is known
    pub fn query(&self) -> Option<String> {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Some(format!("{} {}", artist, title)),
            (None, Some(title)) => Some(title.clone()),
            (Some(artist), None) => Some(artist.clone()),
            (None, None) => None,
        }
    }
}

fn clean(part: &str) -> String {
    let without_credit = PRODUCER_CREDIT.replace(part, " ");
    WHITESPACE
        .replace_all(&without_credit, " ")
        .trim()
        .trim_matches(|c: char| c == '-' || c == '|')
        .trim()
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
