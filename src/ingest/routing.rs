//! Routing policy: decide whether extracted content becomes a draft or
//! an auto-created task.
//!
//! Calendar-style events are time-sensitive and low-risk to auto-accept,
//! so they bypass review. Everything else carries enough classification
//! uncertainty to warrant a pending draft.

use regex::Regex;

/// Detects event-like content from raw and extracted text.
#[derive(Clone)]
pub struct EventRouter {
    keyword_re: Regex,
    video_link_re: Regex,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    /// Build the router.
    #[must_use]
    pub fn new() -> Self {
        // Keywords match as whole words (plural allowed), so "prevent"
        // or "uninvited" never route around review.
        #[allow(clippy::unwrap_used)] // Compile-checked literal pattern.
        let keyword_re = Regex::new(r"(?i)\b(invite|meeting|calendar|event)s?\b").unwrap();
        #[allow(clippy::unwrap_used)] // Compile-checked literal pattern.
        let video_link_re =
            Regex::new(r"(?i)(zoom\.us/|meet\.google\.com/|teams\.microsoft\.com/)").unwrap();
        Self {
            keyword_re,
            video_link_re,
        }
    }

    /// Whether the item should be auto-created as a `meeting` task.
    ///
    /// Matches on an event keyword in either the raw text or the
    /// extracted title, or a recognized video-call link in the raw text.
    #[must_use]
    pub fn is_event_like(&self, raw_text: &str, extracted_title: &str) -> bool {
        self.keyword_re.is_match(raw_text)
            || self.keyword_re.is_match(extracted_title)
            || self.video_link_re.is_match(raw_text)
    }
}
