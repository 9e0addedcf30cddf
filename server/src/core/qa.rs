//! Keyword Q&A over a stored transcript.

use std::collections::BTreeSet;

use crate::core::analysis::TranscriptData;

pub const NO_TRANSCRIPT: &str = "No transcript available. Please transcribe the video first.";
pub const NOT_FOUND: &str = "I couldn't find specific information about that in the video.";

/// Filler words ignored when looking for the subject of a "when" question
const WHEN_STOP_WORDS: &[&str] = &[
    "when", "does", "happen", "the", "video", "in", "show", "say", "is", "it",
];

/// Answers `query` from the transcript with simple keyword heuristics.
pub fn ask_question(query: &str, transcript: Option<&TranscriptData>) -> String {
    let Some(transcript) = transcript else {
        return NO_TRANSCRIPT.to_string();
    };

    let query = query.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();

    if query.contains("about") || query.contains("summar") {
        let preview: String = transcript.text.to_lowercase().chars().take(200).collect();
        return format!("This video discusses: {}...", preview);
    }

    if query.contains("when") {
        let keywords: Vec<&str> = words
            .iter()
            .copied()
            .filter(|w| !WHEN_STOP_WORDS.contains(w))
            .collect();

        // Whole seconds, deduplicated and sorted
        let times: BTreeSet<u64> = transcript
            .segments
            .iter()
            .filter(|s| {
                let text = s.text.to_lowercase();
                keywords.iter().any(|kw| text.contains(kw))
            })
            .map(|s| s.start.max(0.0) as u64)
            .collect();

        if !times.is_empty() {
            let listed: Vec<String> = times.into_iter().take(3).map(format_clock).collect();
            return format!("Found mentions around: {}.", listed.join(", "));
        }
    }

    let significant: Vec<&str> = words.iter().copied().filter(|w| w.chars().count() > 3).collect();
    for segment in &transcript.segments {
        let text = segment.text.to_lowercase();
        if significant.iter().any(|w| text.contains(w)) {
            return format!(
                "Found at {}s: \"{}\"",
                segment.start.max(0.0) as u64,
                segment.text
            );
        }
    }

    NOT_FOUND.to_string()
}

/// Formats whole seconds as `H:MM:SS`
pub fn format_clock(seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
