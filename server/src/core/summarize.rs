//! Keyword summaries of transcript or scene text.

use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "is", "was",
    "it", "this", "that", "i", "you", "we", "they", "he", "she",
];

/// Only the most frequent words are considered before filtering.
const CANDIDATES: usize = 10;
const TOPICS: usize = 5;

pub const NO_TOPICS: &str = "No key topics found.";

/// Summarizes `text` as its most frequent meaningful words.
///
/// Empty text yields an empty summary.
pub fn summarize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let topics: Vec<String> = word_frequencies(&text.to_lowercase())
        .into_iter()
        .take(CANDIDATES)
        .map(|(word, _)| word)
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
        .take(TOPICS)
        .collect();

    if topics.is_empty() {
        NO_TOPICS.to_string()
    } else {
        format!("Key topics: {}", topics.join(", "))
    }
}

/// Word counts, most frequent first; ties keep first-occurrence order.
fn word_frequencies(text: &str) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for word in words(text) {
        match index.get(word) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(word, order.len());
                order.push((word.to_string(), 1));
            }
        }
    }

    // sort_by is stable
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(summarize_text(""), "");
        assert_eq!(summarize_text("   "), "");
    }

    #[test]
    fn test_top_topics_by_frequency() {
        let text = "Neural networks learn. Networks need data, data and more data. \
                    The network trains on data.";
        let summary = summarize_text(text);
        assert_eq!(summary, "Key topics: data, networks, neural, learn, need");
    }

    #[test]
    fn test_stop_words_and_short_words_dropped() {
        assert_eq!(summarize_text("the a of to it is we go ok"), NO_TOPICS);
    }

    #[test]
    fn test_case_folded() {
        assert_eq!(summarize_text("Pasta PASTA pasta sauce"), "Key topics: pasta, sauce");
    }

    #[test]
    fn test_frequencies_keep_first_occurrence_on_ties() {
        let counts = word_frequencies("beta alpha beta gamma alpha");
        let words: Vec<&str> = counts.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["beta", "alpha", "gamma"]);
    }
}
