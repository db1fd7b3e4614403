//! Frequency-weighted keyword extraction
//!
//! Candidate terms are the words of the visible text (two or more letters or
//! digits, not a stop word, not purely numeric) and the bigrams formed by
//! consecutive candidate words. A bigram counts as two words of evidence, so a
//! repeated phrase outranks its parts when it occurs as often as they do.

use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "else",
    "etc", "ever", "every", "few", "for", "from", "further", "get", "got", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "let", "like", "may", "me",
    "might", "more", "most", "much", "must", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "one", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "per", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Splits text into lower-case candidate words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(|token| token.to_lowercase())
        .filter(|token| !is_stop_word(token) && !token.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

struct Term {
    score: usize,
    first_seen: usize,
}

/// Returns up to `limit` terms ordered by score, ties broken by first occurrence
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let words = tokenize(text);
    let mut terms: HashMap<String, Term> = HashMap::new();
    let mut position = 0;

    let mut record = |term: String, weight: usize, terms: &mut HashMap<String, Term>| {
        let entry = terms.entry(term).or_insert(Term {
            score: 0,
            first_seen: position,
        });
        entry.score += weight;
        position += 1;
    };

    for (index, word) in words.iter().enumerate() {
        record(word.clone(), 1, &mut terms);
        if let Some(next) = words.get(index + 1) {
            if next != word {
                record(format!("{} {}", word, next), 2, &mut terms);
            }
        }
    }

    // A bigram seen once is noise, not a phrase
    terms.retain(|term, stats| !term.contains(' ') || stats.score > 2);

    let mut ranked: Vec<(String, Term)> = terms.into_iter().collect();
    ranked.sort_by(|(_, a), (_, b)| {
        b.score
            .cmp(&a.score)
            .then(a.first_seen.cmp(&b.first_seen))
    });

    ranked
        .into_iter()
        .map(|(term, _)| term)
        .filter(|term| !term.is_empty())
        .take(limit)
        .collect()
}
