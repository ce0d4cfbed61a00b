use crate::domain::entities::Ticket;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const SUBJECT_WEIGHT: f64 = 40.0;
const CONTENT_WEIGHT: f64 = 10.0;
const SAME_CREATOR_POINTS: u32 = 20;
const SAME_PRIORITY_POINTS: u32 = 10;
const RECENCY_MAX_POINTS: i64 = 20;
const RECENCY_POINTS_PER_DAY: i64 = 2;

/// Bodies can be long and the matcher is super-linear; only this prefix is compared.
const MAX_COMPARE_CHARS: usize = 1000;

const MAX_KEYWORDS: usize = 3;
const MIN_KEYWORD_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "him", "his", "how", "its", "may", "new", "now", "see",
    "two", "who", "did", "get", "got", "let", "say", "she", "too", "use", "with", "this", "that",
    "from", "they", "will", "would", "there", "their", "what", "about", "which", "when", "your",
    "been", "were", "into", "than", "then", "them", "some", "could", "should", "does", "just",
    "also", "very", "only", "over", "after", "before", "please", "help", "issue", "problem",
    "question", "hello", "thanks", "thank", "regarding", "need", "cannot", "dont",
];

/// Advisory similarity between two tickets in `[0, 100]`.
///
/// Subject similarity is worth up to 40, same creator 20, same priority 10, creation
/// dates close together up to 20 (minus 2 per day apart) and body similarity up to 10
/// when both bodies are present.
pub fn similarity_score(a: &Ticket, b: &Ticket) -> u8 {
    let subject = weighted(text_similarity(&a.subject, &b.subject), SUBJECT_WEIGHT);

    let creator = if a.creator_id == b.creator_id {
        SAME_CREATOR_POINTS
    } else {
        0
    };

    let priority = if a.priority_id == b.priority_id {
        SAME_PRIORITY_POINTS
    } else {
        0
    };

    let days_apart = (a.created_at - b.created_at).num_days().abs();
    let recency = (RECENCY_MAX_POINTS - RECENCY_POINTS_PER_DAY * days_apart).clamp(0, RECENCY_MAX_POINTS)
        as u32;

    let content = if !a.body.trim().is_empty() && !b.body.trim().is_empty() {
        weighted(text_similarity(&a.body, &b.body), CONTENT_WEIGHT)
    } else {
        0
    };

    (subject + creator + priority + recency + content).min(100) as u8
}

fn weighted(ratio: f64, weight: f64) -> u32 {
    (ratio.clamp(0.0, 1.0) * weight).round() as u32
}

/// Character-level similarity ratio in `[0, 1]`, case-insensitive.
///
/// Counts characters matched by repeatedly taking the longest common substring and
/// recursing on both sides of it, then returns `2 * matched / (len(a) + len(b))`.
/// When several common substrings share the maximum length the first one found in
/// `a` wins, which makes the ratio directional for some inputs.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().take(MAX_COMPARE_CHARS).collect();
    let b: Vec<char> = b.to_lowercase().chars().take(MAX_COMPARE_CHARS).collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    (2 * matched_chars(&a, &b)) as f64 / (a.len() + b.len()) as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (pos_a, pos_b, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }

    len + matched_chars(&a[..pos_a], &b[..pos_b])
        + matched_chars(&a[pos_a + len..], &b[pos_b + len..])
}

fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    // Rolling row of common-suffix lengths.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = (0, 0, 0);

    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            if curr[j + 1] > best.2 {
                best = (i + 1 - curr[j + 1], j + 1 - curr[j + 1], curr[j + 1]);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

/// Up to three distinctive words of a subject, longest first.
pub fn extract_keywords(subject: &str) -> Vec<String> {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = WORD_REGEX.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("Invalid word regex"));

    let lowered = subject.to_lowercase();
    let mut seen = HashSet::new();
    let mut words: Vec<String> = re
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect();

    // Stable: equal lengths keep their order of appearance.
    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    words.truncate(MAX_KEYWORDS);
    words
}
