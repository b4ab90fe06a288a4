//! Text preprocessing utilities for embedding generation
//!
//! Provides utilities for cleaning, normalizing, and bounding text before embedding generation.

use tracing::debug;

/// Function words dropped by [`enhanced_preprocess`]
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with", "you", "your", "all", "each", "every", "both",
    "few", "more", "most", "other", "some", "has", "have", "had", "do", "does", "did", "would",
    "could", "should",
];

/// Forum shorthand expanded before stopword removal
const SLANG: &[(&str, &str)] = &[
    ("afaik", "as far as i know"),
    ("asap", "as soon as possible"),
    ("atm", "at the moment"),
    ("bc", "because"),
    ("btw", "by the way"),
    ("cuz", "because"),
    ("diy", "do it yourself"),
    ("fwiw", "for what it's worth"),
    ("fyi", "for your information"),
    ("gr8", "great"),
    ("idk", "i don't know"),
    ("imo", "in my opinion"),
    ("imho", "in my humble opinion"),
    ("irl", "in real life"),
    ("lmk", "let me know"),
    ("nvm", "never mind"),
    ("op", "original poster"),
    ("pls", "please"),
    ("plz", "please"),
    ("prolly", "probably"),
    ("rly", "really"),
    ("smh", "shaking my head"),
    ("srsly", "seriously"),
    ("tbf", "to be fair"),
    ("tbh", "to be honest"),
    ("thx", "thanks"),
    ("tho", "though"),
    ("tldr", "too long didnt read"),
    ("ty", "thank you"),
    ("u", "you"),
    ("ur", "your"),
    ("wfh", "work from home"),
    ("ya", "yeah"),
];

/// Longest prefix of `text` that fits in `max_bytes` without splitting a
/// UTF-8 sequence
pub fn truncate_to_byte_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Aggressive normalisation applied to scraped posts before indexing.
///
/// Lowercases, drops URLs and HTML tags, expands common forum shorthand,
/// removes stopwords and punctuation, collapses whitespace and finally caps
/// the result at `max_bytes`.
pub fn enhanced_preprocess(text: &str, max_bytes: usize) -> String {
    let lowered = text.to_lowercase();
    let without_tags = strip_html_tags(&lowered);

    let mut words: Vec<String> = Vec::new();
    for token in without_tags.split_whitespace() {
        let token = strip_url(token);
        if token.is_empty() {
            continue;
        }

        let core = token.trim_matches(|c: char| !c.is_alphanumeric());
        if let Some((_, expansion)) = SLANG.iter().find(|(short, _)| *short == core) {
            words.extend(expansion.split_whitespace().map(str::to_string));
            continue;
        }
        words.push(token.to_string());
    }

    let kept: Vec<String> = words
        .into_iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect();

    let cleaned = kept.join(" ");
    let capped = truncate_to_byte_boundary(&cleaned, max_bytes);
    debug!("Preprocessed post text: {} -> {} bytes", text.len(), capped.len());
    capped.to_string()
}

/// Everything before the first `http://` or `https://` in a token
fn strip_url(token: &str) -> &str {
    let cut = [token.find("http://"), token.find("https://")]
        .into_iter()
        .flatten()
        .min();
    match cut {
        Some(at) => &token[..at],
        None => token,
    }
}

/// Remove `<...>` spans; an unclosed `<` keeps the rest of the text
fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                // Tags separate words
                out.push(' ');
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
