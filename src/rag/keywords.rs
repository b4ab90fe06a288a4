//! Lexical expansion of a product into search keywords

use std::collections::BTreeSet;

use tracing::debug;
use tracing::warn;

use crate::llm::PulsePrompts;
use crate::llm::TextGenerator;

/// Category synonyms, matched case-insensitively on the whole category
const CATEGORY_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "phone",
        &["mobile", "smartphone", "cellphone", "handset", "android phone", "ios phone"],
    ),
    ("mobile", &["phone", "smartphone", "cellphone"]),
    ("smartphone", &["phone", "mobile", "cellphone"]),
    ("laptop", &["notebook", "macbook", "ultrabook", "pc laptop"]),
    ("notebook", &["laptop", "macbook"]),
    ("macbook", &["laptop", "notebook"]),
    ("earbuds", &["earphones", "earpods", "headphones", "ear buds"]),
    ("headphones", &["earbuds", "earphones", "headset"]),
    (
        "camera",
        &["dslr", "mirrorless", "cam", "action cam", "action camera"],
    ),
];

/// Lowercased name tokens split on whitespace and hyphens, single
/// characters dropped
pub fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|token| token.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Static synonyms for a category; empty when the category is unknown
pub fn category_synonyms(category: &str) -> &'static [&'static str] {
    let category = category.trim().to_lowercase();
    CATEGORY_SYNONYMS
        .iter()
        .find(|(key, _)| *key == category)
        .map(|(_, synonyms)| *synonyms)
        .unwrap_or_default()
}

/// Split a comma-separated model response into lowercase phrases
pub fn parse_keyword_list(response: &str) -> Vec<String> {
    response
        .to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ask the model for forum slang and variants. Any failure contributes
/// nothing.
pub async fn llm_keywords(
    llm: &dyn TextGenerator,
    name: &str,
    category: &str,
    description: &str,
) -> Vec<String> {
    let prompt = PulsePrompts::keyword_variants().render_with(&[
        ("name", name),
        ("category", category),
        ("description", description),
    ]);

    match llm.generate(&prompt).await {
        Ok(response) => parse_keyword_list(&response),
        Err(e) => {
            warn!("Keyword generation failed for {}: {}", name, e);
            Vec::new()
        }
    }
}

/// Union of name tokens, category, category synonyms, model-suggested
/// variants and the full lowercased name
pub async fn expand_keywords(
    llm: &dyn TextGenerator,
    name: &str,
    category: &str,
    description: &str,
) -> BTreeSet<String> {
    let mut keywords: BTreeSet<String> = name_tokens(name).into_iter().collect();

    // Category and full name go in lowercased verbatim; blank ones would match every title
    if !category.trim().is_empty() {
        keywords.insert(category.to_lowercase());
    }
    keywords.extend(category_synonyms(category).iter().map(|s| (*s).to_string()));
    keywords.extend(llm_keywords(llm, name, category, description).await);

    if !name.trim().is_empty() {
        keywords.insert(name.to_lowercase());
    }

    debug!("Expanded {} into {} keywords", name, keywords.len());
    keywords
}
