//! Prompt templates for query transformation, keyword expansion and
//! competitor extraction

use std::collections::HashMap;

/// Template with `{{name}}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let variables = extract_variables(&template);
        Self {
            template,
            variables,
        }
    }

    /// Fill in the template in a single pass over the template text.
    ///
    /// Placeholders without a value are left as-is. Substituted values are
    /// copied verbatim, so a value that itself contains `{{name}}` is never
    /// expanded a second time.
    #[must_use]
    pub fn render(&self, values: &HashMap<&str, &str>) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                result.push_str(&rest[start..]);
                return result;
            };
            match values.get(&after[..end]) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render from `(name, value)` pairs
    #[must_use]
    pub fn render_with(&self, pairs: &[(&str, &str)]) -> String {
        let values: HashMap<&str, &str> = pairs.iter().copied().collect();
        self.render(&values)
    }

    /// Placeholder names in order of first appearance
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

fn extract_variables(template: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'{') {
            chars.next(); // skip second '{'
            let mut var_name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == '}' {
                    chars.next();
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        break;
                    }
                } else {
                    var_name.push(ch);
                    chars.next();
                }
            }
            if !var_name.is_empty() && !variables.contains(&var_name) {
                variables.push(var_name);
            }
        }
    }

    variables
}

/// Prompts used by the pipeline
pub struct PulsePrompts;

impl PulsePrompts {
    /// Rewrite a raw question into one search-style line
    #[must_use]
    pub fn standalone_query() -> PromptTemplate {
        PromptTemplate::new(
            r#"You are given a user question and a product name. Convert the question into a concise standalone search-style query referencing the product.

User question: "{{question}}"
Product name: "{{product}}"

Return only the standalone query in 1 line."#,
        )
    }

    /// Decompose a standalone query into focused sub-queries
    #[must_use]
    pub fn sub_queries() -> PromptTemplate {
        PromptTemplate::new(
            r#"Take the standalone query: "{{query}}" and generate {{count}} focused sub-queries that cover different aspects of the main question. Return them as a numbered list, one per line."#,
        )
    }

    /// Answer-shaped text to embed in place of the sub-query
    #[must_use]
    pub fn hypothetical_answer() -> PromptTemplate {
        PromptTemplate::new(
            r#"Produce a short hypothetical answer for this sub-query that an expert might expect to find in relevant posts. Keep it concise (2-4 sentences).

Sub-query: "{{sub_query}}""#,
        )
    }

    /// Forum slang and variants for a product
    #[must_use]
    pub fn keyword_variants() -> PromptTemplate {
        PromptTemplate::new(
            r"You are an expert in e-commerce and online forums.
Given a product name, category, and description, generate a list of 5-6 alternate keywords, slang, short forms, abbreviations,
and variations that people commonly use on Reddit.

Return ONLY a comma-separated list of phrases.

Product Name: {{name}}
Category: {{category}}
Description: {{description}}",
        )
    }

    /// Structured good/bad points for a competing brand
    #[must_use]
    pub fn competitor_profile() -> PromptTemplate {
        PromptTemplate::new(
            r#"Brand: {{brand}}
Rating: {{rating}}
Reviews: {{reviews}}
Price: {{price}}
Snippet: {{snippet}}

Based on the following Reddit posts, please identify the good and bad points of the product:

Good points from posts:
{{good_posts}}

Bad points from posts:
{{bad_posts}}

Respond with a JSON object of the form {"name": string, "description": string, "good_points": [string], "bad_points": [string]} with at least two good points and two bad points."#,
        )
    }
}
