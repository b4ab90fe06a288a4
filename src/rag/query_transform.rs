//! Query transformation: standalone rewrite, sub-query decomposition and
//! hypothetical answers
//!
//! Each step is one round trip to the text generator. Failures propagate;
//! only a short sub-query list is repaired locally (by padding).

use futures::future::try_join_all;
use tracing::debug;
use tracing::info;

use crate::errors::Result;
use crate::llm::PulsePrompts;
use crate::llm::TextGenerator;
use crate::models::QueryPlan;

/// Rewrite `question` into one search-style line mentioning the product.
/// The response is trimmed and otherwise accepted as-is.
pub async fn standalone_query(
    llm: &dyn TextGenerator,
    question: &str,
    product_name: &str,
) -> Result<String> {
    let prompt = PulsePrompts::standalone_query()
        .render_with(&[("question", question), ("product", product_name)]);
    let standalone = llm.generate(&prompt).await?.trim().to_string();
    debug!("Standalone query: {}", standalone);
    Ok(standalone)
}

/// Remove a leading enumeration marker (`1.`, `2)`, `3 -`) or bullet
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let without_number = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if without_number.len() < line.len() {
        without_number.trim_start_matches(|c: char| matches!(c, ')' | '.' | '-' | ':') || c.is_whitespace())
    } else {
        line.strip_prefix(&['-', '*', '•'][..]).unwrap_or(line)
    };
    rest.trim()
}

/// Parse a numbered or bulleted list into exactly `count` sub-queries.
///
/// Blank lines are dropped, extra lines ignored, and a short list is padded
/// with `"<standalone> (follow-up k)"` where `k` is the 1-based slot.
pub fn parse_sub_queries(response: &str, standalone: &str, count: usize) -> Vec<String> {
    let mut sub_queries: Vec<String> = response
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(count)
        .map(str::to_string)
        .collect();

    while sub_queries.len() < count {
        let slot = sub_queries.len() + 1;
        sub_queries.push(format!("{standalone} (follow-up {slot})"));
    }
    sub_queries
}

/// Decompose the standalone query into exactly `count` focused sub-queries
pub async fn sub_queries(
    llm: &dyn TextGenerator,
    standalone: &str,
    count: usize,
) -> Result<Vec<String>> {
    let count_text = count.to_string();
    let prompt =
        PulsePrompts::sub_queries().render_with(&[("query", standalone), ("count", count_text.as_str())]);
    let response = llm.generate(&prompt).await?;
    let parsed = parse_sub_queries(&response, standalone, count);
    debug!("Sub-queries: {:?}", parsed);
    Ok(parsed)
}

/// Short plausible answer to embed in place of the sub-query
pub async fn hypothetical_answer(llm: &dyn TextGenerator, sub_query: &str) -> Result<String> {
    let prompt = PulsePrompts::hypothetical_answer().render_with(&[("sub_query", sub_query)]);
    let answer = llm.generate(&prompt).await?.trim().to_string();
    debug!("Hypothetical answer for {:?}: {}", sub_query, answer);
    Ok(answer)
}

/// Run the three transformation steps. Hypothetical answers are generated
/// concurrently and returned in sub-query order.
pub async fn plan(
    llm: &dyn TextGenerator,
    question: &str,
    product_name: &str,
    sub_query_count: usize,
) -> Result<QueryPlan> {
    let standalone = standalone_query(llm, question, product_name).await?;
    let subs = sub_queries(llm, &standalone, sub_query_count).await?;
    let hypothetical_answers =
        try_join_all(subs.iter().map(|sq| hypothetical_answer(llm, sq))).await?;

    info!(
        "Query plan ready: {} sub-queries for {:?}",
        subs.len(),
        standalone
    );
    Ok(QueryPlan {
        standalone_query: standalone,
        sub_queries: subs,
        hypothetical_answers,
    })
}
