//! RAG (Retrieval-Augmented Generation) handlers

use crate::cli::commands::ProductArgs;
use crate::cli::output::print_info;
use crate::cli::output::print_rag_answer;
use crate::cli::output::print_warning;
use crate::rag::RagService;
use crate::AppConfig;
use crate::Result;

pub async fn handle_ask(
    config: &AppConfig,
    product: &ProductArgs,
    question: &str,
    direct: bool,
    json: bool,
    show_context: bool,
) -> Result<()> {
    let service = RagService::new(config)?;
    let product = product.ready_product();

    if !json {
        let mode = if direct { "direct" } else { "multi-query" };
        print_info(&format!("🤖 Asking about {} ({mode}): \"{question}\"", product.name));
    }

    let answer = if direct {
        service.answer_direct(&product, question).await?
    } else {
        service.answer(&product, question).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    if answer.sources.is_empty() {
        print_warning(&format!(
            "No indexed posts found for {}. Run: pulserag ingest --name \"{}\"",
            product.name, product.name
        ));
    }
    print_rag_answer(&answer, show_context);
    Ok(())
}
