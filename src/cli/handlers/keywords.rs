//! Keyword expansion preview

use crate::cli::commands::ProductArgs;
use crate::cli::output::print_keywords;
use crate::llm::LlmService;
use crate::rag::expand_keywords;
use crate::AppConfig;
use crate::Result;

pub async fn handle_keywords(config: &AppConfig, product: &ProductArgs) -> Result<()> {
    let llm = LlmService::new(config)?.without_system_instruction();
    let keywords =
        expand_keywords(&llm, &product.name, &product.category, &product.description).await;
    print_keywords(&product.name, &keywords);
    Ok(())
}
