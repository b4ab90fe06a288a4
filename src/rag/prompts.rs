//! Final answer prompt

/// Header, context and instructions for the grounded answer
pub fn build_answer_prompt(
    product_name: &str,
    product_description: &str,
    context: &str,
    question: &str,
) -> String {
    format!(
        "Product: {product_name}\nProduct description: {product_description}\n\n\
Context (posts about this product):\n\n\
{context}\
\nUser question: {question}\n\n\
Using ONLY the context above, produce a thorough and actionable answer to the user's question. \
Cite sources inline (give the Source URL next to the point you extract). \
Keep the answer factual and avoid inventing claims not found in the posts."
    )
}
