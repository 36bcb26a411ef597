//! Prompt augmentation from retrieved memory.

use crate::document::{Document, DocumentType};

/// Prepend a context block listing the retrieved documents, grouped by
/// type. The base prompt follows the block and remains the authoritative
/// instruction.
pub fn augment_prompt(base_prompt: &str, documents: &[Document]) -> String {
    if documents.is_empty() {
        return base_prompt.to_string();
    }

    let mut block = String::from("Relevant context from memory:\n");
    for (title, doc_type) in [
        ("Account", DocumentType::Account),
        ("Transactions", DocumentType::Transaction),
        ("Conversation", DocumentType::Conversation),
        ("Policies", DocumentType::Policy),
        ("FAQs", DocumentType::Faq),
    ] {
        let group: Vec<&Document> = documents
            .iter()
            .filter(|doc| doc.doc_type == doc_type)
            .collect();
        if group.is_empty() {
            continue;
        }
        block.push_str(&format!("\n[{title}]\n"));
        for doc in group {
            block.push_str(&format!(
                "- ({:.2}) {}\n",
                doc.relevance,
                doc.content.trim()
            ));
        }
    }

    format!("{block}\n{base_prompt}")
}
