//! Prompt assembly.
//!
//! Packs ranked passages into a bounded context block and wraps it, together
//! with the question, in a fixed grounding template.

use super::retriever::RetrievalResult;
use crate::core::config::PromptSettings;

/// Builds generation prompts from ranked retrieval results.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_chars: usize,
    fallback_phrase: String,
}

impl PromptAssembler {
    pub fn new(max_context_chars: usize, fallback_phrase: impl Into<String>) -> Self {
        Self {
            max_context_chars: max_context_chars.max(1),
            fallback_phrase: fallback_phrase.into(),
        }
    }

    pub fn from_settings(settings: &PromptSettings) -> Self {
        Self::new(settings.max_context_chars, settings.fallback_phrase.clone())
    }

    pub fn fallback_phrase(&self) -> &str {
        &self.fallback_phrase
    }

    /// Full prompt for `question`, grounded on `documents` in ranked order.
    pub fn build(&self, question: &str, documents: &[RetrievalResult]) -> String {
        let context = self.build_context(documents);
        format!(
            "Given the following context:\n\n\
             {context}\n\n\
             Please answer the following question:\n\
             {question}\n\n\
             Answer using only the information in the context above. \
             If the answer cannot be found in the given context, reply with exactly: \
             \"{fallback}\"",
            context = context,
            question = question.trim(),
            fallback = self.fallback_phrase,
        )
    }

    /// Joins passages (newline separated) until the character budget is hit.
    ///
    /// Lower-ranked passages are dropped first. A top passage that alone
    /// exceeds the budget is cut to fit.
    pub fn build_context(&self, documents: &[RetrievalResult]) -> String {
        let budget = self.max_context_chars;
        let mut context = String::new();
        let mut used = 0usize;

        for doc in documents {
            let text = doc.content.trim();
            if text.is_empty() {
                continue;
            }
            let separator = usize::from(!context.is_empty());
            let length = text.chars().count();

            if used + separator + length <= budget {
                if separator == 1 {
                    context.push('\n');
                }
                context.push_str(text);
                used += separator + length;
            } else {
                if context.is_empty() {
                    context.extend(text.chars().take(budget));
                }
                break;
            }
        }

        context
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::from_settings(&PromptSettings::default())
    }
}
