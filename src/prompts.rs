//! Prompt templates for the per-article AI actions.
//!
//! Templates use `{name}` placeholders. [`PromptTemplate::render`] substitutes
//! every placeholder and refuses to produce a prompt if any of them has no
//! value, so a template can never reach the model half-filled.

use thiserror::Error;

/// The sentence the QA template requires when the article has no answer.
/// Matched literally downstream, so the wording must not change.
pub const QA_NOT_FOUND: &str =
    "The answer to that question could not be found in the provided article text.";

const SUMMARY: &str = "Please provide a clear and concise summary of the following news article in {style}:\n\n---\n\n{text}";

const SENTIMENT: &str = "Analyze the sentiment of the following news article. Classify it as Positive, Negative, or Neutral. Then, provide a brief one-sentence explanation for your classification.\n\nArticle:\n---\n{text}";

const ENTITIES: &str = "From the article below, extract the following information. If none are found, state \"None found\".\n1. **Key People Mentioned:**\n2. **Key Organizations/Companies Mentioned:**\n3. **Main Topic:**\n\nArticle:\n---\n{text}";

const QA: &str = "You are a helpful Q&A assistant. Your task is to answer the user's question based *only* on the provided article text.\n- If the answer is found in the text, provide a direct and concise answer.\n- If the answer is not found in the text, you MUST state: '{not_found}'\n- Do not use any external knowledge or make assumptions.\n\nHere is the article text:\n---\n{text}\n---\nHere is the user's question: {question}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("no value supplied for placeholder {{{0}}}")]
    MissingValue(String),
    #[error("unterminated placeholder in template")]
    Unterminated,
}

/// The built-in templates, one per [`crate::models::AnalysisKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    Summary,
    Sentiment,
    Entities,
    Qa,
}

impl PromptTemplate {
    pub fn source(&self) -> &'static str {
        match self {
            PromptTemplate::Summary => SUMMARY,
            PromptTemplate::Sentiment => SENTIMENT,
            PromptTemplate::Entities => ENTITIES,
            PromptTemplate::Qa => QA,
        }
    }

    /// Fill this template.
    ///
    /// # Errors
    ///
    /// [`PromptError::MissingValue`] if a placeholder has no entry in `values`.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        fill(self.source(), values)
    }
}

/// Substitute `{name}` placeholders in `template`.
///
/// Values are inserted verbatim and never rescanned, so article text that
/// happens to contain braces is safe.
pub fn fill(template: &str, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or(PromptError::Unterminated)?;
        let name = &after[..close];
        let value = values
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| PromptError::MissingValue(name.to_string()))?;
        out.push_str(value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Summary prompt; `style` is a [`crate::models::SummaryStyle`] phrase.
pub fn summary(style: &str, text: &str) -> Result<String, PromptError> {
    PromptTemplate::Summary.render(&[("style", style), ("text", text)])
}

pub fn sentiment(text: &str) -> Result<String, PromptError> {
    PromptTemplate::Sentiment.render(&[("text", text)])
}

pub fn entities(text: &str) -> Result<String, PromptError> {
    PromptTemplate::Entities.render(&[("text", text)])
}

/// Q&A prompt that confines the model to `text` and demands
/// [`QA_NOT_FOUND`] when the answer is absent.
pub fn qa(text: &str, question: &str) -> Result<String, PromptError> {
    PromptTemplate::Qa.render(&[("text", text), ("question", question), ("not_found", QA_NOT_FOUND)])
}
