//! Prompt types for multihop.

use serde::{Deserialize, Serialize};

/// Identifier of the final-answer template.
pub const ANSWER_PROMPT_ID: &str = "multihop.answer";

/// Identifier of the follow-up synthesis template.
pub const FOLLOWUP_PROMPT_ID: &str = "multihop.followup";

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl PromptDefinition {
    /// Built-in final-answer template.
    ///
    /// Variables: `evidence`, `question`.
    pub fn builtin_answer() -> Self {
        Self {
            id: ANSWER_PROMPT_ID.to_string(),
            title: "Grounded answer".to_string(),
            api_version: "1.0".to_string(),
            created_by: "builtin".to_string(),
            template: BUILTIN_ANSWER_TEMPLATE.to_string(),
        }
    }

    /// Built-in follow-up synthesis template.
    ///
    /// Variables: `evidence`, `question`, `maxQuestions`.
    pub fn builtin_followup() -> Self {
        Self {
            id: FOLLOWUP_PROMPT_ID.to_string(),
            title: "Follow-up questions".to_string(),
            api_version: "1.0".to_string(),
            created_by: "builtin".to_string(),
            template: BUILTIN_FOLLOWUP_TEMPLATE.to_string(),
        }
    }
}

const BUILTIN_ANSWER_TEMPLATE: &str = "\
You are an assistant answering questions from an organisation's documents and meeting transcripts.

Instructions:
- Answer using only the evidence below
- Combine facts from several passages when the question has several parts
- Cite the passages you rely on with their bracketed numbers, e.g. [2]
- If the evidence suggests but does not confirm something, say so
- If the evidence does not contain the answer, state: \"I could not find this information in the available documents.\"
- Keep the answer concise and factual

Evidence:
{{evidence}}

Question: {{question}}

Answer:";

const BUILTIN_FOLLOWUP_TEMPLATE: &str = "\
You are helping a retrieval system find missing information.

Read the question and the evidence retrieved so far. Identify what is still needed to answer the question completely: unexplained terms, referenced policies or procedures, people or roles, conditions and exceptions.

Write at most {{maxQuestions}} short, self-contained follow-up questions that would retrieve that missing information. Do not repeat the original question.

Respond with a JSON array of strings and nothing else, for example:
[\"What does policy CD-150 require?\", \"Who approves exceptions?\"]

Evidence:
{{evidence}}

Question: {{question}}";
