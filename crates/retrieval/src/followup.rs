//! Follow-up question synthesis.
//!
//! After the first retrieval round a provider is asked which sub-questions
//! would fill the gaps in the evidence. Its reply is parsed by a fallback
//! chain, stopping at the first stage that yields anything:
//!
//! 1. a JSON array of strings (bare, fenced, embedded in prose, or under a
//!    `questions` key)
//! 2. quoted substrings ending in `?`
//! 3. plain sentences ending in `?`
//!
//! A reply nothing can be extracted from yields no follow-ups, which makes
//! the query skip the second round. Synthesis never fails the query.

use crate::budget::apply_budget;
use crate::types::{format_evidence, Passage};
use multihop_core::EvidenceBudget;
use multihop_llm::{GenerationInvoker, GenerationRequest};
use multihop_prompt::PromptTemplates;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

const FOLLOWUP_TEMPERATURE: f32 = 0.2;
const FOLLOWUP_MAX_TOKENS: u32 = 400;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("valid fence regex"));

static QUOTED_QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["“]([^"“”\n]+?\?)["”]"#).expect("valid quoted question regex")
});

static INTERROGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]+\?").expect("valid interrogative regex"));

// List markers and `Question:` / `Q1:` / `Follow-up 2:` style labels only
static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:[-*•]\s*|\d+[.)]\s*|",
        r"(?i:(?:q|question|follow[- ]?up(?:\s+question)?)\s*\d*\s*:\s*))+",
    ))
    .expect("valid label regex")
});

/// Parser stage that produced a follow-up list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Structured,
    Quoted,
    Interrogative,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structured => "structured",
            Self::Quoted => "quoted",
            Self::Interrogative => "interrogative",
        };
        f.write_str(name)
    }
}

/// Outcome of parsing a synthesis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowupParse {
    Parsed {
        stage: ParseStage,
        questions: Vec<String>,
    },
    /// No stage could extract anything
    Unparsed,
}

impl FollowupParse {
    pub fn questions(&self) -> &[String] {
        match self {
            Self::Parsed { questions, .. } => questions,
            Self::Unparsed => &[],
        }
    }

    pub fn into_questions(self) -> Vec<String> {
        match self {
            Self::Parsed { questions, .. } => questions,
            Self::Unparsed => Vec::new(),
        }
    }
}

/// Extract at most `max_followups` distinct follow-up questions from a reply.
///
/// Entries are trimmed; blanks, case-insensitive duplicates and restatements
/// of `original_question` are dropped. A well-formed JSON reply is final even
/// when cleaning leaves nothing.
pub fn parse_followups(
    response: &str,
    original_question: &str,
    max_followups: usize,
) -> FollowupParse {
    let response = response.trim();
    if response.is_empty() {
        return FollowupParse::Unparsed;
    }

    if let Some(raw) = parse_structured(response) {
        return FollowupParse::Parsed {
            stage: ParseStage::Structured,
            questions: clean(raw, original_question, max_followups),
        };
    }

    let quoted = clean(parse_quoted(response), original_question, max_followups);
    if !quoted.is_empty() {
        return FollowupParse::Parsed {
            stage: ParseStage::Quoted,
            questions: quoted,
        };
    }

    let sentences = clean(parse_interrogative(response), original_question, max_followups);
    if !sentences.is_empty() {
        return FollowupParse::Parsed {
            stage: ParseStage::Interrogative,
            questions: sentences,
        };
    }

    FollowupParse::Unparsed
}

fn parse_structured(response: &str) -> Option<Vec<String>> {
    let body = CODE_FENCE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(response);

    let mut candidates = vec![body];
    if let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) {
        if start < end {
            candidates.push(&body[start..=end]);
        }
    }
    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            candidates.push(&body[start..=end]);
        }
    }

    candidates
        .into_iter()
        .find_map(questions_from_json)
}

fn questions_from_json(candidate: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("questions")
            .or_else(|| map.get("followups"))
            .and_then(Value::as_array)?,
        _ => return None,
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .or_else(|| item.get("question").and_then(Value::as_str))
                .map(str::to_string)
        })
        .collect()
}

fn parse_quoted(response: &str) -> Vec<String> {
    QUOTED_QUESTION
        .captures_iter(response)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn parse_interrogative(response: &str) -> Vec<String> {
    INTERROGATIVE
        .find_iter(response)
        .map(|m| LEADING_LABEL.replace(m.as_str().trim(), "").to_string())
        .filter(|q| q.split_whitespace().count() >= 2)
        .collect()
}

fn clean(raw: Vec<String>, original_question: &str, max_followups: usize) -> Vec<String> {
    let original = normalize(original_question);
    let mut seen = HashSet::new();
    let mut questions = Vec::new();

    for entry in raw {
        if questions.len() >= max_followups {
            break;
        }

        let question = entry
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
            .trim();
        let key = normalize(question);

        if key.is_empty() || key == original || !seen.insert(key) {
            continue;
        }

        questions.push(question.to_string());
    }

    questions
}

fn normalize(question: &str) -> String {
    question
        .trim()
        .trim_end_matches('?')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Asks a provider for follow-up questions over first-round evidence.
pub struct FollowupSynthesizer<'a> {
    generator: &'a GenerationInvoker,
    prompts: &'a PromptTemplates,
    budget: EvidenceBudget,
    max_followups: usize,
}

impl<'a> FollowupSynthesizer<'a> {
    pub fn new(
        generator: &'a GenerationInvoker,
        prompts: &'a PromptTemplates,
        budget: EvidenceBudget,
        max_followups: usize,
    ) -> Self {
        Self {
            generator,
            prompts,
            budget,
            max_followups,
        }
    }

    /// Follow-up questions for `question`, or none when synthesis fails.
    pub async fn synthesize(&self, question: &str, evidence: &[Passage]) -> Vec<String> {
        if self.max_followups == 0 {
            return Vec::new();
        }

        let budgeted = apply_budget(evidence, self.budget);
        let prompt = match self.prompts.render_followup(
            &format_evidence(&budgeted),
            question,
            self.max_followups,
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "Could not render follow-up prompt");
                return Vec::new();
            }
        };

        let request = GenerationRequest::new(prompt)
            .with_temperature(FOLLOWUP_TEMPERATURE)
            .with_max_tokens(FOLLOWUP_MAX_TOKENS);

        let generation = match self.generator.generate(&request).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Follow-up synthesis failed, continuing with first-round evidence"
                );
                return Vec::new();
            }
        };

        match parse_followups(&generation.text, question, self.max_followups) {
            FollowupParse::Parsed { stage, questions } => {
                tracing::debug!(
                    %stage,
                    count = questions.len(),
                    provider = %generation.provider_used,
                    "Parsed follow-up questions"
                );
                questions
            }
            FollowupParse::Unparsed => {
                let preview: String = generation.text.chars().take(120).collect();
                tracing::warn!(response = %preview, "No follow-up questions in provider reply");
                Vec::new()
            }
        }
    }
}
