//! Prompt rendering.

use crate::loader::try_load_prompt;
use crate::types::{PromptDefinition, ANSWER_PROMPT_ID, FOLLOWUP_PROMPT_ID};
use handlebars::Handlebars;
use multihop_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// The two templates a multi-hop query renders, compiled once at startup.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    answer: PromptDefinition,
    followup: PromptDefinition,
    registry: Handlebars<'static>,
}

impl PromptTemplates {
    /// Compile the given definitions.
    pub fn new(answer: PromptDefinition, followup: PromptDefinition) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Disable HTML escaping for plain text
        registry.register_escape_fn(handlebars::no_escape);

        for def in [&answer, &followup] {
            registry
                .register_template_string(&def.id, &def.template)
                .map_err(|e| {
                    AppError::Prompt(format!("Failed to register template '{}': {}", def.id, e))
                })?;
        }

        Ok(Self {
            answer,
            followup,
            registry,
        })
    }

    /// Built-in templates only.
    pub fn builtin() -> AppResult<Self> {
        Self::new(
            PromptDefinition::builtin_answer(),
            PromptDefinition::builtin_followup(),
        )
    }

    /// Built-in templates, replaced by any `<id>.yml` override in `prompts_dir`.
    pub fn load(prompts_dir: &Path) -> AppResult<Self> {
        let answer = try_load_prompt(prompts_dir, ANSWER_PROMPT_ID)?
            .unwrap_or_else(PromptDefinition::builtin_answer);
        let followup = try_load_prompt(prompts_dir, FOLLOWUP_PROMPT_ID)?
            .unwrap_or_else(PromptDefinition::builtin_followup);

        tracing::debug!(
            answer = %answer.created_by,
            followup = %followup.created_by,
            "Prompt templates ready"
        );

        Self::new(answer, followup)
    }

    /// Render the final-answer prompt.
    pub fn render_answer(&self, evidence: &str, question: &str) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("evidence", evidence.to_string());
        vars.insert("question", question.to_string());
        self.render(&self.answer.id, &vars)
    }

    /// Render the follow-up synthesis prompt.
    pub fn render_followup(
        &self,
        evidence: &str,
        question: &str,
        max_questions: usize,
    ) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("evidence", evidence.to_string());
        vars.insert("question", question.to_string());
        vars.insert("maxQuestions", max_questions.to_string());
        self.render(&self.followup.id, &vars)
    }

    fn render(&self, id: &str, vars: &HashMap<&str, String>) -> AppResult<String> {
        self.registry
            .render(id, vars)
            .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", id, e)))
    }
}

/// Render an ad-hoc Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
