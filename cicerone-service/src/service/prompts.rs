//! Prompt building for answer generation.

use crate::config::DynamicConfig;
use crate::i18n::Message;

use super::{CiceroneService, ResolvedContext};

const ANSWER_TEMPLATE: &str = include_str!("../../prompts/answer.txt");

/// Fill the answer template. Placeholders are substituted in a single pass, so
/// braces inside the context or question are left alone.
pub fn compose_prompt(greeting: &str, topic: &str, context: &str, question: &str) -> String {
    let values = [
        ("greeting", greeting),
        ("topic", topic),
        ("context", context),
        ("question", question),
    ];

    let template = ANSWER_TEMPLATE.trim_end();
    let mut prompt = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        prompt.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let replacement = after.find('}').and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });

        match replacement {
            Some((value, end)) => {
                prompt.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                prompt.push('{');
                rest = after;
            }
        }
    }
    prompt.push_str(rest);

    prompt
}

impl CiceroneService {
    pub(crate) fn build_prompt(
        &self,
        config: &DynamicConfig,
        context: &ResolvedContext,
        question: &str,
    ) -> String {
        let context_text = if context.text.is_empty() {
            self.i18n.text(Message::ContextNone)
        } else {
            context.text.clone()
        };

        compose_prompt(
            &config.assistant.greeting,
            &config.assistant.topic,
            &context_text,
            question,
        )
    }
}
