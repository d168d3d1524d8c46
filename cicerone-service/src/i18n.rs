//! User-facing text, kept in a Fluent catalogue embedded at build time.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use strum::{AsRefStr, EnumIter};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const CATALOGUE: &str = include_str!("../locales/en.ftl");
const LOCALE: &str = "en-US";

/// Every message the service shows to users. The Fluent id is the kebab-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Message {
    ErrorInternal,
    ErrorInvalidTranscript,
    ContextWebResults,
    ContextWikiSummary,
    ContextNone,
    IndexBuilding,
    IndexReady,
    IndexMissing,
    IndexFailed,
    HealthStatusHealthy,
    HealthStatusDegraded,
}

/// Message catalogue (thread-safe, read-only after construction)
pub struct I18n {
    bundle: FluentBundle<FluentResource>,
}

impl I18n {
    pub fn new() -> Self {
        let locale: LanguageIdentifier = LOCALE.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Values are sent as plain text, not rendered in a bidi-aware UI
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(CATALOGUE.to_string()).unwrap_or_else(
            |(partial, errors)| {
                warn!(errors = ?errors, "Message catalogue has syntax errors");
                partial
            },
        );
        if let Err(errors) = bundle.add_resource(resource) {
            warn!(errors = ?errors, "Message catalogue has duplicate entries");
        }

        Self { bundle }
    }

    /// Text of a message without arguments
    pub fn text(&self, message: Message) -> String {
        self.render(message, None)
    }

    /// Text of a message with `{ $name }` arguments filled in
    pub fn format(&self, message: Message, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, *value);
        }
        self.render(message, Some(&fluent_args))
    }

    /// Unknown ids render as the id itself
    fn render(&self, message: Message, args: Option<&FluentArgs>) -> String {
        let id = message.as_ref();
        let Some(pattern) = self.bundle.get_message(id).and_then(|m| m.value()) else {
            warn!(message = id, "Missing catalogue entry");
            return id.to_string();
        };

        let mut errors = vec![];
        let text = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(message = id, errors = ?errors, "Fluent formatting errors");
        }

        text.into_owned()
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_message_is_in_catalogue() {
        let i18n = I18n::new();
        for message in Message::iter() {
            let text = i18n.format(
                message,
                &[("document", "d"), ("chunks", "1"), ("reason", "r")],
            );
            assert_ne!(text, message.as_ref(), "no catalogue entry for {:?}", message);
        }
    }

    #[test]
    fn test_text() {
        let i18n = I18n::new();
        assert_eq!(i18n.text(Message::ErrorInternal), "Something went wrong");
        assert_eq!(
            i18n.text(Message::ContextNone),
            "No relevant information found."
        );
    }

    #[test]
    fn test_format_without_isolation_marks() {
        let i18n = I18n::new();
        let text = i18n.format(
            Message::IndexReady,
            &[("chunks", "5"), ("document", "guide.pdf")],
        );
        assert_eq!(text, "Indexed 5 chunks from guide.pdf");
    }

    #[test]
    fn test_message_ids() {
        assert_eq!(Message::ContextWikiSummary.as_ref(), "context-wiki-summary");
        assert_eq!(Message::HealthStatusDegraded.as_ref(), "health-status-degraded");
    }
}
