use std::fmt::Display;

use lazy_regex::regex_replace_all;

use crate::rendition::Rendition;

/// CDN url pattern with `{id}`, `{format}`, `{theme_mode}` and `{scale}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Accepts the API's `{{name}}` form and stores it as `{name}`.
    pub fn normalize(raw: &str) -> UrlTemplate {
        let normalized = regex_replace_all!(r"\{\{\s*(\w+)\s*\}\}", raw, |_, name| {
            format!("{{{name}}}")
        });
        Self(normalized.into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, id: &str, rendition: &Rendition) -> String {
        self.0
            .replace("{id}", id)
            .replace("{format}", rendition.format.as_str())
            .replace("{theme_mode}", &rendition.theme)
            .replace("{scale}", &rendition.scale)
    }
}

impl Display for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
