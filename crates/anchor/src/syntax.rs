use crate::error::{AnchorError, Result};
use dacdoc_protocol::CheckId;
use serde::{Deserialize, Serialize};

/// Characters that delimit markers and therefore may not appear in a keyword.
const RESERVED: &[char] = &['[', ']', '(', ')', ':', '!', '`', '~'];

/// Marker grammar settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnchorSyntax {
    /// Keyword following the opening bracket, e.g. `dacdoc` in `[dacdoc:check-1]`
    pub keyword: String,

    /// Treat fenced code blocks as plain text
    pub skip_code_fences: bool,
}

impl Default for AnchorSyntax {
    fn default() -> Self {
        Self {
            keyword: "dacdoc".to_string(),
            skip_code_fences: true,
        }
    }
}

impl AnchorSyntax {
    pub fn with_keyword(keyword: impl Into<String>) -> Result<Self> {
        let syntax = Self {
            keyword: keyword.into(),
            ..Default::default()
        };
        syntax.validate()?;
        Ok(syntax)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.keyword.is_empty() {
            return Err(AnchorError::invalid_syntax("keyword must not be empty"));
        }
        if let Some(ch) = self
            .keyword
            .chars()
            .find(|ch| ch.is_whitespace() || RESERVED.contains(ch))
        {
            return Err(AnchorError::invalid_syntax(format!(
                "keyword {:?} contains reserved character {ch:?}",
                self.keyword
            )));
        }
        Ok(())
    }

    /// Opening delimiter shared by both marker forms: `[keyword:`
    #[must_use]
    pub fn open_marker(&self) -> String {
        format!("[{}:", self.keyword)
    }

    /// `[keyword:id]`
    #[must_use]
    pub fn placeholder(&self, check_id: &CheckId) -> String {
        format!("[{}:{}]", self.keyword, check_id)
    }

    /// `![keyword:id](href)`
    #[must_use]
    pub fn rendered(&self, check_id: &CheckId, href: &str) -> String {
        format!("![{}:{}]({})", self.keyword, check_id, href)
    }
}
