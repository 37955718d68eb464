use serde::{Deserialize, Serialize};
use std::fmt;

/// Declarative description of an element to locate.
///
/// - `css`: any CSS selector
/// - `aria`: role plus accessible name (exact, case-insensitive)
/// - `text`: visible text, optionally restricted to one tag, matched as a
///   case-insensitive substring unless `exact` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum AnchorDescriptor {
    Css {
        selector: String,
    },
    Aria {
        role: String,
        name: String,
    },
    Text {
        content: String,
        #[serde(default)]
        exact: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
    },
}

impl AnchorDescriptor {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
        }
    }

    /// A `tag` element whose visible text contains `content`.
    pub fn tag_with_text(tag: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            exact: false,
            tag: Some(tag.into()),
        }
    }

    pub fn aria(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Aria {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Css { selector } if selector.trim().is_empty() => {
                Err("Empty CSS selector".to_string())
            }
            Self::Aria { role, name } if role.trim().is_empty() || name.trim().is_empty() => {
                Err("ARIA role and name must be provided".to_string())
            }
            Self::Text { content, .. } if content.trim().is_empty() => {
                Err("Text content cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for AnchorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { selector } => write!(f, "css:{selector}"),
            Self::Aria { role, name } => write!(f, "aria:{role}[name='{name}']"),
            Self::Text {
                content,
                exact,
                tag,
            } => {
                let scope = tag.as_deref().unwrap_or("*");
                let mode = if *exact { "exact" } else { "has" };
                write!(f, "{scope}:{mode}-text('{content}')")
            }
        }
    }
}

/// A concrete selector pointing at the element a descriptor resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSelector {
    pub selector: String,
    pub anchor: String,
}
