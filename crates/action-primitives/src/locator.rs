use crate::{
    errors::ActionError,
    types::{AnchorDescriptor, ResolvedSelector},
};
use async_trait::async_trait;
use cdp_adapter::PageDriver;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Attribute stamped on the matched element so later commands can address it.
pub const ANCHOR_ATTRIBUTE: &str = "data-linkpilot-anchor";

/// Turns an [`AnchorDescriptor`] into a concrete selector, or `None` when no
/// visible element currently matches.
#[async_trait]
pub trait AnchorResolver: Send + Sync {
    async fn resolve(
        &self,
        page: &dyn PageDriver,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ResolvedSelector>, ActionError>;
}

/// Default resolver that evaluates a locator script in the page.
#[derive(Default)]
pub struct ScriptAnchorResolver;

#[async_trait]
impl AnchorResolver for ScriptAnchorResolver {
    async fn resolve(
        &self,
        page: &dyn PageDriver,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ResolvedSelector>, ActionError> {
        anchor.validate().map_err(ActionError::InvalidAnchor)?;
        let token = format!("a-{}", Uuid::new_v4().simple());
        let expression = locator_script(anchor, &token)?;
        let value = page.evaluate(&expression).await?;
        let resolved = interpret_locator_result(&value, anchor)?;
        debug!(anchor = %anchor, found = resolved.is_some(), "anchor resolved");
        Ok(resolved)
    }
}

pub(crate) fn locator_script(anchor: &AnchorDescriptor, token: &str) -> Result<String, ActionError> {
    let desc = serde_json::to_string(anchor)
        .map_err(|err| ActionError::Internal(format!("failed to encode anchor: {err}")))?;
    let attr = serde_json::to_string(ANCHOR_ATTRIBUTE)
        .map_err(|err| ActionError::Internal(err.to_string()))?;
    let token = serde_json::to_string(token).map_err(|err| ActionError::Internal(err.to_string()))?;

    Ok(format!(
        r#"(() => {{
            const desc = {desc};
            const attr = {attr};
            const token = {token};
            const normalize = (input) => (input || '').replace(/\s+/g, ' ').trim().toLowerCase();
            const isVisible = (el) => {{
                if (!(el instanceof Element)) return false;
                const style = window.getComputedStyle(el);
                if (style.visibility === 'hidden' || style.display === 'none') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }};
            const accessibleName = (el) => {{
                const label = el.getAttribute('aria-label');
                if (label) return label;
                const labelledby = el.getAttribute('aria-labelledby');
                if (labelledby) {{
                    return labelledby.split(/\s+/)
                        .map(id => document.getElementById(id))
                        .map(node => node ? (node.textContent || '') : '')
                        .join(' ');
                }}
                if (el.title) return el.title;
                return el.innerText || el.textContent || '';
            }};
            const implicitRoles = {{ button: 'button', link: 'a[href]', textbox: 'input, textarea' }};
            let candidates = [];
            try {{
                if (desc.by === 'css') {{
                    candidates = Array.from(document.querySelectorAll(desc.selector));
                }} else if (desc.by === 'aria') {{
                    let query = '[role="' + desc.role + '"]';
                    if (implicitRoles[desc.role]) query += ', ' + implicitRoles[desc.role];
                    const wanted = normalize(desc.name);
                    candidates = Array.from(document.querySelectorAll(query))
                        .filter(el => normalize(accessibleName(el)) === wanted);
                }} else if (desc.by === 'text') {{
                    const wanted = normalize(desc.content);
                    candidates = Array.from(document.querySelectorAll(desc.tag || 'body *'))
                        .filter(el => {{
                            const value = normalize(el.innerText || el.textContent);
                            return desc.exact ? value === wanted : value.includes(wanted);
                        }});
                    if (!desc.tag) {{
                        candidates = candidates.filter(el => !candidates.some(other => other !== el && el.contains(other)));
                    }}
                }}
            }} catch (err) {{
                return {{ status: 'invalid', message: String(err) }};
            }}
            const match = candidates.find(isVisible);
            if (!match) {{
                return {{ status: 'not-found', candidates: candidates.length }};
            }}
            match.setAttribute(attr, token);
            return {{ status: 'ok', selector: '[' + attr + '="' + token + '"]' }};
        }})()"#
    ))
}

pub(crate) fn interpret_locator_result(
    value: &Value,
    anchor: &AnchorDescriptor,
) -> Result<Option<ResolvedSelector>, ActionError> {
    match value.get("status").and_then(Value::as_str) {
        Some("ok") => value
            .get("selector")
            .and_then(Value::as_str)
            .map(|selector| {
                Some(ResolvedSelector {
                    selector: selector.to_string(),
                    anchor: anchor.to_string(),
                })
            })
            .ok_or_else(|| ActionError::Internal("locator returned no selector".to_string())),
        Some("not-found") => Ok(None),
        Some("invalid") => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("invalid selector");
            Err(ActionError::InvalidAnchor(format!("{anchor}: {message}")))
        }
        _ => Err(ActionError::Internal(format!(
            "unexpected locator result for {anchor}: {value}"
        ))),
    }
}
