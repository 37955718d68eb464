use action_primitives::AnchorDescriptor;
use serde::{Deserialize, Serialize};

/// Ordered descriptor lists for every control the engine touches. The first
/// entry with a visible match wins.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorCatalog {
    pub login_email: Vec<AnchorDescriptor>,
    pub login_password: Vec<AnchorDescriptor>,
    pub login_submit: Vec<AnchorDescriptor>,
    pub connect: Vec<AnchorDescriptor>,
    pub pending: Vec<AnchorDescriptor>,
    pub message: Vec<AnchorDescriptor>,
    pub add_note: Vec<AnchorDescriptor>,
    pub note_field: Vec<AnchorDescriptor>,
    pub connect_submit: Vec<AnchorDescriptor>,
    pub message_field: Vec<AnchorDescriptor>,
    pub message_submit: Vec<AnchorDescriptor>,
}

fn button(text: &str) -> AnchorDescriptor {
    AnchorDescriptor::tag_with_text("button", text)
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        Self {
            login_email: vec![AnchorDescriptor::css(r#"input[name="session_key"]"#)],
            login_password: vec![AnchorDescriptor::css(r#"input[name="session_password"]"#)],
            login_submit: vec![AnchorDescriptor::css(r#"button[type="submit"]"#)],
            connect: vec![button("Connect")],
            pending: vec![button("Pending")],
            message: vec![button("Message")],
            add_note: vec![button("Add a note")],
            note_field: vec![AnchorDescriptor::css(r#"textarea[name="message"]"#)],
            connect_submit: vec![
                AnchorDescriptor::css(r#"button[aria-label*="Send"]"#),
                button("Send"),
            ],
            message_field: vec![
                AnchorDescriptor::css(r#"div[contenteditable="true"]"#),
                AnchorDescriptor::css(r#"textarea[name="message"]"#),
            ],
            message_submit: vec![
                AnchorDescriptor::css(r#"button[type="submit"]"#),
                button("Send"),
            ],
        }
    }
}

impl SelectorCatalog {
    /// Name and descriptor list of every entry, for validation and display.
    pub fn entries(&self) -> [(&'static str, &[AnchorDescriptor]); 11] {
        [
            ("login_email", self.login_email.as_slice()),
            ("login_password", self.login_password.as_slice()),
            ("login_submit", self.login_submit.as_slice()),
            ("connect", self.connect.as_slice()),
            ("pending", self.pending.as_slice()),
            ("message", self.message.as_slice()),
            ("add_note", self.add_note.as_slice()),
            ("note_field", self.note_field.as_slice()),
            ("connect_submit", self.connect_submit.as_slice()),
            ("message_field", self.message_field.as_slice()),
            ("message_submit", self.message_submit.as_slice()),
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, anchors) in self.entries() {
            if anchors.is_empty() {
                return Err(format!("selector list '{name}' is empty"));
            }
            for anchor in anchors {
                anchor
                    .validate()
                    .map_err(|err| format!("selector '{name}': {err}"))?;
            }
        }
        Ok(())
    }
}
