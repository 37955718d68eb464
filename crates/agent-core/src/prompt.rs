use linkpilot_core_types::{ProspectContext, NOTE_LIMIT};

const REWRITE_SYSTEM: &str = "You are a professional networking outreach expert. \
Personalize the message you are given for the prospect described.
Keep it professional, warm, and under 300 characters.
Do not open with a greeting such as \"Hi [Name]\"; write only the core message.
Do not use placeholders such as [Your Name] or [Your Company].";

const COMPOSE_SYSTEM: &str = "You are a professional networking outreach expert. \
Write a personalized connection request note.
Requirements:
- Professional and warm tone
- Reference their role or company
- Give a genuine reason to connect
- At most 300 characters
- No greeting such as \"Hi [Name]\"; write only the core message
- No placeholders such as [Your Name] or [Your Company]";

/// System and user prompt for one personalization call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotePrompt {
    pub system: String,
    pub user: String,
}

fn or_unknown(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rewrite `base_message` when present, otherwise compose from scratch.
pub fn build_note_prompt(prospect: &ProspectContext) -> NotePrompt {
    let title = or_unknown(&prospect.title, "Unknown");
    let company = or_unknown(&prospect.company, "Unknown");

    match prospect
        .base_message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
    {
        Some(base) => NotePrompt {
            system: REWRITE_SYSTEM.to_string(),
            user: format!(
                "Prospect: {name}\nTitle: {title}\nCompany: {company}\n\n\
                 Base message: {base}\n\n\
                 Personalize this message for the prospect above. Keep it under {NOTE_LIMIT} characters.",
                name = or_unknown(&prospect.full_name, "Unknown"),
            ),
        },
        None => NotePrompt {
            system: COMPOSE_SYSTEM.to_string(),
            user: format!(
                "Write a personalized connection note for:\n\n\
                 Name: {name}\nTitle: {title}\nCompany: {company}\n\n\
                 Generate a warm, professional note (max {NOTE_LIMIT} characters).",
                name = or_unknown(&prospect.full_name, "this person"),
            ),
        },
    }
}
