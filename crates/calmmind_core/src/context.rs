//! crates/calmmind_core/src/context.rs
//!
//! Builds the text that accompanies every model request: a bounded window of
//! recent messages and a mood-aware instruction preamble. Everything here is
//! pure so identical inputs always produce byte-identical prompts.

use crate::domain::{Message, MoodDirection, MoodState, Sender};
use crate::mood::{mood_band, MoodBand};

/// Number of preceding messages supplied to the model.
pub const CONTEXT_WINDOW: usize = 5;
/// Characters of each history message kept in the snippet.
pub const SNIPPET_MAX_CHARS: usize = 150;
pub const ELLIPSIS: &str = "...";

/// The last `n` messages in their original order.
pub fn recent_window(messages: &[Message], n: usize) -> &[Message] {
    &messages[messages.len().saturating_sub(n)..]
}

/// Composes the base instruction with the mood-context and mood-directive blocks.
pub fn build_instruction_preamble(base_instruction: &str, mood: MoodState) -> String {
    let band = mood_band(mood.current);
    let mut instruction = format!(
        "{}\n\n## Current Session Context:\n- **User's Current Mood**: {} ({}/10)\n- **Mood Description**: {}",
        base_instruction,
        band.label(),
        mood.current,
        band.context(),
    );

    if mood.is_significant_change() {
        let direction = match mood.direction() {
            MoodDirection::Up => "improved",
            _ => "declined",
        };
        instruction.push_str(&format!(
            "\n- **Mood Change Detected**: The user's mood has {} by {} points (from {}/10 to {}/10). Acknowledge this change naturally in your response if relevant.",
            direction,
            mood.magnitude(),
            mood.previous,
            mood.current,
        ));
    }

    instruction.push_str(&format!(
        "\n\n## How to Respond Based on Current Mood ({}/10):\n",
        mood.current
    ));
    instruction.push_str(directives(band));
    instruction.push_str(GUIDELINES);
    instruction
}

/// Renders the recent window as `Role: text` lines.
pub fn format_history_snippet(messages: &[Message]) -> String {
    recent_window(messages, CONTEXT_WINDOW)
        .iter()
        .map(|msg| {
            let role = match msg.sender {
                Sender::User => "User",
                Sender::Bot => "Assistant",
            };
            format!("{}: {}", role, truncate(&msg.text, SNIPPET_MAX_CHARS))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the complete prompt for one exchange.
pub fn build_prompt(
    base_instruction: &str,
    message: &str,
    history: &[Message],
    mood: MoodState,
    mood_just_changed: bool,
) -> String {
    let mut prompt = build_instruction_preamble(base_instruction, mood);
    prompt.push_str("\n\n");

    if mood_just_changed && mood.is_significant_change() {
        let (indicator, direction) = match mood.direction() {
            MoodDirection::Up => ("📈", "increased"),
            _ => ("📉", "decreased"),
        };
        prompt.push_str(&format!(
            "{} [User just adjusted their mood slider from {}/10 to {}/10 - mood {}]\n\n",
            indicator, mood.previous, mood.current, direction
        ));
    }

    let snippet = format_history_snippet(history);
    if !snippet.is_empty() {
        prompt.push_str(&format!("Recent conversation:\n{}\n\n", snippet));
    }

    prompt.push_str(&format!("User's message: {}", message));
    prompt
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

fn directives(band: MoodBand) -> &'static str {
    match band {
        MoodBand::Low => LOW_MOOD_DIRECTIVES,
        MoodBand::Medium => MEDIUM_MOOD_DIRECTIVES,
        MoodBand::High => HIGH_MOOD_DIRECTIVES,
    }
}

const LOW_MOOD_DIRECTIVES: &str = r#"
The user is in a **low mood state** - they're struggling and need gentle, compassionate support:
- Use extra gentle, validating language
- Keep suggestions simple and non-overwhelming
- Focus on immediate comfort and safety
- Avoid complex problem-solving or multiple action items
- Emphasize that their feelings are valid and they're not alone
- Consider suggesting grounding techniques or simple self-soothing activities
- Check in about their safety if needed"#;

const MEDIUM_MOOD_DIRECTIVES: &str = r#"
The user is in a **medium mood state** - they're managing but could use support:
- Balance validation with gentle encouragement
- Offer practical, actionable coping strategies
- Help them identify patterns and practice skills
- Introduce cognitive reframing when appropriate
- Build on their existing resilience
- Provide structured support like CBT exercises if relevant"#;

const HIGH_MOOD_DIRECTIVES: &str = r#"
The user is in a **high mood state** - they're doing well:
- Celebrate their progress and positive state
- Help them identify what's working
- Discuss maintenance strategies for sustaining wellbeing
- Build long-term resilience and preventive skills
- Explore growth opportunities
- Validate that good days are important to honor"#;

const GUIDELINES: &str = r#"

## Important Guidelines:
- **Notice and acknowledge** when the user adjusts their mood slider - this is valuable information about how they're feeling
- Reference conversation history naturally to show continuity
- If the user's words contradict their mood score, gently explore this discrepancy
- Always maintain the safe, non-judgmental space
- Format responses with markdown for better readability"#;
