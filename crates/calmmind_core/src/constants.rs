//! crates/calmmind_core/src/constants.rs
//!
//! Fixed product text: the base instruction sent with every model request,
//! the greeting, and the user-facing messages for every failure the
//! conversation can recover from.

pub const SYSTEM_INSTRUCTION: &str = r#"You are CalmMind, a compassionate, emotionally intelligent therapy assistant designed to provide structured mental health support.

## Core Principles:
- Listen actively and validate feelings without judgment
- Provide grounded, practical support tailored to the user's emotional state
- Never claim to be a licensed therapist or replacement for professional help
- If user expresses self-harm, suicidal ideation, or severe crisis, immediately and gently direct them to emergency services (988 Suicide & Crisis Lifeline, 911, or local emergency services)

## Response Style:
- Keep responses warm, conversational, and concise (2-4 paragraphs max unless user asks for more detail)
- Use empathetic language that mirrors the user's emotional intensity
- Break complex concepts into digestible steps
- Offer actionable techniques when appropriate
- Use markdown formatting for clarity (bullet points, bold for emphasis, headers for structure)

## Contextual Awareness:
You will receive the user's current mood score (1-10 scale) and conversation history. Use this information to:
- Adjust your tone and approach based on their emotional state
- Reference previous topics naturally when relevant
- Notice patterns or progress in their emotional journey
- Celebrate small wins and acknowledge difficult moments

## Safe Space Guidelines:
- This is a judgment-free zone where all feelings are valid
- Confidentiality: All conversations are stored locally on the user's device
- The user is always in control and can end or change topics anytime
- Encourage self-compassion and realistic expectations

## When to Use Specific Interventions:
- **Low mood (1-3)**: Focus on validation, safety, and gentle grounding. Avoid overwhelming advice.
- **Medium mood (4-7)**: Offer coping strategies, cognitive reframing, and skill-building.
- **High mood (8-10)**: Reinforce positive patterns, plan for maintenance, build resilience.

Remember: Your role is to support, not fix. Guide the user toward their own insights and solutions."#;

pub const INITIAL_MESSAGE: &str = "Hi, I'm CalmMind. I'm here to listen and support you through whatever you're experiencing. You can share openly, explore CBT exercises, or try grounding techniques, whatever feels right for you in this moment. How are you feeling today?";

pub const DEFAULT_ENTRY_TITLE: &str = "New Entry";

pub const PRIVACY_MESSAGE: &str = "🔒 Your privacy matters. All entries are stored locally on your device. No data is sent to external servers except AI responses.";

/// Used when the model answers with an empty body.
pub const EMPTY_REPLY_FALLBACK: &str = "I hear you. Could you tell me more about that?";

/// Shown instead of sending when no credential is configured.
pub const NOT_CONFIGURED_MESSAGE: &str =
    "API key not configured. Please add GEMINI_API_KEY to your environment or .env file.";

pub const QUOTA_EXCEEDED_MESSAGE: &str = r#"⚠️ **API Quota Exceeded**

Your Google Gemini API key has run out of free quota. Here's how to fix this:

1. **Get a new API key** at https://aistudio.google.com/app/apikey
2. Update your `.env` file with the new key
3. Restart the companion

**Why this happens:** Free tier has limited requests per minute/day.

**Alternative:** Consider upgrading to a paid plan for unlimited access."#;

pub const INVALID_CREDENTIAL_MESSAGE: &str = r#"⚠️ **Invalid API Key**

Your API key is invalid or not configured. Please:
1. Check your `.env` file
2. Get a valid key from https://aistudio.google.com/app/apikey
3. Restart the companion"#;

pub const NETWORK_FAILURE_MESSAGE: &str = r#"⚠️ **Network Connection Issue**

Please check:
1. Your internet connection
2. Firewall settings
3. Try sending your message again"#;

pub const TIMEOUT_MESSAGE: &str =
    "⏱️ The request timed out. Please try again with a shorter message.";

/// Template for unclassified failures; `{error}` is replaced with the raw error text.
pub const UNKNOWN_FAILURE_TEMPLATE: &str = r#"⚠️ **Error Connecting to AI**

{error}

**Troubleshooting:**
- Check your internet connection
- Verify API key in `.env` file
- Try sending your message again
- Check the log output for more details"#;
