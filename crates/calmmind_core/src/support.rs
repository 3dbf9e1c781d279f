//! crates/calmmind_core/src/support.rs
//!
//! Guided support flows: a five-step CBT walkthrough and a rotating set of
//! grounding exercises. Both produce text the front end can send as a chat message.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbtStep {
    pub id: u8,
    pub title: &'static str,
    pub question: &'static str,
    pub description: &'static str,
}

pub static CBT_STEPS: [CbtStep; 5] = [
    CbtStep {
        id: 1,
        title: "Name the Situation",
        question: "What happened or what are you worried might happen?",
        description: "Step 1: Describe the event objectively.",
    },
    CbtStep {
        id: 2,
        title: "Identify Feelings",
        question: "What emotions are you feeling right now, and how intense are they (0-100%)?",
        description: "Step 2: Label your emotions.",
    },
    CbtStep {
        id: 3,
        title: "Identify Thoughts",
        question: "What specific thoughts are going through your mind?",
        description: "Step 3: Catch the automatic thoughts.",
    },
    CbtStep {
        id: 4,
        title: "Challenge Thoughts",
        question: "Is there evidence that contradicts this thought? Is there another way to look at it?",
        description: "Step 4: Examine the evidence.",
    },
    CbtStep {
        id: 5,
        title: "Reframe",
        question: "What is a more balanced or helpful thought?",
        description: "Step 5: Create a new perspective.",
    },
];

pub static GROUNDING_EXERCISES: [&str; 5] = [
    "**5-4-3-2-1 Technique**: Identify 5 things you see, 4 you can touch, 3 you hear, 2 you smell, and 1 you taste.",
    "**Box Breathing**: Inhale for 4 seconds, hold for 4 seconds, exhale for 4 seconds, hold for 4 seconds. Repeat 4 times.",
    "**Ice Cube Method**: Hold an ice cube in your hand and focus solely on the sensation: the cold, the melting, how it feels against your skin.",
    "**Feet on Floor**: Press your feet firmly into the ground, wiggle your toes, and feel the solid support beneath you.",
    "**54321 Body Scan**: Name 5 body parts you can feel, 4 textures around you, 3 sounds, 2 smells, 1 taste.",
];

/// Cursor over [`CBT_STEPS`]. Moving past either end is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CbtFlow {
    index: usize,
}

impl CbtFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static CbtStep {
        &CBT_STEPS[self.index]
    }

    /// Zero-based position of the current step.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn is_last(&self) -> bool {
        self.index == CBT_STEPS.len() - 1
    }

    pub fn next(&mut self) -> &'static CbtStep {
        if !self.is_last() {
            self.index += 1;
        }
        self.current()
    }

    pub fn previous(&mut self) -> &'static CbtStep {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    pub fn restart(&mut self) -> &'static CbtStep {
        self.index = 0;
        self.current()
    }

    /// The chat message that starts working on the current step.
    pub fn chat_prompt(&self) -> String {
        let step = self.current();
        format!("I want to work on {}. {}", step.title, step.question)
    }
}

/// Rotates through [`GROUNDING_EXERCISES`], wrapping at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundingCycle {
    index: usize,
}

impl GroundingCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static str {
        GROUNDING_EXERCISES[self.index]
    }

    pub fn next(&mut self) -> &'static str {
        self.index = (self.index + 1) % GROUNDING_EXERCISES.len();
        self.current()
    }
}
