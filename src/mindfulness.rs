//! Guidance text and breathing cues shown alongside a brew.
//!
//! Purely presentational: everything here is a function of elapsed seconds
//! and never feeds back into the brew timer.

use serde::Serialize;

use crate::timer::BrewStage;

/// Session prompts advance this often.
pub const SESSION_PROMPT_SECS: u64 = 12;

/// Single-brew reflections advance this often.
pub const REFLECTION_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
}

impl BreathPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreathPhase::Inhale => "inhale",
            BreathPhase::Hold => "hold",
            BreathPhase::Exhale => "exhale",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreathingPattern {
    pub inhale_secs: u64,
    pub hold_secs: u64,
    pub exhale_secs: u64,
}

/// 4 s in, 2 s hold, 6 s out.
pub const CALM_BREATH: BreathingPattern = BreathingPattern {
    inhale_secs: 4,
    hold_secs: 2,
    exhale_secs: 6,
};

impl BreathingPattern {
    pub fn cycle_secs(&self) -> u64 {
        self.inhale_secs + self.hold_secs + self.exhale_secs
    }

    pub fn phase_at(&self, elapsed_secs: u64) -> BreathPhase {
        let cycle = self.cycle_secs();
        if cycle == 0 {
            return BreathPhase::Inhale;
        }
        let offset = elapsed_secs % cycle;
        if offset < self.inhale_secs {
            BreathPhase::Inhale
        } else if offset < self.inhale_secs + self.hold_secs {
            BreathPhase::Hold
        } else {
            BreathPhase::Exhale
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub title: &'static str,
    pub instruction: &'static str,
    pub prompts: [&'static str; 4],
}

pub const THEMES: [Theme; 6] = [
    Theme {
        name: "Focus on Aroma",
        title: "Aromatic Awareness",
        instruction: "Allow your senses to be fully present with the emerging aromas.",
        prompts: [
            "Notice the first hints of aroma rising from your cup",
            "How does the scent change as the tea steeps?",
            "What memories or feelings does this aroma evoke?",
            "Breathe deeply and let the fragrance fill your awareness",
        ],
    },
    Theme {
        name: "Breathing Awareness",
        title: "Mindful Breathing",
        instruction: "Synchronize your breath with the rhythm of brewing.",
        prompts: [
            "Feel your breath naturally slow as the tea steeps",
            "Notice the pause between inhale and exhale",
            "How does your breathing affect your state of mind?",
            "Let each breath bring you deeper into presence",
        ],
    },
    Theme {
        name: "Gratitude Practice",
        title: "Tea Gratitude",
        instruction: "Cultivate appreciation for this moment and this tea.",
        prompts: [
            "Feel grateful for the leaves that traveled to reach you",
            "Appreciate the hands that picked and processed this tea",
            "What are you thankful for in this quiet moment?",
            "Send gratitude to the earth that nurtured these leaves",
        ],
    },
    Theme {
        name: "Present Moment",
        title: "Pure Presence",
        instruction: "Rest in simple awareness of what is happening now.",
        prompts: [
            "What do you notice in this exact moment?",
            "Feel the weight of the teacup in your hands",
            "Notice any thoughts without following them",
            "Simply be here, now, with your tea",
        ],
    },
    Theme {
        name: "Color and Clarity",
        title: "Visual Meditation",
        instruction: "Let your eyes rest softly on the tea's appearance.",
        prompts: [
            "Watch the color deepen as the tea steeps",
            "Notice the clarity or cloudiness of the brew",
            "How does the tea's appearance affect your anticipation?",
            "Let your gaze be soft and receptive",
        ],
    },
    Theme {
        name: "Warmth and Comfort",
        title: "Embodied Comfort",
        instruction: "Feel the warmth and comfort this ritual brings.",
        prompts: [
            "Notice the warmth spreading through your hands",
            "How does this ritual comfort your body and mind?",
            "Feel yourself settling into this peaceful moment",
            "Let warmth and comfort fill your entire being",
        ],
    },
];

const FALLBACK_THEME: usize = 3;

/// Looks a theme up by name, falling back to "Present Moment".
pub fn theme(name: &str) -> &'static Theme {
    THEMES
        .iter()
        .find(|theme| theme.name == name)
        .unwrap_or(&THEMES[FALLBACK_THEME])
}

pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEMES.iter().map(|theme| theme.name)
}

/// What the session view shows at a moment in a steep.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCue {
    pub title: &'static str,
    pub heading: String,
    pub prompt: &'static str,
    pub breath: BreathPhase,
}

pub fn session_cue(theme_name: &str, steep: u32, elapsed_secs: u64) -> SessionCue {
    let theme = theme(theme_name);
    let index = (elapsed_secs / SESSION_PROMPT_SECS) as usize % theme.prompts.len();
    SessionCue {
        title: theme.title,
        heading: format!("Steep {} • {}", steep, theme.instruction),
        prompt: theme.prompts[index],
        breath: CALM_BREATH.phase_at(elapsed_secs),
    }
}

const STEEPING_REFLECTIONS: [&str; 4] = [
    "What am I grateful for in this moment?",
    "How does the tea aroma make me feel?",
    "What intentions do I set for this day?",
    "How can I carry this calm into my next activity?",
];

/// Single-brew guidance for a stage.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Practice {
    pub title: &'static str,
    pub instruction: &'static str,
    pub breath: Option<BreathPhase>,
    pub reflection: Option<&'static str>,
}

pub fn stage_practice(stage: BrewStage, elapsed_secs: u64) -> Practice {
    match stage {
        BrewStage::Heating => Practice {
            title: "Warming Breath",
            instruction: "As the water heats, synchronize your breath with the rising temperature. Feel warmth building within you.",
            breath: Some(CALM_BREATH.phase_at(elapsed_secs)),
            reflection: None,
        },
        BrewStage::Steeping => {
            let index = (elapsed_secs / REFLECTION_SECS) as usize % STEEPING_REFLECTIONS.len();
            Practice {
                title: "Patience Meditation",
                instruction: "Like tea leaves slowly releasing their essence, allow this moment to unfold naturally. Practice patience and presence.",
                breath: None,
                reflection: Some(STEEPING_REFLECTIONS[index]),
            }
        }
        _ => Practice {
            title: "Find Your Center",
            instruction: "Take a moment to be present with your tea brewing journey",
            breath: None,
            reflection: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breath_cycle_is_four_two_six() {
        let phases: Vec<BreathPhase> = (0..12).map(|s| CALM_BREATH.phase_at(s)).collect();
        assert_eq!(&phases[0..4], &[BreathPhase::Inhale; 4]);
        assert_eq!(&phases[4..6], &[BreathPhase::Hold; 2]);
        assert_eq!(&phases[6..12], &[BreathPhase::Exhale; 6]);
        assert_eq!(CALM_BREATH.phase_at(12), BreathPhase::Inhale);
    }

    #[test]
    fn session_prompts_rotate_every_twelve_seconds() {
        let first = session_cue("Gratitude Practice", 2, 0);
        assert_eq!(first.title, "Tea Gratitude");
        assert!(first.heading.starts_with("Steep 2 • "));
        assert_eq!(first.prompt, THEMES[2].prompts[0]);

        assert_eq!(session_cue("Gratitude Practice", 2, 11).prompt, THEMES[2].prompts[0]);
        assert_eq!(session_cue("Gratitude Practice", 2, 12).prompt, THEMES[2].prompts[1]);
        assert_eq!(session_cue("Gratitude Practice", 2, 48).prompt, THEMES[2].prompts[0]);
    }

    #[test]
    fn unknown_theme_falls_back_to_present_moment() {
        assert_eq!(theme("Loud Music").name, "Present Moment");
        assert_eq!(theme_names().count(), 6);
    }

    #[test]
    fn stage_practice_follows_stage() {
        let heating = stage_practice(BrewStage::Heating, 5);
        assert_eq!(heating.title, "Warming Breath");
        assert_eq!(heating.breath, Some(BreathPhase::Hold));

        let steeping = stage_practice(BrewStage::Steeping, 31);
        assert_eq!(steeping.reflection, Some(STEEPING_REFLECTIONS[2]));

        assert_eq!(stage_practice(BrewStage::Ready, 0).title, "Find Your Center");
    }
}
