//! [`PromptRequest`] and the model [`Input`] built from it.
//!
//! Each [`Variant`] wraps the user's text in a fixed instructional template
//! and sends it with a fixed set of generation parameters.

use serde::{Deserialize, Serialize};

/// Which flow a submission belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Name, tagline, description and a primary color for the theme.
    Palette,
    /// Full app concept with features and a business plan.
    Idea,
}

impl Variant {
    /// Prompt used when the user asks to be surprised.
    pub const fn lucky_prompt(self) -> &'static str {
        match self {
            Self::Palette => "random AI app idea",
            Self::Idea => "Generate a random app idea that would be useful",
        }
    }

    /// Fixed generation parameters. The prompt fields are left empty.
    pub const fn parameters(self) -> Parameters {
        match self {
            Self::Palette => Parameters {
                top_p: 0.9,
                temperature: 0.2,
                max_new_tokens: 512,
                min_new_tokens: 0,
                presence_penalty: 1.15,
                frequency_penalty: 0.2,
            },
            Self::Idea => Parameters {
                top_p: 0.9,
                temperature: 0.75,
                max_new_tokens: 1000,
                min_new_tokens: 0,
                presence_penalty: 1.15,
                frequency_penalty: 0.2,
            },
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::Palette => PALETTE_INSTRUCTIONS,
            Self::Idea => IDEA_INSTRUCTIONS,
        }
    }
}

const PALETTE_INSTRUCTIONS: &str = r#"You're a helpful assistant. I will give you an idea, and I want you to generate the name of the app, emojis, subtitle, description, color palette, and a basic business plan around it.
The output should be in JSON format:
    "Name": "<App Name with emoji>",
    "Tagline": "<Tagline>",
    "Description": "<description>",
    "Primary_Color": "<Primary color>""#;

const IDEA_INSTRUCTIONS: &str = r#"You are a creative and insightful brand consultant and app idea generator. I will provide you with an idea or an area of focus, and you will generate an AI app concept around it.
You will generate a clever name for the app with puns, an emoji to match the description of the app, a small tagline for the app,
a description of what the app will do, and then appropriate descriptions as I mention below. Also give a background color appropriate for the app and make it in dark theme.
The output should be in JSON format:
    "Name": "<App Name>.ai",
    "Tagline": "<Tagline>",
    "Description": "<Description>",
    "Background_Color": "<Background_Color_dark_mode>",
    "Emoji": "<Emoji>",
    "Problem": "<Problem>",
    "Solution": "<Solution>",
    "Features": ["Feature1", "Feature2", "Feature3", "Feature4"],
    "Business_Model": "<Business_Model>",
    "Competition": "<Competition>",
    "Competitive_Advantage": "<Competitive_Advantage>""#;

/// Sampling parameters sent with every prediction of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Top P nucleus sampling.
    pub top_p: f32,
    /// Temperature for sampling.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_new_tokens: u32,
    /// Minimum tokens to generate.
    pub min_new_tokens: u32,
    /// Penalty for tokens already present.
    pub presence_penalty: f32,
    /// Penalty proportional to token frequency.
    pub frequency_penalty: f32,
}

/// Model input for a prediction. Field names are what the model expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Raw user text.
    pub prompt: String,
    /// Fully rendered template. The user text is already embedded.
    pub prompt_template: String,
    #[serde(flatten)]
    #[allow(missing_docs)]
    pub parameters: Parameters,
}

/// The user's text (or the lucky fallback) for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Flow the request belongs to.
    pub variant: Variant,
    /// Text embedded in the template.
    pub text: String,
}

impl PromptRequest {
    /// Resolve what to send. `lucky` wins over `text`. Returns [`None`] if
    /// there is nothing to send, in which case no request should be made.
    pub fn resolve(
        variant: Variant,
        text: Option<&str>,
        lucky: bool,
    ) -> Option<Self> {
        let text = if lucky {
            variant.lucky_prompt()
        } else {
            text.filter(|t| !t.trim().is_empty())?
        };

        Some(Self {
            variant,
            text: text.to_string(),
        })
    }

    /// Instructional template with the text embedded as the user turn.
    pub fn template(&self) -> String {
        format!(
            "system\n{}\nuser\n{}\nassistant\n",
            self.variant.instructions(),
            self.text
        )
    }

    /// Model [`Input`] for this request.
    pub fn input(&self) -> Input {
        Input {
            prompt: self.text.clone(),
            prompt_template: self.template(),
            parameters: self.variant.parameters(),
        }
    }
}
