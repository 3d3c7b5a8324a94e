//! Creator style profiles.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The ten fixed style dimensions, in rubric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKey {
    Tone,
    Energy,
    Vocabulary,
    Catchphrases,
    Structure,
    Rhythm,
    Analogies,
    Emotion,
    Hooks,
    CallToAction,
}

/// Rubric order. Rendering and prompting both follow it.
pub const DIMENSIONS: [DimensionKey; 10] = [
    DimensionKey::Tone,
    DimensionKey::Energy,
    DimensionKey::Vocabulary,
    DimensionKey::Catchphrases,
    DimensionKey::Structure,
    DimensionKey::Rhythm,
    DimensionKey::Analogies,
    DimensionKey::Emotion,
    DimensionKey::Hooks,
    DimensionKey::CallToAction,
];

impl DimensionKey {
    /// JSON field name in the persisted profile.
    pub fn field(&self) -> &'static str {
        match self {
            DimensionKey::Tone => "tone",
            DimensionKey::Energy => "energy",
            DimensionKey::Vocabulary => "vocabulary",
            DimensionKey::Catchphrases => "catchphrases",
            DimensionKey::Structure => "structure",
            DimensionKey::Rhythm => "rhythm",
            DimensionKey::Analogies => "analogies",
            DimensionKey::Emotion => "emotion",
            DimensionKey::Hooks => "hooks",
            DimensionKey::CallToAction => "cta",
        }
    }

    /// Section heading used in the rendered profile.
    pub fn title(&self) -> &'static str {
        match self {
            DimensionKey::Tone => "TONE OF VOICE",
            DimensionKey::Energy => "ENERGY AND INTENSITY",
            DimensionKey::Vocabulary => "VOCABULARY AND DICTION",
            DimensionKey::Catchphrases => "CATCHPHRASES AND REPEATED EXPRESSIONS",
            DimensionKey::Structure => "ARGUMENT STRUCTURE",
            DimensionKey::Rhythm => "SENTENCE RHYTHM",
            DimensionKey::Analogies => "ANALOGIES AND METAPHORS",
            DimensionKey::Emotion => "EMOTIONAL CONNECTION",
            DimensionKey::Hooks => "HOOK STYLE",
            DimensionKey::CallToAction => "CALL-TO-ACTION STYLE",
        }
    }

    /// Label for the dimension-specific expression list, where one exists.
    pub fn expressions_label(&self) -> Option<&'static str> {
        match self {
            DimensionKey::Vocabulary => Some("Slang and expressions"),
            DimensionKey::Catchphrases => Some("Catchphrases"),
            _ => None,
        }
    }
}

impl std::fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

/// One style dimension: what the pattern is, verbatim excerpts, and rules
/// for reproducing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDimension {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    /// Slang list for vocabulary, catchphrase list for catchphrases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
}

impl StyleDimension {
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
            && self.examples.is_empty()
            && self.rules.is_empty()
            && self.expressions.is_empty()
    }
}

/// Structured summary of a creator's communication style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub style_summary: String,
    #[serde(default)]
    pub tone: StyleDimension,
    #[serde(default)]
    pub energy: StyleDimension,
    #[serde(default)]
    pub vocabulary: StyleDimension,
    #[serde(default)]
    pub catchphrases: StyleDimension,
    #[serde(default)]
    pub structure: StyleDimension,
    #[serde(default)]
    pub rhythm: StyleDimension,
    #[serde(default)]
    pub analogies: StyleDimension,
    #[serde(default)]
    pub emotion: StyleDimension,
    #[serde(default)]
    pub hooks: StyleDimension,
    #[serde(default)]
    pub cta: StyleDimension,
}

impl CreatorProfile {
    /// Parse a profile from JSON. Unknown fields are ignored, missing
    /// dimensions come back empty.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn dimension(&self, key: DimensionKey) -> &StyleDimension {
        match key {
            DimensionKey::Tone => &self.tone,
            DimensionKey::Energy => &self.energy,
            DimensionKey::Vocabulary => &self.vocabulary,
            DimensionKey::Catchphrases => &self.catchphrases,
            DimensionKey::Structure => &self.structure,
            DimensionKey::Rhythm => &self.rhythm,
            DimensionKey::Analogies => &self.analogies,
            DimensionKey::Emotion => &self.emotion,
            DimensionKey::Hooks => &self.hooks,
            DimensionKey::CallToAction => &self.cta,
        }
    }

    /// Dimensions paired with their keys, in rubric order.
    pub fn dimensions(&self) -> impl Iterator<Item = (DimensionKey, &StyleDimension)> {
        DIMENSIONS.iter().map(move |key| (*key, self.dimension(*key)))
    }

    /// Dimensions whose description is blank.
    pub fn missing_dimensions(&self) -> Vec<DimensionKey> {
        self.dimensions()
            .filter(|(_, dim)| dim.description.trim().is_empty())
            .map(|(key, _)| key)
            .collect()
    }

    /// Check that every dimension carries a description.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_dimensions();
        if missing.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = missing.iter().map(|k| k.field()).collect();
        Err(Error::InvalidInput(format!(
            "profile is missing dimensions: {}",
            names.join(", ")
        )))
    }
}
