//! Ollama-backed classification, style analysis and embeddings.
//!
//! The pipeline is synchronous; each service drives the async client on a
//! runtime shared by all services built from one [`OllamaServices`].

use crate::error::{IngestError, IngestResult};
use crate::services::{Classifier, Embedder, ServiceFailure, ServiceResult, StyleAnalyzer};
use mimeo_config::OllamaConfig;
use mimeo_core::{Classification, CreatorProfile};
use mimeo_ollama::{GenerateOptions, GenerateRequest, OllamaClient};
use serde::Deserialize;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Keywords kept from a classification.
pub const MAX_KEYWORDS: usize = 5;

const CLASSIFY_SYSTEM: &str = "You are a content classifier. \
Read the excerpt and return a JSON object with:\n\
- \"topic\": the main topic (e.g. \"sales funnels\", \"self-esteem\")\n\
- \"author\": the author if identifiable, otherwise \"unknown\"\n\
- \"keywords\": a list of 3-5 relevant keywords\n\
Answer ONLY with the JSON object, no explanations.";

const STYLE_RUBRIC: &str = r#"You are an expert in communication style analysis. Build the complete style profile of a creator from the transcripts of their videos, detailed enough that anyone could write exactly the way this creator speaks.

For each of the ten dimensions below give:
- a clear description of the pattern
- 2-3 REAL excerpts copied verbatim from the transcripts
- specific rules for reproducing it

1. TONE OF VOICE: how do they position themselves (authority, friend, provocateur, mentor)? Serious or relaxed?
2. ENERGY AND INTENSITY: fast or calm pace, exclamations, dramatic pauses, high or low energy?
3. VOCABULARY AND DICTION: slang (which?), profanity, technical or popular terms, formal or informal mix?
4. CATCHPHRASES AND REPEATED EXPRESSIONS: phrases they repeat, verbal tics, signature expressions.
5. ARGUMENT STRUCTURE: how an argument is built: opening question, strong claim, personal stories, data, everyday examples?
6. SENTENCE RHYTHM: short and direct or long and explanatory? Alternation, repetition for emphasis?
7. ANALOGIES AND METAPHORS: what comparisons, drawn from which domains (daily life, sport, war, nature, business)?
8. EMOTIONAL CONNECTION: how they connect with the audience: "you", personal stories, empathy or provocation?
9. HOOK STYLE: how videos open: question, shocking claim, promise?
10. CALL-TO-ACTION STYLE: how videos close: follow request, invitation, reflection?

Return a JSON object with exactly this structure:
{
  "author": "Creator name",
  "style_summary": "2-3 sentences describing the overall style",
  "tone": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "energy": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "vocabulary": {"description": "...", "expressions": ["slang and expressions used"], "examples": ["..."], "rules": ["..."]},
  "catchphrases": {"description": "...", "expressions": ["catchphrase 1"], "examples": ["..."], "rules": ["..."]},
  "structure": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "rhythm": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "analogies": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "emotion": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "hooks": {"description": "...", "examples": ["..."], "rules": ["..."]},
  "cta": {"description": "...", "examples": ["..."], "rules": ["..."]}
}

IMPORTANT:
- Use ONLY real excerpts from the transcripts as examples, in their original language
- Be SPECIFIC, never generic: include the creator's exact words
- Rules must be PRACTICAL: "Start sentences with...", "Use expression X when...", "Never use Y..."
- Answer ONLY with the JSON object"#;

/// One client and runtime shared by every Ollama-backed service.
#[derive(Clone)]
pub struct OllamaServices {
    client: OllamaClient,
    rt: Arc<Runtime>,
}

impl OllamaServices {
    pub fn from_config(config: &OllamaConfig) -> IngestResult<Self> {
        let client = OllamaClient::from_config(config)
            .map_err(|e| IngestError::Service(ServiceFailure::from(e)))?;
        let rt = Runtime::new()?;
        Ok(Self {
            client,
            rt: Arc::new(rt),
        })
    }

    pub fn runtime(&self) -> Arc<Runtime> {
        self.rt.clone()
    }

    pub fn is_available(&self) -> bool {
        self.rt.block_on(self.client.is_available())
    }

    pub fn classifier(&self, model: &str, excerpt_chars: usize) -> OllamaClassifier {
        OllamaClassifier {
            services: self.clone(),
            model: model.to_string(),
            excerpt_chars,
        }
    }

    pub fn style_analyzer(&self, model: &str) -> OllamaStyleAnalyzer {
        OllamaStyleAnalyzer {
            services: self.clone(),
            model: model.to_string(),
        }
    }

    pub fn embedder(&self, model: &str) -> OllamaEmbedder {
        OllamaEmbedder {
            services: self.clone(),
            model: model.to_string(),
        }
    }

    fn generate_json(&self, request: GenerateRequest) -> ServiceResult<String> {
        let response = self.rt.block_on(self.client.generate(request.json()))?;
        debug!(
            "Model {} answered {} chars ({:?} tokens)",
            response.model,
            response.response.len(),
            response.eval_count
        );
        Ok(response.response)
    }
}

/// Classifies the first `excerpt_chars` characters of a text.
pub struct OllamaClassifier {
    services: OllamaServices,
    model: String,
    excerpt_chars: usize,
}

impl Classifier for OllamaClassifier {
    fn classify(&self, text: &str) -> ServiceResult<Classification> {
        let excerpt = truncate_chars(text, self.excerpt_chars);
        let request = GenerateRequest::new(&self.model, format!("Classify this content:\n\n{}", excerpt))
            .with_system(CLASSIFY_SYSTEM)
            .with_options(GenerateOptions::new().with_temperature(0.1).with_num_predict(256));

        let raw = self.services.generate_json(request)?;
        parse_classification(&raw)
    }
}

/// Builds a creator profile from the concatenated transcripts.
pub struct OllamaStyleAnalyzer {
    services: OllamaServices,
    model: String,
}

impl StyleAnalyzer for OllamaStyleAnalyzer {
    fn analyze(&self, creator: &str, transcripts: &str) -> ServiceResult<CreatorProfile> {
        let prompt = format!(
            "Build the complete style profile of the creator: {}\n\nTranscripts:\n\n{}",
            creator, transcripts
        );
        let request = GenerateRequest::new(&self.model, prompt)
            .with_system(STYLE_RUBRIC)
            .with_options(GenerateOptions::new().with_temperature(0.4).with_num_ctx(32768));

        let raw = self.services.generate_json(request)?;
        CreatorProfile::from_json(extract_json(&raw))
            .map_err(|e| ServiceFailure::MalformedResponse(e.to_string()))
    }
}

pub struct OllamaEmbedder {
    services: OllamaServices,
    model: String,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let vector = self
            .services
            .rt
            .block_on(self.services.client.embed(&self.model, text))?;
        if vector.is_empty() {
            return Err(ServiceFailure::MalformedResponse("empty embedding".to_string()));
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// At most `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The JSON object inside a model answer, without Markdown fences or
/// surrounding prose.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[derive(Deserialize)]
struct RawClassification {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    keywords: Keywords,
}

#[derive(Deserialize, Default)]
#[serde(untagged)]
enum Keywords {
    List(Vec<String>),
    Joined(String),
    #[default]
    Missing,
}

/// Parse a classifier answer, normalising blanks and capping keywords.
pub fn parse_classification(raw: &str) -> ServiceResult<Classification> {
    let parsed: RawClassification = serde_json::from_str(extract_json(raw))
        .map_err(|e| ServiceFailure::MalformedResponse(e.to_string()))?;

    let keywords = match parsed.keywords {
        Keywords::List(list) => list,
        Keywords::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Keywords::Missing => Vec::new(),
    };
    let keywords: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(MAX_KEYWORDS)
        .collect();

    let defaults = Classification::default();
    let author = parsed.author.trim();
    Ok(Classification {
        topic: parsed.topic.trim().to_string(),
        author: if author.is_empty() {
            defaults.author
        } else {
            author.to_string()
        },
        keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("ação rápida", 3), "açã");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_extract_json_strips_fences() {
        let raw = "```json\n{\"topic\": \"x\"}\n```";
        assert_eq!(extract_json(raw), "{\"topic\": \"x\"}");
        assert_eq!(extract_json("Sure! {\"a\": {\"b\": 1}} hope it helps"), "{\"a\": {\"b\": 1}}");
        assert_eq!(extract_json("no json"), "no json");
    }

    #[test]
    fn test_parse_classification() {
        let raw = r#"{"topic": " sales funnels ", "author": "", "keywords": ["a", " b ", "", "c", "d", "e", "f"]}"#;
        let c = parse_classification(raw).unwrap();

        assert_eq!(c.topic, "sales funnels");
        assert_eq!(c.author, "unknown");
        assert_eq!(c.keywords, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_parse_classification_joined_keywords() {
        let c = parse_classification(r#"{"topic": "t", "author": "Ana", "keywords": "x, y"}"#).unwrap();
        assert_eq!(c.keywords, vec!["x", "y"]);
        assert_eq!(c.author, "Ana");
    }

    #[test]
    fn test_parse_classification_rejects_garbage() {
        assert!(matches!(
            parse_classification("I cannot help with that"),
            Err(ServiceFailure::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_style_profile_from_fenced_answer() {
        let raw = "```json\n{\"style_summary\": \"warm\", \"tone\": {\"description\": \"mentor\"}}\n```";
        let profile = CreatorProfile::from_json(extract_json(raw)).unwrap();
        assert_eq!(profile.tone.description, "mentor");
        assert_eq!(profile.missing_dimensions().len(), 9);
    }
}
