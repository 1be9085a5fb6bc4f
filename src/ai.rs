use crate::config::Config;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

pub const MISSING_KEY_IDEA: &str = "Error: API Key missing";
pub const FAILED_IDEA: &str = "Failed to generate ideas. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("no API key configured")]
    MissingKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse model output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One prompt in, raw model text out.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` over blocking HTTP.
pub struct GeminiClient {
    http: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, api_key: String) -> Result<Self, AiError> {
        let http = Client::builder().build()?;
        Ok(GeminiClient {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

impl CompletionBackend for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let payload = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        tracing::debug!(model = %self.model, chars = prompt.len(), "sending prompt");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.text())
    }
}

/// The three assist operations. Holds no backend when no key is set.
/// Every operation degrades to a fixed fallback instead of failing.
pub struct Assistant {
    backend: Option<Box<dyn CompletionBackend>>,
}

impl Assistant {
    pub fn from_config(config: &Config) -> Self {
        let Some(key) = config.api_key() else {
            tracing::warn!(
                env = %config.api_key_env,
                "API key is missing from the environment, AI features disabled"
            );
            return Assistant::disabled();
        };
        match GeminiClient::new(&config.api_base, &config.model, key) {
            Ok(client) => Assistant::with_backend(Box::new(client)),
            Err(err) => {
                tracing::error!("could not build model client: {}", err);
                Assistant::disabled()
            }
        }
    }

    pub fn with_backend(backend: Box<dyn CompletionBackend>) -> Self {
        Assistant {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Assistant { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let backend = self.backend.as_ref().ok_or(AiError::MissingKey)?;
        Ok(backend.complete(prompt)?.trim().to_string())
    }

    pub fn generate_ideas(&self, topic: &str, context: &str) -> Vec<String> {
        if !self.is_enabled() {
            return vec![MISSING_KEY_IDEA.to_string()];
        }
        let prompt = ideas_prompt(topic, context);
        match self.complete(&prompt) {
            Ok(text) if text.is_empty() => Vec::new(),
            Ok(text) => parse_string_array(&text).unwrap_or_else(|err| {
                tracing::error!("idea generation failed: {}", err);
                vec![FAILED_IDEA.to_string()]
            }),
            Err(err) => {
                tracing::error!("idea generation failed: {}", err);
                vec![FAILED_IDEA.to_string()]
            }
        }
    }

    /// Turns one long text into a chain. Any failure returns the text unsplit.
    pub fn split_into_chain(&self, long_text: &str) -> Vec<String> {
        let unsplit = || vec![long_text.to_string()];
        if !self.is_enabled() {
            return unsplit();
        }
        let text = match self.complete(&split_prompt(long_text)) {
            Ok(text) if text.is_empty() => return unsplit(),
            Ok(text) => text,
            Err(err) => {
                tracing::error!("chain split failed: {}", err);
                return unsplit();
            }
        };
        match parse_string_array(&text) {
            Ok(parts) if !parts.is_empty() => parts,
            Ok(_) => unsplit(),
            Err(err) => {
                tracing::error!("chain split failed: {}", err);
                unsplit()
            }
        }
    }

    pub fn polish(&self, content: &str) -> String {
        if !self.is_enabled() {
            return content.to_string();
        }
        match self.complete(&polish_prompt(content)) {
            Ok(text) if text.is_empty() => content.to_string(),
            Ok(text) => text,
            Err(err) => {
                tracing::error!("polish failed: {}", err);
                content.to_string()
            }
        }
    }
}

/// True when `ideas` is one of the placeholder lists returned on failure.
pub fn is_fallback(ideas: &[String]) -> bool {
    matches!(ideas, [only] if only == MISSING_KEY_IDEA || only == FAILED_IDEA)
}

pub fn idea_context(monthly_theme: &str, daily_theme: &str) -> String {
    let or_none = |s: &str| {
        if s.is_empty() {
            "None".to_string()
        } else {
            s.to_string()
        }
    };
    format!(
        "Themes - Month: {}, Day: {}",
        or_none(monthly_theme),
        or_none(daily_theme)
    )
}

fn ideas_prompt(topic: &str, context: &str) -> String {
    format!(
        "You are a social media expert for the platform Threads.\n\
         Generate 3 distinct, engaging thread ideas based on the topic: \"{topic}\".\n\
         Context/Audience: {context}.\n\n\
         Return ONLY a JSON array of strings. Example: [\"Idea 1...\", \"Idea 2...\", \"Idea 3...\"].\n\
         Do not include markdown code blocks."
    )
}

fn split_prompt(long_text: &str) -> String {
    format!(
        "You are a Threads formatting expert.\n\
         Take the following text and split it into a \"Thread Chain\" (a series of connected posts).\n\n\
         Rules:\n\
         1. Each post must be under {limit} characters.\n\
         2. The flow must be logical and engaging (hook in first post).\n\
         3. Maintain the original meaning.\n\n\
         Text to split:\n\"{long_text}\"\n\n\
         Return ONLY a JSON array of strings, where each string is one post in the chain.",
        limit = crate::model::THREAD_CHAR_LIMIT,
    )
}

fn polish_prompt(content: &str) -> String {
    format!(
        "Rewrite the following social media post to be more engaging, concise, and viral-worthy for Threads.\n\
         Keep it under {limit} characters.\n\n\
         Content: \"{content}\"",
        limit = crate::model::THREAD_CHAR_LIMIT,
    )
}

/// Drops markdown code fences the model adds despite being told not to.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_string_array(text: &str) -> Result<Vec<String>, AiError> {
    Ok(serde_json::from_str(&strip_fences(text))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Canned {
        reply: Result<String, ()>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Box<Self> {
            Box::new(Canned {
                reply: Ok(reply.to_string()),
                prompts: Arc::default(),
            })
        }

        fn failing() -> Box<Self> {
            Box::new(Canned {
                reply: Err(()),
                prompts: Arc::default(),
            })
        }
    }

    impl CompletionBackend for Canned {
        fn complete(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|_| AiError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    #[test]
    fn missing_key_degrades_every_operation() {
        let assistant = Assistant::disabled();
        assert_eq!(
            assistant.generate_ideas("launch", "ctx"),
            vec!["Error: API Key missing".to_string()]
        );
        assert_eq!(assistant.split_into_chain("X"), vec!["X".to_string()]);
        assert_eq!(assistant.polish("draft"), "draft");
    }

    #[test]
    fn failures_fall_back() {
        let assistant = Assistant::with_backend(Canned::failing());
        assert_eq!(
            assistant.generate_ideas("launch", "ctx"),
            vec![FAILED_IDEA.to_string()]
        );
        assert_eq!(assistant.split_into_chain("X"), vec!["X".to_string()]);
        assert_eq!(assistant.polish("draft"), "draft");
    }

    #[test]
    fn fenced_json_is_parsed() {
        let assistant =
            Assistant::with_backend(Canned::ok("```json\n[\"first\", \"second\"]\n```\n"));
        assert_eq!(assistant.split_into_chain("long"), vec!["first", "second"]);
    }

    #[test]
    fn malformed_output_falls_back() {
        let assistant = Assistant::with_backend(Canned::ok("Here are some ideas: one, two"));
        assert_eq!(assistant.generate_ideas("t", "c"), vec![FAILED_IDEA.to_string()]);
        assert_eq!(assistant.split_into_chain("orig"), vec!["orig".to_string()]);
    }

    #[test]
    fn empty_output_per_operation() {
        let assistant = Assistant::with_backend(Canned::ok("   "));
        assert!(assistant.generate_ideas("t", "c").is_empty());
        assert_eq!(assistant.split_into_chain("orig"), vec!["orig".to_string()]);
        assert_eq!(assistant.polish("keep me"), "keep me");

        let assistant = Assistant::with_backend(Canned::ok("[]"));
        assert_eq!(assistant.split_into_chain("orig"), vec!["orig".to_string()]);
    }

    #[test]
    fn polish_returns_trimmed_text() {
        let assistant = Assistant::with_backend(Canned::ok("\n  Shorter and punchier.  \n"));
        assert_eq!(assistant.polish("long winded"), "Shorter and punchier.");
    }

    #[test]
    fn prompts_embed_caller_text() {
        let backend = Canned::ok("[\"a\"]");
        let prompts = Arc::clone(&backend.prompts);
        let assistant = Assistant::with_backend(backend);
        assistant.generate_ideas("rust tips", "Themes - Month: None, Day: None");
        assistant.split_into_chain("a long essay");
        let seen = prompts.lock().unwrap().clone();
        assert!(seen[0].contains("\"rust tips\""));
        assert!(seen[0].contains("Context/Audience: Themes - Month: None, Day: None."));
        assert!(seen[1].contains("\"a long essay\""));
        assert!(seen[1].contains("under 500 characters"));
    }

    #[test]
    fn fallback_lists_are_recognised() {
        assert!(is_fallback(&Assistant::disabled().generate_ideas("t", "c")));
        assert!(is_fallback(
            &Assistant::with_backend(Canned::failing()).generate_ideas("t", "c")
        ));
        assert!(!is_fallback(&["A real idea".to_string()]));
        assert!(!is_fallback(&[]));
    }

    #[test]
    fn context_string() {
        assert_eq!(idea_context("", ""), "Themes - Month: None, Day: None");
        assert_eq!(
            idea_context("Spring", "Q&A"),
            "Themes - Month: Spring, Day: Q&A"
        );
    }

    #[test]
    fn response_text_concatenates_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[\"a\","},{"text":"\"b\"]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "[\"a\",\"b\"]");
        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }
}
