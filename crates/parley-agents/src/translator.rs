//! Translator Agent
//!
//! Looks phrases up in a small fixed vocabulary for Spanish, French and
//! German.

use async_trait::async_trait;
use parley_a2a::{
    AgentCard, AgentHandler, InteractionMode, MessageRole, ParameterSpec, Skill, TaskMessage,
};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const FORMAT_HINT: &str =
    "Please use format: 'translate <text> to <language>' where language is spanish, french, or german";

/// A language the translator knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Spanish,
    French,
    German,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Spanish, Language::French, Language::German];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
        }
    }

    fn column(self) -> usize {
        match self {
            Language::Spanish => 0,
            Language::French => 1,
            Language::German => 2,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported language: {0}. I support spanish, french, and german.")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

/// Phrase table: spanish, french, german
pub const VOCABULARY: [(&str, [&str; 3]); 8] = [
    ("hello", ["hola", "bonjour", "hallo"]),
    ("goodbye", ["adiós", "au revoir", "auf wiedersehen"]),
    ("thank you", ["gracias", "merci", "danke"]),
    ("yes", ["sí", "oui", "ja"]),
    ("no", ["no", "non", "nein"]),
    ("please", ["por favor", "s'il vous plaît", "bitte"]),
    ("good morning", ["buenos días", "bonjour", "guten morgen"]),
    ("good night", ["buenas noches", "bonne nuit", "gute nacht"]),
];

/// Exact lookup of a phrase
pub fn lookup(phrase: &str, language: Language) -> Option<&'static str> {
    VOCABULARY
        .iter()
        .find(|(p, _)| *p == phrase)
        .map(|(_, row)| row[language.column()])
}

/// Translate `text`, falling back to the first known phrase it contains
pub fn translate(text: &str, language: Language) -> String {
    let text = text.trim().to_lowercase();

    if let Some(translation) = lookup(&text, language) {
        return format!("\"{text}\" in {language} is \"{translation}\"");
    }

    if let Some((phrase, row)) = VOCABULARY.iter().find(|(p, _)| text.contains(p)) {
        return format!(
            "I found \"{phrase}\" which translates to \"{}\" in {language}. \
             (Note: This is a demo with limited vocabulary)",
            row[language.column()]
        );
    }

    let known: Vec<&str> = VOCABULARY.iter().map(|(p, _)| *p).collect();
    format!(
        "I don't have a translation for \"{text}\" in my vocabulary. \
         (Note: This is a demo with limited phrases: {})",
        known.join(", ")
    )
}

/// Answer one `translate <text> to <language>` request as reply text
pub fn respond(input: &str) -> String {
    let content = input.trim().to_lowercase();
    if !content.contains("translate") || !content.contains(" to ") {
        return FORMAT_HINT.to_string();
    }

    let parts: Vec<&str> = content.split(" to ").collect();
    let [text, language] = parts.as_slice() else {
        return FORMAT_HINT.to_string();
    };
    let text = text.replace("translate", "");

    match language.trim().parse::<Language>() {
        Ok(language) => translate(&text, language),
        Err(err) => err.to_string(),
    }
}

/// Agent that translates a handful of phrases
#[derive(Debug, Clone)]
pub struct TranslatorAgent {
    url: String,
}

impl TranslatorAgent {
    pub const NAME: &'static str = "TranslatorAgent";

    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl AgentHandler for TranslatorAgent {
    fn agent_card(&self) -> AgentCard {
        let languages: Vec<&str> = Language::ALL.iter().map(|l| l.as_str()).collect();
        AgentCard::new(
            Self::NAME,
            "An agent that translates text between languages",
            self.url.clone(),
        )
        .with_skill(
            Skill::new("translate", "Translate text to another language")
                .with_parameter("text", ParameterSpec::string("Text to translate"))
                .with_parameter(
                    "target_language",
                    ParameterSpec::one_of("Target language", languages.clone()),
                ),
        )
        .with_interaction_modes(vec![InteractionMode::Text])
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("translator"))
        .with_metadata("supported_languages", json!(languages))
    }

    async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
        let message = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| "no user message to answer".to_string())?;
        let reply = respond(&message.content);
        debug!(input = %message.content, reply = %reply, "Translated");
        Ok(reply)
    }
}
