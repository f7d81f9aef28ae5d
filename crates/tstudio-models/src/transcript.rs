//! Timed-word transcripts produced by the transcription engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single recognised word with its timing in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Diarized speaker index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
    /// Word with casing and punctuation applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punctuated_word: Option<String>,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence: None,
            speaker: None,
            punctuated_word: None,
        }
    }

    /// Display form of the word, preferring the punctuated variant.
    pub fn display(&self) -> &str {
        self.punctuated_word.as_deref().unwrap_or(&self.text)
    }
}

/// Structured transcription result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub words: Vec<Word>,
}

impl Transcript {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Plain text of the transcript.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(Word::display)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total covered duration in seconds.
    pub fn duration(&self) -> f64 {
        self.words.last().map(|w| w.end).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prefers_punctuated_words() {
        let mut hello = Word::new("hello", 0.0, 0.5);
        hello.punctuated_word = Some("Hello,".to_string());
        let world = Word::new("world", 0.6, 1.1);
        let transcript = Transcript::new(vec![hello, world]);

        assert_eq!(transcript.text(), "Hello, world");
        assert_eq!(transcript.len(), 2);
        assert!((transcript.duration() - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_word_serializes_camel_case() {
        let mut word = Word::new("ok", 1.0, 1.2);
        word.punctuated_word = Some("Ok.".to_string());
        word.speaker = Some(1);
        let value = serde_json::to_value(&word).unwrap();
        assert_eq!(value["punctuatedWord"], "Ok.");
        assert_eq!(value["speaker"], 1);
        assert!(value.get("confidence").is_none());
    }
}
