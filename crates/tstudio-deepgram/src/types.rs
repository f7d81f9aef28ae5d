//! Deepgram `/v1/listen` request options and response types.

use serde::{Deserialize, Serialize};
use tstudio_models::{Transcript, Word};

use crate::error::{DeepgramError, DeepgramResult};

/// Query options for a pre-recorded transcription.
#[derive(Debug, Clone, Serialize)]
pub struct ListenOptions {
    pub model: String,
    pub smart_format: bool,
    pub punctuate: bool,
    pub diarize: bool,
    pub utterances: bool,
    pub numerals: bool,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            smart_format: true,
            punctuate: true,
            diarize: true,
            utterances: true,
            numerals: true,
        }
    }
}

impl ListenOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Query string pairs.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model", self.model.clone()),
            ("smart_format", self.smart_format.to_string()),
            ("punctuate", self.punctuate.to_string()),
            ("diarize", self.diarize.to_string()),
            ("utterances", self.utterances.to_string()),
            ("numerals", self.numerals.to_string()),
        ]
    }
}

/// Request body for URL sources.
#[derive(Debug, Serialize)]
pub(crate) struct UrlSource<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenResponse {
    #[serde(default)]
    pub results: Option<ListenResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListenResults {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub utterances: Option<Vec<Utterance>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub words: Vec<DeepgramWord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub speaker: Option<u32>,
    #[serde(default)]
    pub words: Vec<DeepgramWord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepgramWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub speaker: Option<u32>,
    #[serde(default)]
    pub punctuated_word: Option<String>,
}

impl DeepgramWord {
    fn into_word(self, speaker: Option<u32>) -> Word {
        let punctuated = self
            .punctuated_word
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.word.clone());
        Word {
            text: self.word,
            start: self.start,
            end: self.end,
            confidence: self.confidence,
            speaker,
            punctuated_word: Some(punctuated),
        }
    }
}

impl ListenResponse {
    /// Flatten the response into timed words.
    ///
    /// Utterances are preferred because they carry the diarized speaker; the
    /// first alternative of the first channel is used otherwise. A response
    /// without `results` is an error, one without words is not.
    pub fn into_transcript(self) -> DeepgramResult<Transcript> {
        let results = self
            .results
            .ok_or_else(|| DeepgramError::invalid_response("response has no results"))?;

        let utterances = results.utterances.unwrap_or_default();
        let words = if !utterances.is_empty() {
            utterances
                .into_iter()
                .flat_map(|u| {
                    let speaker = u.speaker;
                    u.words.into_iter().map(move |w| w.into_word(speaker))
                })
                .collect()
        } else {
            results
                .channels
                .into_iter()
                .next()
                .and_then(|c| c.alternatives.into_iter().next())
                .map(|a| {
                    a.words
                        .into_iter()
                        .map(|w| {
                            let speaker = w.speaker;
                            w.into_word(speaker)
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Transcript::new(words))
    }
}
