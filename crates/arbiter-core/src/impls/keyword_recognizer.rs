//! KeywordRecognizer - 開発用の Recognizer 実装
//!
//! 統計的な intent サービスの代わりに、キーワード一覧で intent を、
//! 値の一覧で entity を認識します。CLI とテストで使います。
//!
//! # モデル（JSON）
//! ```json
//! {
//!   "intents": { "greet": ["hello", "hi"], "weather": ["weather", "rain"] },
//!   "entities": { "city": ["paris", "tokyo"] }
//! }
//! ```
//!
//! intent の score は「一致したキーワード数 / キーワード総数」です。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::{DispatchError, Entity, IntentScore, Recognition};
use crate::ports::Recognizer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordModel {
    #[serde(default)]
    pub intents: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<String>>,
}

impl KeywordModel {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn intent<I, S>(mut self, name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents
            .insert(name.into(), keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn entity<I, S>(mut self, kind: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities
            .insert(kind.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

pub struct KeywordRecognizer {
    id: String,
    model: KeywordModel,
}

impl KeywordRecognizer {
    pub fn new(id: impl Into<String>, model: KeywordModel) -> Self {
        Self {
            id: id.into(),
            model,
        }
    }

    fn recognize(&self, text: &str) -> Recognition {
        // ASCII lowercasing keeps byte offsets aligned with `text`
        let lowered = text.to_ascii_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut recognition = Recognition::new(text);

        for (intent, keywords) in &self.model.intents {
            if keywords.is_empty() {
                continue;
            }
            let hits = keywords
                .iter()
                .filter(|k| contains_phrase(&words, &k.to_ascii_lowercase()))
                .count();
            if hits > 0 {
                let score = hits as f64 / keywords.len() as f64;
                recognition = recognition.with_intent(IntentScore::new(intent.clone(), score));
            }
        }

        for (kind, values) in &self.model.entities {
            for value in values {
                let needle = value.to_ascii_lowercase();
                if needle.is_empty() {
                    continue;
                }
                for (start, _) in lowered.match_indices(&needle) {
                    let end = start + needle.len();
                    let entity = Entity {
                        kind: kind.clone(),
                        text: text[start..end].to_string(),
                        start,
                        end,
                        score: Some(1.0),
                    };
                    recognition = recognition.with_entity(entity);
                }
            }
        }

        recognition
    }
}

fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[async_trait]
impl Recognizer for KeywordRecognizer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn classify(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> Result<Recognition, DispatchError> {
        if token.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        Ok(self.recognize(text))
    }
}
