//! Recognition data - pattern backend と recognizer backend の結果
//!
//! - `PatternMatch`: 名前付き capture と coverage（入力に対する一致範囲の割合）
//! - `Recognition`: intent の一覧（confidence 付き）と entity の一覧

use serde::{Deserialize, Serialize};

/// A named capture group from a pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub name: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// A successful match of a trigger pattern against the item text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: String,
    pub start: usize,
    pub end: usize,
    pub text_len: usize,
    pub captures: Vec<Capture>,
}

impl PatternMatch {
    /// Fraction of the input covered by the match, in `[0.0, 1.0]`.
    ///
    /// An empty input matched by an empty pattern counts as fully covered.
    pub fn coverage(&self) -> f64 {
        if self.text_len == 0 {
            return 1.0;
        }
        (self.end - self.start) as f64 / self.text_len as f64
    }

    pub fn capture(&self, name: &str) -> Option<&Capture> {
        self.captures.iter().find(|c| c.name == name)
    }
}

/// One intent proposed by a recognizer.
///
/// Some backends report the "none" intent without a score, hence the `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl IntentScore {
    pub fn new(intent: impl Into<String>, score: f64) -> Self {
        Self {
            intent: intent.into(),
            score: Some(score),
        }
    }

    pub fn confidence(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// A recognized entity, located in the input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub text: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Entity {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: kind.into(),
            end: text.len(),
            text,
            start: 0,
            score: None,
        }
    }

    pub fn at(mut self, start: usize) -> Self {
        self.end = start + self.text.len();
        self.start = start;
        self
    }
}

/// The full result of classifying one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    #[serde(default)]
    pub intents: Vec<IntentScore>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Recognition {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intents: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn with_intent(mut self, intent: IntentScore) -> Self {
        self.intents.push(intent);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Case-insensitive lookup of an intent by name.
    pub fn intent(&self, name: &str) -> Option<&IntentScore> {
        self.intents
            .iter()
            .find(|i| i.intent.eq_ignore_ascii_case(name))
    }

    pub fn entities_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    pub fn top_intent(&self) -> Option<&IntentScore> {
        self.intents
            .iter()
            .max_by(|a, b| a.confidence().total_cmp(&b.confidence()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_is_the_matched_fraction() {
        let m = PatternMatch {
            pattern: "joke".into(),
            start: 10,
            end: 14,
            text_len: 16,
            captures: vec![],
        };
        assert_eq!(m.coverage(), 0.25);
    }

    #[test]
    fn intent_lookup_ignores_case() {
        let r = Recognition::new("hi").with_intent(IntentScore::new("Greeting", 0.7));
        assert!(r.intent("greeting").is_some());
        assert!(r.intent("farewell").is_none());
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let none = IntentScore {
            intent: "None".into(),
            score: None,
        };
        assert_eq!(none.confidence(), 0.0);

        let r = Recognition::new("x")
            .with_intent(none)
            .with_intent(IntentScore::new("a", 0.1));
        assert_eq!(r.top_intent().map(|i| i.intent.as_str()), Some("a"));
    }

    #[test]
    fn recognition_parses_from_json() {
        let r: Recognition = serde_json::from_str(
            r#"{"text":"book a flight","intents":[{"intent":"book","score":0.9}],
                "entities":[{"kind":"thing","text":"flight","start":7,"end":13}]}"#,
        )
        .unwrap();
        assert_eq!(r.entities_of("thing").count(), 1);
        assert_eq!(r.intent("book").map(IntentScore::confidence), Some(0.9));
    }
}
