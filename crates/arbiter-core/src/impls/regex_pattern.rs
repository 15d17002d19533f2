//! RegexPattern - `regex` crate による Pattern 実装

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::domain::{Capture, DispatchError, PatternMatch};
use crate::ports::Pattern;

pub struct RegexPattern {
    source: String,
    regex: Regex,
}

impl RegexPattern {
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> Result<Self, DispatchError> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| DispatchError::InvalidPattern {
                pattern: source.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { source, regex })
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

impl Pattern for RegexPattern {
    fn source(&self) -> &str {
        &self.source
    }

    fn find(&self, text: &str) -> Option<PatternMatch> {
        let caps = self.regex.captures(text)?;
        let whole = caps.get(0)?;

        // only named groups are addressable by handlers
        let captures = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name).map(|m| Capture {
                    name: name.to_string(),
                    value: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                })
            })
            .collect();

        Some(PatternMatch {
            pattern: self.source.clone(),
            start: whole.start(),
            end: whole.end(),
            text_len: text.len(),
            captures,
        })
    }
}
