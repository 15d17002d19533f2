//! Errors - dispatch pass のエラー分類
//!
//! 「参加しない」（prepare が state を返さない、has_score が false、
//! binding が成立しない）はエラーではありません。`Option` で表現します。
//!
//! エラーになるのは次の 4 種類です。
//! - Invocation: 勝者の post が失敗した
//! - Inconsistent: comparer が 2 つの candidate を順序付けられない（handler set の設計ミス）
//! - ProtocolMisuse: has_score が false なのに get_score / post を呼んだ
//! - Cleanup: done の失敗（`Aggregate` にまとめて報告）
//!
//! # 学習ポイント
//! - `Clone + PartialEq` にしておくと集約やキャッシュ、テストでの比較が楽

use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch pass was cancelled")]
    Cancelled,

    #[error("scorable protocol misuse: {0}")]
    ProtocolMisuse(String),

    #[error("cannot order '{one}' against '{two}': {reason}")]
    Inconsistent {
        one: String,
        two: String,
        reason: String,
    },

    #[error("handler '{handler}' failed: {message}")]
    Invocation { handler: String, message: String },

    #[error("recognizer '{recognizer}' failed: {message}")]
    Recognizer { recognizer: String, message: String },

    #[error("score {score} is outside [{minimum}, {maximum}]")]
    ScoreOutOfRange {
        score: f64,
        minimum: f64,
        maximum: f64,
    },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{}", Summary(.0))]
    Aggregate(Vec<DispatchError>),

    #[error("{0}")]
    Other(String),
}

struct Summary<'a>(&'a [DispatchError]);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} faults", self.0.len())?;
        for (i, fault) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{fault}")?;
        }
        Ok(())
    }
}

impl DispatchError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolMisuse(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Collapses faults into one error.
    ///
    /// Returns `None` for no faults and the fault itself when there is only one.
    /// Nested aggregates are flattened.
    pub fn aggregate(faults: impl IntoIterator<Item = DispatchError>) -> Option<Self> {
        let mut flat: Vec<DispatchError> = faults
            .into_iter()
            .flat_map(DispatchError::flatten)
            .collect();
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Self::Aggregate(flat)),
        }
    }

    pub fn flatten(self) -> Vec<DispatchError> {
        match self {
            Self::Aggregate(inner) => inner.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }

    /// Aggregates `self` with a later fault, keeping `self` first.
    pub fn combine(self, later: DispatchError) -> Self {
        let mut faults = self.flatten();
        faults.extend(later.flatten());
        Self::Aggregate(faults)
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Aggregate(inner) => inner.iter().any(Self::is_cancelled),
            _ => false,
        }
    }
}
