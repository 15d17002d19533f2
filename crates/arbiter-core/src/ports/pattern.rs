//! Pattern port - trigger pattern のバックエンド
//!
//! 一致した場合は名前付き capture と coverage を持つ `PatternMatch` を返します。

use std::fmt::Debug;

use crate::domain::PatternMatch;

pub trait Pattern: Send + Sync + Debug {
    /// The pattern as it was declared.
    fn source(&self) -> &str;

    fn find(&self, text: &str) -> Option<PatternMatch>;
}
