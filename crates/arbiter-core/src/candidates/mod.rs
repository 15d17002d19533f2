//! Candidates - 特化した scorable
//!
//! ```text
//! IntentScorable ─┐
//! RegexScorable  ─┼─▶ (scope resolver) ─▶ Fold<MethodScorable> (BindingComparer)
//! (plain)        ─┘
//! ```
//!
//! - **method**: handler を束縛できたら score（`Binding`）を持つ
//! - **regex**: pattern 一致の capture を scope に載せて内側を評価する
//! - **intent**: recognizer の intent / entity を scope に載せて内側を評価する
//! - **cache**: pass 単位の recognizer 呼び出しキャッシュ

pub mod cache;
pub mod intent;
pub mod method;
pub mod regex;

pub use self::cache::RecognitionCache;
pub use self::intent::{IntentComparer, IntentScope, IntentScorable};
pub use self::method::MethodScorable;
pub use self::regex::{MatchComparer, MatchScope, RegexScorable};
