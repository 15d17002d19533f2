//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **NullResolver / ServiceResolver / ActivityResolver**: pass ごとの root chain
//! - **RegexPattern**: `regex` crate の Pattern backend
//! - **KeywordRecognizer**: 開発用の Recognizer（キーワード一致）
//!
//! # 本番用実装
//! 統計的 intent サービスなどのクライアントは別クレートに置く想定です。

pub mod keyword_recognizer;
pub mod regex_pattern;
pub mod resolvers;

pub use self::keyword_recognizer::{KeywordModel, KeywordRecognizer};
pub use self::regex_pattern::RegexPattern;
pub use self::resolvers::{ActivityResolver, NullResolver, Service, ServiceResolver};
