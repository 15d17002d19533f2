//! arbiter-core
//!
//! Core building blocks for the Arbiter dispatch engine: given one incoming
//! activity, pick exactly one handler out of many candidates.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（type tag, value, activity, recognition, ids, outcome, errors）
//! - **ports**: 抽象化レイヤー（Resolver, Recognizer, Pattern）
//! - **impls**: 実装（root resolver, RegexPattern, 開発用の KeywordRecognizer）
//! - **scorable**: candidate のライフサイクル（prepare → has_score → get_score → post → done）と fold
//! - **bind**: handler のパラメータ束縛と overload の半順序
//! - **candidates**: method / regex / intent の特化 candidate と pass 単位のキャッシュ
//! - **app**: registry, factory, builder, dispatcher, config
//!
//! # 使用例
//! ```ignore
//! let dispatcher = DispatcherBuilder::new()
//!     .register(Registration::new(joke).in_band(0).on_pattern("joke"))?
//!     .register(Registration::new(fallback).in_band(1))?
//!     .build()?;
//!
//! let outcome = dispatcher.dispatch_text("tell me a joke", &CancellationToken::new()).await?;
//! assert!(outcome.is_handled());
//! ```

pub mod app;
pub mod bind;
pub mod candidates;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod scorable;

pub use app::{Dispatcher, DispatcherBuilder, Registration};
pub use bind::{Arguments, Method};
pub use domain::{Activity, DispatchError, Outcome};
