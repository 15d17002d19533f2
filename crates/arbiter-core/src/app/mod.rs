//! App - アプリケーション層
//!
//! 登録された handler 宣言を 1 つの scorable に組み立て、activity ごとに pass を実行します。
//!
//! # 主要コンポーネント
//! - **HandlerRegistry / Registration**: handler 宣言の登録（band, pattern, intent）
//! - **ScorableFactory**: band / group ごとの fold を組み立てる
//! - **DispatcherBuilder / Dispatcher**: 構築時検証と pass の実行
//! - **DispatchConfig**: score の範囲、intent の閾値など

pub mod config;
pub mod dispatcher;
pub mod factory;
pub mod registry;

// 主要な型を再エクスポート
pub use self::config::{ConfigError, DispatchConfig};
pub use self::dispatcher::{BuildError, Dispatcher, DispatcherBuilder};
pub use self::factory::ScorableFactory;
pub use self::registry::{HandlerRegistry, IntentTrigger, Registration, RegistryError};
