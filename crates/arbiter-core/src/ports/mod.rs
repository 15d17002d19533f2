//! Ports - 抽象化レイヤー
//!
//! dispatch engine が外部に要求するインターフェースを定義します。
//! - **Resolver**: (type, tag) で値を引く chain
//! - **Recognizer**: intent / entity の分類
//! - **Pattern**: trigger pattern の照合

pub mod pattern;
pub mod recognizer;
pub mod resolver;

pub use self::pattern::Pattern;
pub use self::recognizer::Recognizer;
pub use self::resolver::{Resolver, ResolverExt, ResolverRef};
