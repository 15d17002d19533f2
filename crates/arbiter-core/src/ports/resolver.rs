//! Resolver - (type, tag) をキーにした値の検索
//!
//! Resolver は外側（具体的）から内側（一般的）へ連鎖します。
//! 各リンクは自分が知っている値だけに答え、それ以外は inner に委譲します。
//!
//! ```text
//! IntentScope → RegexScope → ActivityResolver → ServiceResolver → NullResolver
//!   (entities)    (captures)    (activity, text)   (ambient services)
//! ```
//!
//! # 学習ポイント
//! - `Arc<dyn Resolver>` で chain を共有する（scope は immutable なので clone が安い）
//! - 拡張メソッドは blanket impl の extension trait で提供する

use std::any::Any;
use std::sync::Arc;

use crate::domain::types::{self, TypeTag};
use crate::domain::{Activity, Value};

pub trait Resolver: Send + Sync {
    /// Looks up a value assignable to `ty`, optionally keyed by `tag`.
    fn try_resolve(&self, ty: &TypeTag, tag: Option<&str>) -> Option<Value>;
}

pub type ResolverRef = Arc<dyn Resolver>;

/// Typed lookups on top of [`Resolver::try_resolve`].
pub trait ResolverExt: Resolver {
    /// The untagged text payload of the current item.
    fn resolve_text(&self) -> Option<String> {
        self.try_resolve(&types::TEXT, None)
            .and_then(|v| v.as_text().map(str::to_string))
    }

    fn resolve_activity(&self) -> Option<Arc<Activity>> {
        self.try_resolve(&types::ACTIVITY, None)
            .and_then(|v| v.as_activity().cloned())
    }

    fn resolve_object<T: Any + Send + Sync>(&self, ty: &TypeTag) -> Option<Arc<T>> {
        self.try_resolve(ty, None).and_then(|v| v.as_object::<T>())
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}
