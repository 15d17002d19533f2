//! Value - resolver が返し、handler が受け取る値
//!
//! Handler の引数はリフレクションではなく tagged variant で受け渡します。
//! どの variant がどの `TypeTag` に対応するかは resolver 側が決めます。
//!
//! # 学習ポイント
//! - `Arc<dyn Any + Send + Sync>` で任意のサービスを運ぶ（`Arc::downcast` で取り出す）
//! - 比較できない variant（Object, Cancellation）は手書きの PartialEq で扱う

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::activity::Activity;
use super::recognition::{Capture, Entity, IntentScore, PatternMatch, Recognition};

#[derive(Clone)]
pub enum Value {
    Text(String),
    TextList(Vec<String>),
    Number(f64),
    Activity(Arc<Activity>),
    Match(Arc<PatternMatch>),
    Capture(Capture),
    Captures(Vec<Capture>),
    Recognition(Arc<Recognition>),
    Intent(IntentScore),
    Entity(Entity),
    Entities(Vec<Entity>),
    Cancellation(CancellationToken),
    /// An ambient service; compared by identity.
    Object(Arc<dyn Any + Send + Sync>),
    /// An optional parameter nothing could supply.
    Absent,
}

impl Value {
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// The text carried by this value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Capture(c) => Some(&c.value),
            Self::Entity(e) => Some(&e.text),
            _ => None,
        }
    }

    pub fn as_activity(&self) -> Option<&Arc<Activity>> {
        match self {
            Self::Activity(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_entities(&self) -> Option<&[Entity]> {
        match self {
            Self::Entities(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_object<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Object(o) => Arc::clone(o).downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    fn variant(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::TextList(_) => "TextList",
            Self::Number(_) => "Number",
            Self::Activity(_) => "Activity",
            Self::Match(_) => "Match",
            Self::Capture(_) => "Capture",
            Self::Captures(_) => "Captures",
            Self::Recognition(_) => "Recognition",
            Self::Intent(_) => "Intent",
            Self::Entity(_) => "Entity",
            Self::Entities(_) => "Entities",
            Self::Cancellation(_) => "Cancellation",
            Self::Object(_) => "Object",
            Self::Absent => "Absent",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::TextList(l) => f.debug_tuple("TextList").field(l).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Activity(a) => f.debug_tuple("Activity").field(&a.id).finish(),
            Self::Match(m) => f.debug_tuple("Match").field(m).finish(),
            Self::Capture(c) => f.debug_tuple("Capture").field(c).finish(),
            Self::Captures(c) => f.debug_tuple("Captures").field(c).finish(),
            Self::Recognition(r) => f.debug_tuple("Recognition").field(r).finish(),
            Self::Intent(i) => f.debug_tuple("Intent").field(i).finish(),
            Self::Entity(e) => f.debug_tuple("Entity").field(e).finish(),
            Self::Entities(e) => f.debug_tuple("Entities").field(e).finish(),
            other => f.write_str(other.variant()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::TextList(a), Self::TextList(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Activity(a), Self::Activity(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Match(a), Self::Match(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Capture(a), Self::Capture(b)) => a == b,
            (Self::Captures(a), Self::Captures(b)) => a == b,
            (Self::Recognition(a), Self::Recognition(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Intent(a), Self::Intent(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            (Self::Entities(a), Self::Entities(b)) => a == b,
            // one engine-owned token per pass
            (Self::Cancellation(_), Self::Cancellation(_)) => true,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Absent, Self::Absent) => true,
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}
