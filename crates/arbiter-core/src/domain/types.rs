//! TypeTag - 値の「型」を表す静的な記述子
//!
//! Handler のパラメータは `(name, &'static TypeTag)` の組で宣言され、
//! Resolver は要求された TypeTag に代入可能な値だけを返します。
//!
//! # 学習ポイント
//! - static 同士の参照で親子関係（単一/多重継承）を表現する
//! - `is_assignable_from` は C# の `Type.IsAssignableFrom` と同じ向き
//!
//! # 定義例
//! ```ignore
//! static ANIMAL: TypeTag = TypeTag::root("animal");
//! static DOG_PARENTS: [&TypeTag; 1] = [&ANIMAL];
//! static DOG: TypeTag = TypeTag::new("dog", &DOG_PARENTS);
//!
//! assert!(ANIMAL.is_assignable_from(&DOG));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

/// A named type with zero or more parent types.
///
/// Two tags are equal when their names are equal, so names must be unique
/// within one handler set.
#[derive(Debug)]
pub struct TypeTag {
    name: &'static str,
    parents: &'static [&'static TypeTag],
}

impl TypeTag {
    pub const fn new(name: &'static str, parents: &'static [&'static TypeTag]) -> Self {
        Self { name, parents }
    }

    /// A tag without parents.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parents: &[] }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parents(&self) -> &'static [&'static TypeTag] {
        self.parents
    }

    /// True if a value of type `other` can be used where `self` is expected.
    pub fn is_assignable_from(&self, other: &TypeTag) -> bool {
        if self == other {
            return true;
        }
        other
            .parents
            .iter()
            .any(|parent| self.is_assignable_from(parent))
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 組み込みの TypeTag
// ────────────────────────────────────────────────────────────────────────────

/// Any activity, whatever its kind.
pub static ACTIVITY: TypeTag = TypeTag::root("activity");

static ACTIVITY_PARENTS: [&TypeTag; 1] = [&ACTIVITY];

/// An activity carrying a user message.
pub static MESSAGE_ACTIVITY: TypeTag = TypeTag::new("activity.message", &ACTIVITY_PARENTS);

/// A typing indicator.
pub static TYPING_ACTIVITY: TypeTag = TypeTag::new("activity.typing", &ACTIVITY_PARENTS);

pub static TEXT: TypeTag = TypeTag::root("text");
pub static TEXT_LIST: TypeTag = TypeTag::root("text.list");
pub static NUMBER: TypeTag = TypeTag::root("number");

/// Source text of the trigger pattern that matched.
pub static PATTERN: TypeTag = TypeTag::root("pattern");
pub static PATTERN_MATCH: TypeTag = TypeTag::root("pattern.match");
pub static CAPTURE: TypeTag = TypeTag::root("pattern.capture");
pub static CAPTURES: TypeTag = TypeTag::root("pattern.captures");

/// Id of the recognizer that produced the current recognition.
pub static RECOGNIZER: TypeTag = TypeTag::root("recognizer");
pub static RECOGNITION: TypeTag = TypeTag::root("recognition");
pub static INTENT: TypeTag = TypeTag::root("recognition.intent");
pub static ENTITY: TypeTag = TypeTag::root("recognition.entity");
pub static ENTITIES: TypeTag = TypeTag::root("recognition.entities");

/// Engine-owned cancellation signal; never answered by a resolver.
pub static CANCELLATION: TypeTag = TypeTag::root("cancellation");

/// The pass-scoped recognition cache.
pub static PASS_CACHE: TypeTag = TypeTag::root("pass.cache");
