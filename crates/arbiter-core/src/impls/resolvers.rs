//! Root / ambient resolvers
//!
//! dispatch pass ごとに次の順で chain を組み立てます。
//!
//! ```text
//! ActivityResolver → ServiceResolver → NullResolver
//! ```

use std::sync::Arc;

use crate::domain::types::{self, TypeTag};
use crate::domain::{Activity, Value};
use crate::ports::{Resolver, ResolverRef};

/// The end of every chain; knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl Resolver for NullResolver {
    fn try_resolve(&self, _ty: &TypeTag, _tag: Option<&str>) -> Option<Value> {
        None
    }
}

/// An ambient value registered under a type and an optional tag.
#[derive(Debug, Clone)]
pub struct Service {
    pub ty: &'static TypeTag,
    pub tag: Option<String>,
    pub value: Value,
}

impl Service {
    pub fn new(ty: &'static TypeTag, value: Value) -> Self {
        Self {
            ty,
            tag: None,
            value,
        }
    }

    pub fn tagged(ty: &'static TypeTag, tag: impl Into<String>, value: Value) -> Self {
        Self {
            ty,
            tag: Some(tag.into()),
            value,
        }
    }

    fn answers(&self, ty: &TypeTag, tag: Option<&str>) -> bool {
        self.tag.as_deref() == tag && ty.is_assignable_from(self.ty)
    }
}

/// Answers from a fixed list of services, first registration wins.
pub struct ServiceResolver {
    services: Vec<Service>,
    inner: ResolverRef,
}

impl ServiceResolver {
    pub fn new(services: Vec<Service>, inner: ResolverRef) -> Self {
        Self { services, inner }
    }
}

impl Resolver for ServiceResolver {
    fn try_resolve(&self, ty: &TypeTag, tag: Option<&str>) -> Option<Value> {
        self.services
            .iter()
            .find(|s| s.answers(ty, tag))
            .map(|s| s.value.clone())
            .or_else(|| self.inner.try_resolve(ty, tag))
    }
}

/// Exposes the current activity and its text payload.
pub struct ActivityResolver {
    activity: Arc<Activity>,
    inner: ResolverRef,
}

impl ActivityResolver {
    pub fn new(activity: Arc<Activity>, inner: ResolverRef) -> Self {
        Self { activity, inner }
    }
}

impl Resolver for ActivityResolver {
    fn try_resolve(&self, ty: &TypeTag, tag: Option<&str>) -> Option<Value> {
        if tag.is_none() {
            if ty.is_assignable_from(self.activity.type_tag()) {
                return Some(Value::Activity(Arc::clone(&self.activity)));
            }
            if *ty == types::TEXT {
                if let Some(text) = &self.activity.text {
                    return Some(Value::Text(text.clone()));
                }
            }
        }
        self.inner.try_resolve(ty, tag)
    }
}
