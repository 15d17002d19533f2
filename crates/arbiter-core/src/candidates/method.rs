//! MethodScorable - handler を束縛できたら score を持つ candidate
//!
//! score は `Binding` そのもの。overload group では `BindingComparer` で
//! 比べられ、より具体的なシグネチャが勝ちます。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bind::{Binding, Method, try_bind};
use crate::domain::DispatchError;
use crate::ports::ResolverRef;
use crate::scorable::{Scorable, ScorableRef};

pub struct MethodScorable {
    method: Arc<Method>,
}

impl MethodScorable {
    pub fn new(method: Arc<Method>) -> Self {
        Self { method }
    }

    pub fn shared(method: Arc<Method>) -> ScorableRef<ResolverRef, Binding> {
        Arc::new(Self::new(method))
    }
}

#[async_trait]
impl Scorable<ResolverRef, Binding> for MethodScorable {
    type State = Binding;

    async fn prepare(
        &self,
        item: &ResolverRef,
        token: &CancellationToken,
    ) -> Result<Option<Binding>, DispatchError> {
        if token.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        Ok(try_bind(&self.method, item.as_ref(), token))
    }

    fn has_score(&self, _item: &ResolverRef, _state: &Binding) -> bool {
        true
    }

    fn get_score(&self, _item: &ResolverRef, state: &Binding) -> Result<Binding, DispatchError> {
        Ok(state.clone())
    }

    async fn post(
        &self,
        _item: &ResolverRef,
        state: &Binding,
        token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        state.invoke(token).await
    }

    fn describe(&self) -> String {
        self.method.name().to_string()
    }
}
