//! NullScorable - 決してスコアを持たない candidate
//!
//! 空の fold の結果です。fold は `is_null` な candidate を取り除きます。

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::contract::{Payload, Scorable, ScorableRef};
use crate::domain::DispatchError;

pub struct NullScorable<Item, Score> {
    _marker: PhantomData<fn() -> (Item, Score)>,
}

impl<Item, Score> NullScorable<Item, Score> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Item, Score> Default for NullScorable<Item, Score> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Item: Payload, Score: Payload> Scorable<Item, Score> for NullScorable<Item, Score> {
    type State = ();

    async fn prepare(
        &self,
        _item: &Item,
        _token: &CancellationToken,
    ) -> Result<Option<()>, DispatchError> {
        Ok(None)
    }

    fn has_score(&self, _item: &Item, _state: &()) -> bool {
        false
    }

    fn get_score(&self, _item: &Item, _state: &()) -> Result<Score, DispatchError> {
        Err(DispatchError::protocol("the null scorable has no score"))
    }

    async fn post(
        &self,
        _item: &Item,
        _state: &(),
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        Err(DispatchError::protocol("the null scorable cannot post"))
    }

    fn is_null(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "null".to_string()
    }
}

pub fn null_scorable<Item: Payload, Score: Payload>() -> ScorableRef<Item, Score> {
    Arc::new(NullScorable::<Item, Score>::new())
}
