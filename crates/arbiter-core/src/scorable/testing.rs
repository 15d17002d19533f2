//! Probe scorable for lifecycle tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::contract::{Scorable, ScorableRef};
use crate::domain::DispatchError;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records every lifecycle call as `"<phase>:<name>"`.
#[derive(Clone)]
pub struct Probe {
    name: &'static str,
    score: Option<f64>,
    log: Log,
    decline: bool,
    fail_prepare: bool,
    fail_post: bool,
    fail_done: bool,
}

impl Probe {
    pub fn scoring(name: &'static str, score: f64, log: &Log) -> Self {
        Self {
            name,
            score: Some(score),
            log: Arc::clone(log),
            decline: false,
            fail_prepare: false,
            fail_post: false,
            fail_done: false,
        }
    }

    /// Prepares fine but never has a score.
    pub fn silent(name: &'static str, log: &Log) -> Self {
        Self {
            score: None,
            ..Self::scoring(name, 0.0, log)
        }
    }

    /// Returns `None` from prepare.
    pub fn declining(name: &'static str, log: &Log) -> Self {
        Self {
            decline: true,
            ..Self::silent(name, log)
        }
    }

    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    pub fn failing_post(mut self) -> Self {
        self.fail_post = true;
        self
    }

    pub fn failing_done(mut self) -> Self {
        self.fail_done = true;
        self
    }

    pub fn shared(self) -> ScorableRef<&'static str, f64> {
        Arc::new(self)
    }

    fn record(&self, phase: &str) {
        self.log.lock().unwrap().push(format!("{phase}:{}", self.name));
    }
}

#[async_trait]
impl Scorable<&'static str, f64> for Probe {
    type State = ();

    async fn prepare(
        &self,
        _item: &&'static str,
        _token: &CancellationToken,
    ) -> Result<Option<()>, DispatchError> {
        self.record("prepare");
        if self.fail_prepare {
            return Err(DispatchError::other(format!("prepare failed: {}", self.name)));
        }
        Ok((!self.decline).then_some(()))
    }

    fn has_score(&self, _item: &&'static str, _state: &()) -> bool {
        self.score.is_some()
    }

    fn get_score(&self, _item: &&'static str, _state: &()) -> Result<f64, DispatchError> {
        self.score
            .ok_or_else(|| DispatchError::protocol("probe has no score"))
    }

    async fn post(
        &self,
        _item: &&'static str,
        _state: &(),
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.record("post");
        if self.fail_post {
            return Err(DispatchError::other(format!("post failed: {}", self.name)));
        }
        Ok(())
    }

    async fn done(
        &self,
        _item: &&'static str,
        _state: Option<()>,
        _token: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.record("done");
        if self.fail_done {
            return Err(DispatchError::other(format!("done failed: {}", self.name)));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }
}
