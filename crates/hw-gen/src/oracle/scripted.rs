//! An oracle that replays canned responses.

use std::collections::VecDeque;

use crate::cancel::CancelToken;
use crate::error::{GenError, GenResult};

use super::{Decision, DecisionOracle, OracleRequest};

/// One canned response.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// A ready decision.
    Decision(Decision),
    /// Raw response text, parsed with [`Decision::from_json`].
    Raw(String),
    /// A transport failure.
    Fail(String),
}

/// Replays responses in order, then answers with empty decisions.
///
/// Every request is kept so callers can inspect what the session sent.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: VecDeque<ScriptedResponse>,
    requests: Vec<OracleRequest>,
    cancel_on_call: Option<(usize, CancelToken)>,
}

impl ScriptedOracle {
    /// Replay the given decisions.
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            responses: decisions.into_iter().map(ScriptedResponse::Decision).collect(),
            ..Self::default()
        }
    }

    /// Queue another response.
    pub fn push(&mut self, response: ScriptedResponse) {
        self.responses.push_back(response);
    }

    /// Trip `token` while answering call number `call` (1-based), the way an
    /// external observer would cancel during an in-flight request.
    pub fn cancel_on_call(mut self, call: usize, token: CancelToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> &[OracleRequest] {
        &self.requests
    }

    /// Responses not yet replayed.
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }

    fn answer(&mut self, request: &OracleRequest) -> GenResult<Decision> {
        self.requests.push(request.clone());
        if let Some((call, token)) = &self.cancel_on_call {
            if *call == self.requests.len() {
                token.cancel();
            }
        }
        match self.responses.pop_front() {
            Some(ScriptedResponse::Decision(d)) => Ok(d),
            Some(ScriptedResponse::Raw(text)) => Decision::from_json(&text),
            Some(ScriptedResponse::Fail(reason)) => Err(GenError::Oracle(reason)),
            None => Ok(Decision::default()),
        }
    }
}

impl DecisionOracle for ScriptedOracle {
    fn decide(
        &mut self,
        request: &OracleRequest,
    ) -> impl Future<Output = GenResult<Decision>> + Send {
        let result = self.answer(request);
        async move { result }
    }
}
