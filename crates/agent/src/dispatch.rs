// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the dispatcher protocol.

use std::time::Duration;

use async_trait::async_trait;
use kk_core::Backoff;
use kk_wire::{Message, Request, Response};
use parking_lot::RwLock;

use crate::error::DispatchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest reply body quoted in a status error.
const BODY_QUOTE: usize = 200;

/// Sends one agent message and returns the dispatcher's reply.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, msg: Message) -> Result<Response, DispatchError>;

    /// Point later requests at a new server base URL.
    fn retarget(&self, _server: &str) {}
}

/// JSON over HTTP: every message is POSTed to `<server>/backend`.
pub struct HttpDispatcher {
    client: reqwest::Client,
    url: RwLock<String>,
    address: String,
    backoff: Backoff,
}

impl HttpDispatcher {
    pub fn new(server: &str, address: impl Into<String>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: RwLock::new(backend_url(server)),
            address: address.into(),
            backoff: Backoff::default(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn post(&self, request: &Request) -> Result<Response, DispatchError> {
        let url = self.url.read().clone();
        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let body: String = text.chars().take(BODY_QUOTE).collect();
            return Err(DispatchError::Status { status: status.as_u16(), body });
        }
        Ok(Response::parse(&body)?)
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn send(&self, msg: Message) -> Result<Response, DispatchError> {
        let name = msg.name();
        let request = Request { address: self.address.clone(), message: msg };
        tracing::debug!(msg = name, "sending to dispatcher");
        self.backoff.retry(name, DispatchError::is_transient, || self.post(&request)).await
    }

    fn retarget(&self, server: &str) {
        let url = backend_url(server);
        tracing::info!(%url, "dispatcher address changed");
        *self.url.write() = url;
    }
}

fn backend_url(server: &str) -> String {
    format!("{}/backend", server.trim_end_matches('/'))
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    use async_trait::async_trait;
    use kk_wire::{Message, Response, StepReport};
    use parking_lot::Mutex;

    use super::Dispatcher;
    use crate::error::DispatchError;

    enum Reply {
        Ok(Response),
        Status(u16),
    }

    #[derive(Default)]
    struct State {
        sent: Vec<Message>,
        queued: HashMap<&'static str, VecDeque<Reply>>,
        fallback: HashMap<&'static str, Response>,
        retargets: Vec<String>,
    }

    /// Records every message; replies come from per-message-name scripts.
    ///
    /// Queued replies are used once, in order; after that the fallback for
    /// the name (or an empty response) is returned.
    #[derive(Clone, Default)]
    pub struct FakeDispatcher {
        state: Arc<Mutex<State>>,
    }

    impl FakeDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, name: &'static str, response: Response) {
            self.state.lock().queued.entry(name).or_default().push_back(Reply::Ok(response));
        }

        pub fn fail(&self, name: &'static str, status: u16) {
            self.state.lock().queued.entry(name).or_default().push_back(Reply::Status(status));
        }

        pub fn always(&self, name: &'static str, response: Response) {
            self.state.lock().fallback.insert(name, response);
        }

        pub fn messages(&self) -> Vec<Message> {
            self.state.lock().sent.clone()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.state.lock().sent.iter().map(Message::name).collect()
        }

        /// Step reports in send order, as `(job_id, step_index, report)`.
        pub fn step_reports(&self) -> Vec<(u64, usize, StepReport)> {
            self.state
                .lock()
                .sent
                .iter()
                .filter_map(|m| match m {
                    Message::StepResult { job_id, step_index, result } => {
                        Some((*job_id, *step_index, result.clone()))
                    }
                    _ => None,
                })
                .collect()
        }

        /// Terminal step reports only.
        pub fn terminal_reports(&self) -> Vec<(u64, usize, StepReport)> {
            self.step_reports().into_iter().filter(|(_, _, r)| r.is_terminal()).collect()
        }

        pub fn retargets(&self) -> Vec<String> {
            self.state.lock().retargets.clone()
        }
    }

    #[async_trait]
    impl Dispatcher for FakeDispatcher {
        async fn send(&self, msg: Message) -> Result<Response, DispatchError> {
            let name = msg.name();
            let mut state = self.state.lock();
            state.sent.push(msg);
            match state.queued.get_mut(name).and_then(VecDeque::pop_front) {
                Some(Reply::Ok(r)) => Ok(r),
                Some(Reply::Status(status)) => {
                    Err(DispatchError::Status { status, body: "scripted failure".to_string() })
                }
                None => Ok(state.fallback.get(name).cloned().unwrap_or_default()),
            }
        }

        fn retarget(&self, server: &str) {
            self.state.lock().retargets.push(server.to_string());
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDispatcher;

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
