//! Test doubles for auth handlers and request pipelines.

use crate::error::{AuthResult, FlowError, RequestAuthError};
use crate::handler::{AuthHandler, FlowContext, RequestContext};
use crate::model::TokenPayload;
use crate::pipeline::{MiddlewareChain, RequestMiddleware, RequestPipeline};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A handler that returns a fixed token and records how it was used.
///
/// Requests are decorated with `Authorization: Bearer <access_token>` of
/// the credential the middleware selected.
pub struct MockAuthHandler {
    flow_result: Result<TokenPayload, String>,
    profile_keys: Vec<String>,
    reject_requests: bool,
    flow_calls: AtomicUsize,
    request_calls: AtomicUsize,
    last_credential: Mutex<Option<String>>,
}

impl MockAuthHandler {
    /// Create a handler whose flow returns `token`.
    pub fn new(token: TokenPayload) -> Self {
        Self {
            flow_result: Ok(token),
            profile_keys: Vec::new(),
            reject_requests: false,
            flow_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            last_credential: Mutex::new(None),
        }
    }

    /// Create a handler whose flow always fails.
    pub fn failing_flow(message: impl Into<String>) -> Self {
        Self {
            flow_result: Err(message.into()),
            ..Self::new(TokenPayload::new("", "", ""))
        }
    }

    /// Fail every request.
    pub fn rejecting_requests(mut self) -> Self {
        self.reject_requests = true;
        self
    }

    /// Declare profile keys.
    pub fn with_profile_keys(mut self, keys: &[&str]) -> Self {
        self.profile_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Number of times the flow ran.
    pub fn flow_calls(&self) -> usize {
        self.flow_calls.load(Ordering::SeqCst)
    }

    /// Number of requests seen.
    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    /// Name of the credential used for the most recent request.
    pub fn last_credential(&self) -> Option<String> {
        self.last_credential.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AuthHandler for MockAuthHandler {
    async fn execute_flow(&self, _ctx: &FlowContext<'_>) -> Result<TokenPayload, FlowError> {
        self.flow_calls.fetch_add(1, Ordering::SeqCst);
        self.flow_result.clone().map_err(FlowError::Failed)
    }

    fn profile_keys(&self) -> Vec<String> {
        self.profile_keys.clone()
    }

    async fn on_request(
        &self,
        ctx: &RequestContext<'_>,
        request: &mut reqwest::Request,
    ) -> Result<(), RequestAuthError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_requests {
            return Err(RequestAuthError::Invalid("rejected by mock".to_string()));
        }

        let (name, token) = ctx.require_token()?;
        *self.last_credential.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());

        let value = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|e| RequestAuthError::Invalid(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// A pipeline with no transport.
///
/// Counts middleware installations and records the requests that made it
/// through the chain.
#[derive(Default)]
pub struct RecordingPipeline {
    chain: MiddlewareChain,
    installs: AtomicUsize,
    dispatched: Mutex<Vec<reqwest::Request>>,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `use_request` was called.
    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// Run the chain and, if it passes, record the request as dispatched.
    pub async fn dispatch(&self, mut request: reqwest::Request) -> AuthResult<()> {
        self.chain.run(&mut request).await?;
        self.dispatched.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        Ok(())
    }

    /// Number of requests that passed the chain.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Take the recorded requests.
    pub fn take_dispatched(&self) -> Vec<reqwest::Request> {
        std::mem::take(&mut *self.dispatched.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl RequestPipeline for RecordingPipeline {
    fn use_request(&self, middleware: Arc<dyn RequestMiddleware>) {
        self.installs.fetch_add(1, Ordering::SeqCst);
        self.chain.push(middleware);
    }
}
