//! Outgoing request pipeline.
//!
//! A pipeline runs its request middleware in installation order before a
//! request is sent. The first middleware to fail stops the chain and the
//! request is never dispatched.

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A pre-send hook.
#[async_trait]
pub trait RequestMiddleware: Send + Sync {
    /// Inspect or modify the request. Returning an error aborts it.
    async fn on_request(&self, request: &mut reqwest::Request) -> AuthResult<()>;
}

/// Somewhere request middleware can be installed.
pub trait RequestPipeline: Send + Sync {
    /// Append a middleware to the chain.
    fn use_request(&self, middleware: Arc<dyn RequestMiddleware>);
}

/// Ordered middleware chain.
#[derive(Default)]
pub struct MiddlewareChain {
    middleware: RwLock<Vec<Arc<dyn RequestMiddleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, middleware: Arc<dyn RequestMiddleware>) {
        self.middleware
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every middleware against the request, stopping at the first error.
    pub async fn run(&self, request: &mut reqwest::Request) -> AuthResult<()> {
        // Snapshot so the lock is not held across await points.
        let chain: Vec<_> = self
            .middleware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for middleware in chain {
            middleware.on_request(request).await?;
        }
        Ok(())
    }
}

/// The HTTP client used for all outgoing requests.
pub struct HttpPipeline {
    client: reqwest::Client,
    chain: MiddlewareChain,
}

impl HttpPipeline {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            chain: MiddlewareChain::new(),
        }
    }

    /// Start building a request with the underlying client.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Run the middleware chain, then send the request.
    pub async fn send(&self, mut request: reqwest::Request) -> AuthResult<reqwest::Response> {
        self.chain.run(&mut request).await?;

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        self.client.execute(request).await.map_err(AuthError::from)
    }

    /// Build and send a GET request.
    pub async fn get(&self, url: &str) -> AuthResult<reqwest::Response> {
        let request = self.request(reqwest::Method::GET, url).build()?;
        self.send(request).await
    }
}

impl Default for HttpPipeline {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl RequestPipeline for HttpPipeline {
    fn use_request(&self, middleware: Arc<dyn RequestMiddleware>) {
        self.chain.push(middleware);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestAuthError;
    use std::sync::Mutex;

    struct Tag(&'static str, Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl RequestMiddleware for Tag {
        async fn on_request(&self, _request: &mut reqwest::Request) -> AuthResult<()> {
            self.1.lock().unwrap().push(self.0);
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl RequestMiddleware for Fail {
        async fn on_request(&self, _request: &mut reqwest::Request) -> AuthResult<()> {
            Err(RequestAuthError::Invalid("nope".into()).into())
        }
    }

    fn request() -> reqwest::Request {
        reqwest::Client::new()
            .get("http://localhost/")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new();
        chain.push(Arc::new(Tag("first", seen.clone())));
        chain.push(Arc::new(Tag("second", seen.clone())));

        chain.run(&mut request()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new();
        chain.push(Arc::new(Fail));
        chain.push(Arc::new(Tag("after", seen.clone())));

        let err = chain.run(&mut request()).await.unwrap_err();
        assert!(matches!(err, AuthError::RequestAuth(RequestAuthError::Invalid(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_use_request_appends() {
        let pipeline = HttpPipeline::default();
        assert!(pipeline.chain.is_empty());
        pipeline.use_request(Arc::new(Fail));
        assert_eq!(pipeline.chain.len(), 1);
    }
}
