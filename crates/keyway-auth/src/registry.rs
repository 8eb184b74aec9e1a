//! Auth handler registry.

use crate::config::AuthConfig;
use crate::handler::BoxedAuthHandler;
use crate::middleware::AuthMiddleware;
use crate::model::AuthServer;
use crate::pipeline::RequestPipeline;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Mapping from auth type name to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, BoxedAuthHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handler, returning the one it replaced.
    pub fn insert(
        &self,
        type_name: impl Into<String>,
        handler: BoxedAuthHandler,
    ) -> Option<BoxedAuthHandler> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.into(), handler)
    }

    /// Get a handler by type name.
    pub fn get(&self, type_name: &str) -> Option<BoxedAuthHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()
    }

    /// All handlers, sorted by type name.
    pub fn list(&self) -> Vec<(String, BoxedAuthHandler)> {
        let mut handlers: Vec<_> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, handler)| (name.clone(), handler.clone()))
            .collect();
        handlers.sort_by(|a, b| a.0.cmp(&b.0));
        handlers
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the handler that serves an auth server.
    ///
    /// Tries, in order: a handler registered under the server name itself,
    /// one registered under the server's `auth_type`, and for a configured
    /// server the only registered handler when there is exactly one.
    pub fn resolve(
        &self,
        auth_server_name: &str,
        auth_server: Option<&AuthServer>,
    ) -> Option<BoxedAuthHandler> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(handler) = handlers.get(auth_server_name) {
            return Some(handler.clone());
        }

        if let Some(handler) = auth_server
            .and_then(|s| s.auth_type.as_deref())
            .and_then(|t| handlers.get(t))
        {
            return Some(handler.clone());
        }

        if auth_server.is_some() && handlers.len() == 1 {
            return handlers.values().next().cloned();
        }

        None
    }
}

/// The authentication subsystem for one process.
///
/// Owns the handler registry and installs [`AuthMiddleware`] into the
/// request pipeline the first time a handler is registered.
pub struct AuthSystem {
    registry: Arc<HandlerRegistry>,
    config: Arc<AuthConfig>,
    pipeline: Arc<dyn RequestPipeline>,
    middleware_installed: AtomicBool,
}

impl AuthSystem {
    pub fn new(config: Arc<AuthConfig>, pipeline: Arc<dyn RequestPipeline>) -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            config,
            pipeline,
            middleware_installed: AtomicBool::new(false),
        }
    }

    /// Register a handler for an auth type name.
    ///
    /// The type name may be empty. Registering a name again replaces the
    /// previous handler.
    pub fn register(&self, type_name: impl Into<String>, handler: BoxedAuthHandler) {
        if self
            .middleware_installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.pipeline.use_request(Arc::new(AuthMiddleware::new(
                self.registry.clone(),
                self.config.clone(),
            )));
            debug!("Installed auth middleware");
        }

        let type_name = type_name.into();
        if self.registry.insert(type_name.clone(), handler).is_some() {
            debug!(type_name = %type_name, "Replaced auth handler");
        } else {
            debug!(type_name = %type_name, "Registered auth handler");
        }
    }

    /// Get the handler registered under a type name.
    pub fn lookup(&self, type_name: &str) -> Option<BoxedAuthHandler> {
        self.registry.get(type_name)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for AuthSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSystem")
            .field("handlers", &self.registry.len())
            .field(
                "middleware_installed",
                &self.middleware_installed.load(Ordering::Acquire),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAuthHandler, RecordingPipeline};
    use crate::model::{Credential, Profile, TokenPayload};

    fn handler(token: &str) -> Arc<MockAuthHandler> {
        Arc::new(MockAuthHandler::new(TokenPayload::new("c", "i", token)))
    }

    fn system() -> (AuthSystem, Arc<RecordingPipeline>) {
        let pipeline = Arc::new(RecordingPipeline::new());
        let config = Arc::new(AuthConfig::in_memory("default"));
        (AuthSystem::new(config, pipeline.clone()), pipeline)
    }

    #[test]
    fn test_last_registration_wins() {
        let (system, _) = system();
        let first = handler("first");
        let second = handler("second");

        system.register("oidc", first.clone());
        system.register("oidc", second.clone());

        let found = system.lookup("oidc").unwrap();
        let second: BoxedAuthHandler = second;
        assert!(Arc::ptr_eq(&found, &second));
        assert_eq!(system.registry().len(), 1);
    }

    #[test]
    fn test_middleware_installed_once() {
        let (system, pipeline) = system();
        assert_eq!(pipeline.install_count(), 0);

        system.register("oidc", handler("a"));
        system.register("oidc", handler("b"));
        system.register("api-key", handler("c"));
        system.register("", handler("d"));

        assert_eq!(pipeline.install_count(), 1);
    }

    #[test]
    fn test_middleware_installed_once_across_threads() {
        let (system, pipeline) = system();
        let system = Arc::new(system);

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let system = system.clone();
                std::thread::spawn(move || system.register(format!("type-{i}"), handler("t")))
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(pipeline.install_count(), 1);
        assert_eq!(system.registry().len(), 8);
    }

    fn request() -> reqwest::Request {
        reqwest::Client::new()
            .get("http://localhost/items")
            .build()
            .unwrap()
    }

    async fn bind_default_profile(system: &AuthSystem) {
        let config = system.config();
        config
            .insert_auth_server(
                "example-com",
                &AuthServer {
                    issuer: "i".into(),
                    client_id: "c".into(),
                    auth_type: None,
                },
            )
            .await
            .unwrap();
        config
            .insert_profile(
                "default",
                &Profile {
                    auth_server_name: "example-com".into(),
                    ..Profile::unbound("default")
                },
            )
            .await
            .unwrap();
        config
            .update_credentials_token(
                "work",
                &Credential {
                    auth_server_name: "example-com".into(),
                    token_payload: TokenPayload::new("c", "i", "tok"),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_installed_middleware_decorates_dispatched_requests() {
        let (system, pipeline) = system();
        bind_default_profile(&system).await;
        system.register("oidc", handler("unused"));

        pipeline.dispatch(request()).await.unwrap();

        let dispatched = pipeline.take_dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(
            dispatched[0].headers()[reqwest::header::AUTHORIZATION],
            "Bearer tok"
        );
        assert_eq!(pipeline.dispatched_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_stops_dispatch() {
        let (system, pipeline) = system();
        bind_default_profile(&system).await;
        let rejecting =
            Arc::new(MockAuthHandler::new(TokenPayload::new("c", "i", "t")).rejecting_requests());
        system.register("oidc", rejecting.clone());

        let err = pipeline.dispatch(request()).await.unwrap_err();

        assert!(matches!(
            err,
            crate::AuthError::RequestAuth(crate::RequestAuthError::Invalid(_))
        ));
        assert_eq!(rejecting.request_calls(), 1);
        assert_eq!(pipeline.dispatched_count(), 0);
    }

    #[test]
    fn test_lookup_missing() {
        let (system, _) = system();
        assert!(system.lookup("oidc").is_none());
    }

    #[test]
    fn test_resolve_order() {
        let registry = HandlerRegistry::new();
        let by_name = handler("by-name");
        let by_type = handler("by-type");
        registry.insert("example-com", by_name.clone());
        registry.insert("oidc", by_type.clone());

        let server = AuthServer {
            issuer: "i".into(),
            client_id: "c".into(),
            auth_type: Some("oidc".into()),
        };

        let by_name: BoxedAuthHandler = by_name;
        let by_type: BoxedAuthHandler = by_type;
        assert!(Arc::ptr_eq(
            &registry.resolve("example-com", Some(&server)).unwrap(),
            &by_name
        ));
        assert!(Arc::ptr_eq(
            &registry.resolve("other", Some(&server)).unwrap(),
            &by_type
        ));
        // Two handlers and no match.
        assert!(registry.resolve("other", None).is_none());
    }

    #[test]
    fn test_resolve_sole_handler() {
        let registry = HandlerRegistry::new();
        let only: BoxedAuthHandler = handler("only");
        registry.insert("oidc", only.clone());

        let server = AuthServer {
            issuer: "i".into(),
            client_id: "c".into(),
            auth_type: None,
        };

        assert!(Arc::ptr_eq(
            &registry.resolve("example-com", Some(&server)).unwrap(),
            &only
        ));
        // Servers that are not configured never fall back.
        assert!(registry.resolve("not-configured", None).is_none());
        // An unbound profile only matches the empty type name.
        assert!(registry.resolve("", None).is_none());

        registry.insert("", only.clone());
        assert!(registry.resolve("", None).is_some());
    }

    #[test]
    fn test_list_sorted() {
        let registry = HandlerRegistry::new();
        registry.insert("b", handler("b"));
        registry.insert("a", handler("a"));

        let names: Vec<_> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
