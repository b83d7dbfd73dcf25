//! DI Container (§4.C): token-keyed provider registry with singleton / per-request /
//! per-injection scopes and cycle detection via a transient "currently resolving" set.
//!
//! Grounded in the sibling example's `BeanRegistry` (`beans.rs`: token identity +
//! declared-dependency list + cached instances, `BeanError::CyclicDependency` naming the
//! cycle), adapted from its TypeId-keyed auto-construction and ahead-of-time topological
//! sort onto the spec's explicit string-token model with DFS-based cycle detection at
//! resolution time, since the spec requires the "currently resolving" set behaviour
//! (§4.C) rather than a batch graph sort.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::DiError;

/// A resolved instance, type-erased; downcast with [`Container::get_as`].
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Request-local resolution map, created at request start and discarded at request end
/// (§5 Ordering guarantees (c)). This is the same map type `RequestContext::di_scope`
/// owns, so the executor can pass it straight through.
pub type RequestScope = HashMap<String, AnyArc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Singleton,
    PerRequest,
    PerInjection,
}

enum Ctor {
    Value(AnyArc),
    Factory(Arc<dyn Fn(&[AnyArc]) -> AnyArc + Send + Sync>),
}

struct ProviderRecord {
    dependencies: Vec<String>,
    scope: Scope,
    ctor: Ctor,
}

/// Registers tokens, resolves constructor dependencies, enforces scopes, detects
/// cycles (§4.C). Frozen once the application enters `SERVING` (§5 Shared-resource
/// policy).
pub struct Container {
    providers: HashMap<String, ProviderRecord>,
    singletons: Mutex<HashMap<String, AnyArc>>,
    closed: RwLock<bool>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            singletons: Mutex::new(HashMap::new()),
            closed: RwLock::new(false),
        }
    }

    /// Freezes the container; further [`register_value`](Self::register_value) /
    /// [`register_factory`](Self::register_factory) calls fail.
    pub fn close_for_registration(&self) {
        *self.closed.write().unwrap_or_else(|e| e.into_inner()) = true;
    }

    fn check_open(&self, token: &str) -> Result<(), DiError> {
        if *self.closed.read().unwrap_or_else(|e| e.into_inner()) {
            return Err(DiError::RegistrationClosed(token.to_string()));
        }
        Ok(())
    }

    /// Register a pre-built value under `token`. Dependency-free by construction.
    pub fn register_value<T: Any + Send + Sync>(&mut self, token: impl Into<String>, value: T) -> Result<(), DiError> {
        let token = token.into();
        self.check_open(&token)?;
        self.providers.insert(
            token,
            ProviderRecord {
                dependencies: Vec::new(),
                scope: Scope::Singleton,
                ctor: Ctor::Value(Arc::new(value)),
            },
        );
        Ok(())
    }

    /// Register a provider constructed from its resolved dependencies, in declaration
    /// order, by `build`.
    pub fn register_factory(
        &mut self,
        token: impl Into<String>,
        dependencies: Vec<String>,
        scope: Scope,
        build: impl Fn(&[AnyArc]) -> AnyArc + Send + Sync + 'static,
    ) -> Result<(), DiError> {
        let token = token.into();
        self.check_open(&token)?;
        self.providers.insert(
            token,
            ProviderRecord {
                dependencies,
                scope,
                ctor: Ctor::Factory(Arc::new(build)),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn has(&self, token: &str) -> bool {
        self.providers.contains_key(token)
    }

    /// Resolve `token`, consulting the request-local scope (if supplied), then the
    /// singleton cache, then the registered provider (§4.C Resolution algorithm).
    pub fn get(&self, token: &str, request_scope: Option<&mut RequestScope>) -> Result<AnyArc, DiError> {
        let mut resolving = Vec::new();
        let mut scope = request_scope;
        self.resolve(token, scope.as_deref_mut(), &mut resolving)
    }

    /// Typed convenience wrapper over [`get`](Self::get).
    pub fn get_as<T: Any + Send + Sync>(&self, token: &str, request_scope: Option<&mut RequestScope>) -> Result<Arc<T>, DiError> {
        self.get(token, request_scope)?
            .downcast::<T>()
            .map_err(|_| DiError::MissingProvider(format!("{token} (type mismatch)")))
    }

    fn resolve(
        &self,
        token: &str,
        mut request_scope: Option<&mut RequestScope>,
        resolving: &mut Vec<String>,
    ) -> Result<AnyArc, DiError> {
        if let Some(scope) = request_scope.as_deref() {
            if let Some(existing) = scope.get(token) {
                return Ok(existing.clone());
            }
        }
        if let Some(existing) = self.singletons.lock().unwrap_or_else(|e| e.into_inner()).get(token) {
            return Ok(existing.clone());
        }

        if resolving.contains(&token.to_string()) {
            let mut cycle = resolving.clone();
            cycle.push(token.to_string());
            return Err(DiError::Cycle(cycle));
        }

        let provider = self
            .providers
            .get(token)
            .ok_or_else(|| DiError::MissingProvider(token.to_string()))?;

        let instance = match &provider.ctor {
            Ctor::Value(v) => v.clone(),
            Ctor::Factory(build) => {
                resolving.push(token.to_string());
                let mut deps = Vec::with_capacity(provider.dependencies.len());
                for dep in &provider.dependencies {
                    deps.push(self.resolve(dep, request_scope.as_deref_mut(), resolving)?);
                }
                resolving.pop();
                build(&deps)
            }
        };

        match provider.scope {
            Scope::Singleton => {
                self.singletons
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(token.to_string(), instance.clone());
            }
            Scope::PerRequest => match request_scope.as_deref_mut() {
                Some(scope) => {
                    scope.insert(token.to_string(), instance.clone());
                }
                None => return Err(DiError::MissingRequestScope(token.to_string())),
            },
            Scope::PerInjection => {}
        }

        Ok(instance)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_is_identical_across_resolutions() {
        let mut c = Container::new();
        c.register_factory("svc", vec![], Scope::Singleton, |_| Arc::new(42i32)).unwrap();
        let a = c.get("svc", None).unwrap();
        let b = c.get("svc", None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn per_injection_is_distinct_each_time() {
        let mut c = Container::new();
        c.register_factory("svc", vec![], Scope::PerInjection, |_| Arc::new(42i32)).unwrap();
        let a = c.get("svc", None).unwrap();
        let b = c.get("svc", None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn per_request_is_shared_within_a_request_but_not_across() {
        let mut c = Container::new();
        c.register_factory("svc", vec![], Scope::PerRequest, |_| Arc::new(42i32)).unwrap();

        let mut scope1: RequestScope = HashMap::new();
        let a1 = c.get("svc", Some(&mut scope1)).unwrap();
        let a2 = c.get("svc", Some(&mut scope1)).unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));

        let mut scope2: RequestScope = HashMap::new();
        let b1 = c.get("svc", Some(&mut scope2)).unwrap();
        assert!(!Arc::ptr_eq(&a1, &b1));
    }

    #[test]
    fn per_request_without_a_scope_map_is_an_error() {
        let mut c = Container::new();
        c.register_factory("svc", vec![], Scope::PerRequest, |_| Arc::new(42i32)).unwrap();
        let err = c.get("svc", None).unwrap_err();
        assert!(matches!(err, DiError::MissingRequestScope(_)));
    }

    #[test]
    fn missing_provider_is_named() {
        let c = Container::new();
        let err = c.get("ghost", None).unwrap_err();
        assert!(matches!(err, DiError::MissingProvider(t) if t == "ghost"));
    }

    #[test]
    fn cycle_is_detected_and_named() {
        let mut c = Container::new();
        c.register_factory("a", vec!["b".to_string()], Scope::Singleton, |d| d[0].clone()).unwrap();
        c.register_factory("b", vec!["a".to_string()], Scope::Singleton, |d| d[0].clone()).unwrap();
        let err = c.get("a", None).unwrap_err();
        match err {
            DiError::Cycle(chain) => assert_eq!(chain, vec!["a".to_string(), "b".to_string(), "a".to_string()]),
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn dependencies_are_resolved_before_construction() {
        let mut c = Container::new();
        c.register_value("base", 10i32).unwrap();
        c.register_factory("derived", vec!["base".to_string()], Scope::Singleton, |deps| {
            let base = deps[0].downcast_ref::<i32>().unwrap();
            Arc::new(*base + 1)
        })
        .unwrap();
        let v = c.get_as::<i32>("derived", None).unwrap();
        assert_eq!(*v, 11);
    }

    #[test]
    fn registration_after_close_fails() {
        let mut c = Container::new();
        c.close_for_registration();
        let err = c.register_value("x", 1i32).unwrap_err();
        assert!(matches!(err, DiError::RegistrationClosed(_)));
    }
}
