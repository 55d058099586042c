use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::gate::{settle, SessionGate};
use crate::api::{CallContext, SessionChecks};
use crate::config::SessionConfig;
use crate::model::{GateState, Requirement, Session};

#[derive(Debug, Clone, Copy)]
struct Cached {
    session: Session,
    verified_at: Instant,
}

/// Application-wide session state. Sessions are keyed by the value of the
/// credential cookie and are only cached when both checks gave a definitive
/// answer.
pub struct SessionContext<P> {
    checks: P,
    cookie_name: String,
    ttl: Duration,
    max_entries: usize,
    cache: RwLock<HashMap<String, Cached>>,
}

impl<P: SessionChecks> SessionContext<P> {
    pub fn new(checks: P, cookie_name: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            checks,
            cookie_name: cookie_name.into(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            max_entries: config.max_entries.max(1),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn checks(&self) -> &P {
        &self.checks
    }

    pub fn gate(&self) -> SessionGate<'_, P> {
        SessionGate::new(&self.checks)
    }

    fn key(&self, ctx: &CallContext) -> Option<String> {
        ctx.cookie_value(&self.cookie_name).map(str::to_string)
    }

    /// Cached session if fresh, otherwise a server-verified one.
    pub async fn get_session(&self, ctx: &CallContext) -> Session {
        let key = self.key(ctx);
        if let Some(k) = &key {
            if let Some(session) = self.lookup(k).await {
                return session;
            }
        }
        self.derive(ctx, key).await
    }

    /// Drop whatever is cached for this visitor and ask the backend again.
    pub async fn refresh(&self, ctx: &CallContext) -> Session {
        let key = self.key(ctx);
        if let Some(k) = &key {
            self.invalidate_key(k).await;
        }
        self.derive(ctx, key).await
    }

    pub async fn invalidate(&self, ctx: &CallContext) {
        if let Some(k) = self.key(ctx) {
            self.invalidate_key(&k).await;
        }
    }

    pub async fn invalidate_key(&self, key: &str) {
        self.cache.write().await.remove(key);
    }

    /// Gate a page through the cache.
    pub async fn evaluate(&self, ctx: &CallContext, requirement: Requirement) -> GateState {
        settle(self.get_session(ctx).await, requirement)
    }

    #[cfg(test)]
    pub(crate) async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup(&self, key: &str) -> Option<Session> {
        if self.ttl.is_zero() {
            return None;
        }
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|c| c.verified_at.elapsed() < self.ttl)
            .map(|c| c.session)
    }

    async fn derive(&self, ctx: &CallContext, key: Option<String>) -> Session {
        let verdict = self.gate().inspect(ctx).await;
        if let (Some(key), true) = (key, verdict.definitive) {
            self.store(key, verdict.session).await;
        }
        verdict.session
    }

    async fn store(&self, key: String, session: Session) {
        if self.ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.write().await;
        if cache.len() >= self.max_entries && !cache.contains_key(&key) {
            let ttl = self.ttl;
            cache.retain(|_, c| c.verified_at.elapsed() < ttl);
            if cache.len() >= self.max_entries {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, c)| c.verified_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    cache.remove(&oldest);
                }
            }
        }
        cache.insert(
            key,
            Cached {
                session,
                verified_at: Instant::now(),
            },
        );
    }
}
