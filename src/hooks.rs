//! Crawl lifecycle hooks
//!
//! Handlers are registered per event on a [`HookRegistry`] before the crawl
//! starts. Emitting an event runs every handler for it concurrently on the same
//! JSON payload. Each handler may return a JSON object; those objects are
//! shallow-merged onto the payload in registration order, so a later handler
//! wins on key conflicts. A handler that fails or panics is logged and its
//! result ignored.

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Named points in the crawl where handlers run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    BeforeEachCrawlCycle,
    BeforeUrlCrawled,
    AfterUrlCrawled,
    AfterPageDataCreated,
    BeforePagesToVisitUpdated,
    BeforeSaveStatus,
    AfterSaveFileRead,
    AfterSitemapLinksExtracted,
}

impl HookEvent {
    /// Event name as used in logs and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeEachCrawlCycle => "beforeEachCrawlCycle",
            Self::BeforeUrlCrawled => "beforeURLCrawled",
            Self::AfterUrlCrawled => "afterURLCrawled",
            Self::AfterPageDataCreated => "afterPageDataCreated",
            Self::BeforePagesToVisitUpdated => "beforePagesToVisitUpdated",
            Self::BeforeSaveStatus => "beforeSaveStatus",
            Self::AfterSaveFileRead => "afterSaveFileRead",
            Self::AfterSitemapLinksExtracted => "afterSitemapLinksExtracted",
        }
    }

    pub fn all() -> [HookEvent; 8] {
        [
            Self::BeforeEachCrawlCycle,
            Self::BeforeUrlCrawled,
            Self::AfterUrlCrawled,
            Self::AfterPageDataCreated,
            Self::BeforePagesToVisitUpdated,
            Self::BeforeSaveStatus,
            Self::AfterSaveFileRead,
            Self::AfterSitemapLinksExtracted,
        ]
    }

    /// Parses an event from its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler attached to one hook event
///
/// Returning `Ok(Some(object))` merges the object's keys onto the payload.
/// `Ok(None)` and non-object values leave the payload unchanged.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, payload: &Value) -> anyhow::Result<Option<Value>>;
}

/// Adapter that lets an async closure act as a [`HookHandler`]
struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> HookHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Value>>> + Send,
{
    async fn handle(&self, payload: &Value) -> anyhow::Result<Option<Value>> {
        (self.f)(payload.clone()).await
    }
}

/// Registry mapping each event to its handlers in registration order
#[derive(Default, Clone)]
pub struct HookRegistry {
    handlers: HashMap<HookEvent, Vec<Arc<dyn HookHandler>>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("HookRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an event
    pub fn on(&mut self, event: HookEvent, handler: Arc<dyn HookHandler>) -> &mut Self {
        self.handlers.entry(event).or_default().push(handler);
        self
    }

    /// Registers an async closure as a handler
    ///
    /// # Example
    ///
    /// ```
    /// use lookout::hooks::{HookEvent, HookRegistry};
    /// use serde_json::json;
    ///
    /// let mut hooks = HookRegistry::new();
    /// hooks.on_fn(HookEvent::BeforeUrlCrawled, |payload| async move {
    ///     println!("crawling {}", payload["url"]);
    ///     Ok(None)
    /// });
    /// ```
    pub fn on_fn<F, Fut>(&mut self, event: HookEvent, f: F) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        self.on(event, Arc::new(FnHandler { f }))
    }

    /// Number of handlers registered for an event
    pub fn handler_count(&self, event: HookEvent) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// Runs every handler for `event` and returns the merged payload
    ///
    /// With no handlers the payload is returned untouched.
    pub async fn emit(&self, event: HookEvent, payload: Value) -> Value {
        let Some(handlers) = self.handlers.get(&event).filter(|list| !list.is_empty()) else {
            return payload;
        };

        let results = join_all(
            handlers
                .iter()
                .map(|handler| AssertUnwindSafe(handler.handle(&payload)).catch_unwind()),
        )
        .await;

        let mut merged = payload;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(Some(Value::Object(update)))) => {
                    if let Value::Object(target) = &mut merged {
                        target.extend(update);
                    }
                }
                Ok(Ok(Some(Value::Null))) | Ok(Ok(None)) => {}
                Ok(Ok(Some(_))) => {
                    tracing::debug!(
                        "Hook handler #{} for '{}' returned a non-object value, ignoring",
                        index,
                        event
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!("Error in hook handler #{} for '{}': {:#}", index, event, e);
                }
                Err(panic) => {
                    tracing::warn!(
                        "Hook handler #{} for '{}' panicked: {}",
                        index,
                        event,
                        panic_message(&panic)
                    );
                }
            }
        }

        merged
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Reads a key back from a merged payload
///
/// Falls back to `original` when the key is missing or does not deserialize
/// into `T`, logging the latter.
pub fn read_back<T: DeserializeOwned>(
    payload: &mut Value,
    event: HookEvent,
    key: &str,
    original: T,
) -> T {
    let Some(value) = payload.get_mut(key).map(Value::take) else {
        return original;
    };

    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                "Hook payload key '{}' for '{}' has an unexpected shape, keeping original: {}",
                key,
                event,
                e
            );
            original
        }
    }
}
