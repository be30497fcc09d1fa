use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Event, Id, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry, layer::Context, registry::LookupSpan};

/// A captured log event
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    /// The formatted message, if the event had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Event fields plus fields inherited from enclosing spans
    pub fields: HashMap<String, serde_json::Value>,
    pub timestamp_ns: u128,
}

impl CapturedEvent {
    /// Field value as a string, for string and formatted fields
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Shared storage for captured events
#[derive(Debug, Clone, Default)]
pub struct SharedEventStorage {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl SharedEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }

    /// Snapshot of everything captured so far
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// Events whose message equals `message`
    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.message.as_deref() == Some(message)).collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

/// A tracing layer that records events in memory
pub struct InMemoryEventLayer {
    storage: SharedEventStorage,
}

impl InMemoryEventLayer {
    pub fn new(storage: SharedEventStorage) -> Self {
        Self { storage }
    }
}

/// A subscriber that only records into `storage`, for use with
/// `tracing::subscriber::set_default` in tests.
pub fn memory_subscriber(storage: SharedEventStorage) -> impl Subscriber + Send + Sync {
    Registry::default().with(InMemoryEventLayer::new(storage))
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

impl<S> Layer<S> for InMemoryEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        // Inherit parent fields not overridden here
        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for (key, value) in &parent_fields.0 {
                    fields.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;
        let message = fields.remove("message").and_then(|v| v.as_str().map(str::to_string));

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                    for (key, value) in &span_fields.0 {
                        fields.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        let metadata = event.metadata();
        self.storage.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
            timestamp_ns: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, info_span, warn};

    #[test]
    fn captures_level_message_and_fields() {
        let storage = SharedEventStorage::new();
        tracing::subscriber::with_default(memory_subscriber(storage.clone()), || {
            warn!(reference = %"7.txt", rows = 3u64, "skipping candidate");
        });

        let events = storage.with_message("skipping candidate");
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level, "WARN");
        assert_eq!(event.field_str("reference"), Some("7.txt"));
        assert_eq!(event.fields["rows"], serde_json::json!(3));
        assert!(event.timestamp_ns > 0);
    }

    #[test]
    fn events_inherit_span_fields() {
        let storage = SharedEventStorage::new();
        tracing::subscriber::with_default(memory_subscriber(storage.clone()), || {
            let outer = info_span!("evaluate", query_id = "Q1");
            let _outer = outer.enter();
            let inner = info_span!("method", method = "BM25");
            let _inner = inner.enter();
            info!(query_id = "override", "scored");
        });

        let event = &storage.events()[0];
        assert_eq!(event.field_str("method"), Some("BM25"));
        assert_eq!(event.field_str("query_id"), Some("override"));
    }

    #[test]
    fn clear_empties_the_storage() {
        let storage = SharedEventStorage::new();
        tracing::subscriber::with_default(memory_subscriber(storage.clone()), || {
            info!("one");
            info!("two");
        });
        assert_eq!(storage.len(), 2);
        storage.clear();
        assert!(storage.is_empty());
    }
}
