//! Per-engine telemetry collector.
//!
//! The collector fans API calls, parameter changes, capability queries and
//! lifecycle transitions into a bounded history plus a broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::capability::InterfaceId;
use crate::config::TelemetryConfig;
use crate::error::{ErrorCode, EngineError};

pub mod events;

pub use events::{LifecyclePhase, MetricEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.channel_capacity, config.history_capacity)
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<MetricEvent>> {
        match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    pub fn record_api_call(&self, api: &str, result: &Result<(), EngineError>) {
        let code = crate::error::result_code(result);
        self.publish(MetricEvent::ApiCall {
            api: api.to_string(),
            code,
        });
        if let Err(err) = result {
            self.record_error(err, api);
        }
    }

    pub fn record_parameter_changed(&self, key: &str) {
        self.publish(MetricEvent::ParameterChanged {
            key: key.to_string(),
        });
    }

    pub fn record_capability_query(&self, interface: InterfaceId, granted: bool) {
        self.publish(MetricEvent::CapabilityQueried { interface, granted });
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.publish(MetricEvent::Lifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, err: &EngineError, context: &str) {
        self.publish(MetricEvent::Error {
            code: err.code(),
            context: context.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Stream view of [`subscribe`](Self::subscribe). Lagged receivers yield
    /// an error item instead of blocking the publisher.
    pub fn stream(&self) -> BroadcastStream<MetricEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}

impl std::fmt::Debug for TelemetryCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryCollector")
            .field("history_capacity", &self.history_capacity)
            .field("total_events", &self.total_events.load(Ordering::Relaxed))
            .finish()
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn history_is_bounded() {
        let collector = TelemetryCollector::new(8, 2);
        collector.record_parameter_changed("a");
        collector.record_parameter_changed("b");
        collector.record_parameter_changed("c");

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(
            snapshot.recent,
            vec![
                MetricEvent::ParameterChanged { key: "b".into() },
                MetricEvent::ParameterChanged { key: "c".into() },
            ]
        );
    }

    #[test]
    fn failed_api_call_records_error() {
        let collector = TelemetryCollector::default();
        collector.record_api_call("leave_channel", &Err(EngineError::NotInChannel));

        let snapshot = collector.snapshot();
        assert_eq!(
            snapshot.recent[0],
            MetricEvent::ApiCall {
                api: "leave_channel".into(),
                code: -113
            }
        );
        assert_eq!(
            snapshot.recent[1],
            MetricEvent::Error {
                code: 113,
                context: "leave_channel".into()
            }
        );
    }

    #[tokio::test]
    async fn stream_receives_published_events() {
        let collector = TelemetryCollector::default();
        let mut stream = collector.stream();

        collector.record_lifecycle(LifecyclePhase::Initialized);

        match stream.next().await {
            Some(Ok(MetricEvent::Lifecycle { phase, .. })) => {
                assert_eq!(phase, LifecyclePhase::Initialized)
            }
            other => panic!("unexpected stream item: {:?}", other),
        }
    }

    #[test]
    fn metric_events_serialize_tagged() {
        let json = serde_json::to_string(&MetricEvent::ParameterChanged { key: "k".into() }).unwrap();
        assert_eq!(json, "{\"type\":\"parameter_changed\",\"payload\":{\"key\":\"k\"}}");
    }
}
