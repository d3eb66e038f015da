use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use crate::events::{EngineEvent, RtcEngineEventHandler};

type HandlerSlot = Arc<RwLock<Option<Arc<dyn RtcEngineEventHandler>>>>;

/// Producer side of the event queue. Cheap to clone.
///
/// Emitting never blocks. After the dispatcher shuts down, events are
/// dropped and `emit` returns `false`.
#[derive(Clone)]
pub struct EventSink {
    tx: Arc<RwLock<Option<mpsc::UnboundedSender<EngineEvent>>>>,
}

impl EventSink {
    fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            tx: Arc::new(RwLock::new(Some(tx))),
        }
    }

    /// A sink connected to nothing. Useful for driving a backend in isolation.
    pub fn detached() -> Self {
        Self {
            tx: Arc::new(RwLock::new(None)),
        }
    }

    pub fn emit(&self, event: EngineEvent) -> bool {
        let guard = match self.tx.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                log::trace!("[EventSink] dropping {} after shutdown", event.name());
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.tx.read() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn close(&self) {
        let mut guard = match self.tx.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Delivers queued events to the registered handler on a dedicated thread.
///
/// At most one handler is registered at a time. Registering a new one
/// replaces the old one for every event delivered afterwards.
pub struct EventDispatcher {
    handler: HandlerSlot,
    sink: EventSink,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_started: AtomicBool,
    thread_name: String,
    delivered: Arc<AtomicU64>,
}

impl EventDispatcher {
    pub fn new(thread_name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handler: Arc::new(RwLock::new(None)),
            sink: EventSink::new(tx),
            receiver: Mutex::new(Some(rx)),
            worker: Mutex::new(None),
            worker_started: AtomicBool::new(false),
            thread_name: thread_name.into(),
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Replace the registered handler, returning the previous one.
    pub fn set_handler(
        &self,
        handler: Option<Arc<dyn RtcEngineEventHandler>>,
    ) -> Option<Arc<dyn RtcEngineEventHandler>> {
        let mut slot = match self.handler.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *slot, handler)
    }

    pub fn handler(&self) -> Option<Arc<dyn RtcEngineEventHandler>> {
        match self.handler.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events handed to the handler slot so far (delivered or skipped for
    /// lack of a handler).
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Start the delivery thread. Events emitted earlier stay queued and are
    /// delivered once it runs. Calling this again is a no-op.
    pub fn start(&self) {
        if self
            .worker_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let rx = match self.receiver.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(rx) = rx else {
            return;
        };

        let handler = Arc::clone(&self.handler);
        let delivered = Arc::clone(&self.delivered);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_worker(rx, handler, delivered));

        match spawned {
            Ok(join) => {
                let mut worker = match self.worker.lock() {
                    Ok(worker) => worker,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *worker = Some(join);
            }
            Err(err) => {
                log::error!("[EventDispatcher] failed to spawn {}: {}", self.thread_name, err);
            }
        }
    }

    /// Close the queue, let the worker drain what is already queued, then
    /// join it.
    ///
    /// When called from a handler callback (on the worker itself) the join is
    /// skipped; the worker exits on its own once the queue is empty.
    pub fn shutdown(&self) {
        self.sink.close();

        let join = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match join {
            Some(join) if join.thread().id() == thread::current().id() => {
                log::debug!("[EventDispatcher] shutdown requested from the dispatch thread");
            }
            Some(join) => {
                if join.join().is_err() {
                    log::error!("[EventDispatcher] dispatch thread panicked");
                }
            }
            None => {
                // Never started: drop whatever was queued.
                if let Ok(mut receiver) = self.receiver.lock() {
                    receiver.take();
                }
            }
        }
    }

    pub fn is_dispatch_thread(&self) -> bool {
        self.worker_thread_id() == Some(thread::current().id())
    }

    fn worker_thread_id(&self) -> Option<ThreadId> {
        match self.worker.lock() {
            Ok(worker) => worker.as_ref().map(|join| join.thread().id()),
            Err(poisoned) => poisoned.into_inner().as_ref().map(|join| join.thread().id()),
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("thread_name", &self.thread_name)
            .field("started", &self.worker_started.load(Ordering::SeqCst))
            .field("delivered", &self.delivered_count())
            .finish()
    }
}

fn run_worker(
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
    handler: HandlerSlot,
    delivered: Arc<AtomicU64>,
) {
    // Dedicated current-thread runtime, independent of any caller runtime.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();

    match runtime {
        Ok(runtime) => runtime.block_on(async {
            while let Some(event) = rx.recv().await {
                deliver(&handler, &delivered, event);
            }
        }),
        Err(err) => {
            log::warn!("[EventDispatcher] runtime unavailable ({}), using blocking receive", err);
            while let Some(event) = rx.blocking_recv() {
                deliver(&handler, &delivered, event);
            }
        }
    }
    log::debug!("[EventDispatcher] queue closed, dispatch thread exiting");
}

fn deliver(handler: &HandlerSlot, delivered: &AtomicU64, event: EngineEvent) {
    let current = match handler.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    if let Some(current) = current {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| event.deliver(current.as_ref())));
        if outcome.is_err() {
            tracing::error!(event = event.name(), "event handler panicked");
        }
    }
    delivered.fetch_add(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counter {
        mixing_finished: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl RtcEngineEventHandler for Counter {
        fn on_audio_mixing_finished(&self) {
            self.mixing_finished.fetch_add(1, Ordering::SeqCst);
        }

        fn on_warning(&self, _warn: i32, _message: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicky;

    impl RtcEngineEventHandler for Panicky {
        fn on_camera_ready(&self) {
            panic!("handler bug");
        }
    }

    #[test]
    fn events_queued_before_start_are_delivered() {
        let dispatcher = EventDispatcher::new("test-dispatch");
        let counter = Arc::new(Counter::default());
        dispatcher.set_handler(Some(counter.clone()));

        let sink = dispatcher.sink();
        assert!(sink.emit(EngineEvent::AudioMixingFinished));
        assert!(sink.emit(EngineEvent::AudioMixingFinished));

        dispatcher.start();
        dispatcher.shutdown();

        assert_eq!(counter.mixing_finished.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.delivered_count(), 2);
    }

    #[test]
    fn emit_after_shutdown_is_dropped() {
        let dispatcher = EventDispatcher::new("test-dispatch");
        dispatcher.start();
        let sink = dispatcher.sink();
        dispatcher.shutdown();

        assert!(sink.is_closed());
        assert!(!sink.emit(EngineEvent::CameraReady));
    }

    #[test]
    fn replacing_handler_routes_later_events_to_new_one() {
        let dispatcher = EventDispatcher::new("test-dispatch");
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());

        dispatcher.set_handler(Some(first.clone()));
        let previous = dispatcher.set_handler(Some(second.clone()));
        assert!(previous.is_some());

        dispatcher.sink().emit(EngineEvent::Warning {
            code: 8,
            message: "invalid view".into(),
        });
        dispatcher.start();
        dispatcher.shutdown();

        assert_eq!(first.warnings.load(Ordering::SeqCst), 0);
        assert_eq!(second.warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_does_not_stop_delivery() {
        let dispatcher = EventDispatcher::new("test-dispatch");
        dispatcher.set_handler(Some(Arc::new(Panicky)));
        let sink = dispatcher.sink();
        sink.emit(EngineEvent::CameraReady);
        sink.emit(EngineEvent::VideoStopped);

        dispatcher.start();
        dispatcher.shutdown();
        assert_eq!(dispatcher.delivered_count(), 2);
    }

    #[test]
    fn detached_sink_drops_events() {
        let sink = EventSink::detached();
        assert!(sink.is_closed());
        assert!(!sink.emit(EngineEvent::ConnectionLost));
    }
}
