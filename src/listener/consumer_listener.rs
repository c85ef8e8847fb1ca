use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::{format_record_line, ConsumerFactory, ListenerLifecycleState, MessageConsumer};
use crate::utils::{PeriodicFlusher, RecordBuffer, TextSink, WatchdogTimer};
use crate::{AppError, AppResult, ListenerConfig};

/// State of one start..stop cycle.
///
/// A restart creates a fresh context, so a run that is still winding down
/// can only ever touch its own state.
struct RunContext {
    generation: u64,
    name: String,
    state: Mutex<ListenerLifecycleState>,
    consumer: Mutex<Option<Arc<dyn MessageConsumer>>>,
    watchdog: WatchdogTimer,
    flusher: PeriodicFlusher,
}

impl RunContext {
    fn state(&self) -> ListenerLifecycleState {
        *self.state.lock()
    }

    fn transition(&self, next: ListenerLifecycleState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return false;
        }
        trace!(
            "listener '{}' run {}: {} -> {}",
            self.name,
            self.generation,
            *state,
            next
        );
        *state = next;
        true
    }

    fn is_running(&self) -> bool {
        self.state() == ListenerLifecycleState::Running
    }

    fn consumer(&self) -> Option<Arc<dyn MessageConsumer>> {
        self.consumer.lock().clone()
    }
}

/// Long-lived background consumer with a watchdog around every poll.
///
/// `start` spawns the consumption loop and returns right away; `stop` only
/// signals the loop, cancels the watchdog and wakes a blocked poll. Records
/// are appended to a line buffer that a [`PeriodicFlusher`] forwards to the
/// sink.
pub struct ConsumerListener {
    factory: Arc<dyn ConsumerFactory>,
    sink: Arc<dyn TextSink>,
    generations: AtomicU64,
    // serializes start and stop
    current: Mutex<Option<Arc<RunContext>>>,
}

impl ConsumerListener {
    pub fn new(factory: Arc<dyn ConsumerFactory>, sink: Arc<dyn TextSink>) -> Self {
        ConsumerListener {
            factory,
            sink,
            generations: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ListenerLifecycleState {
        self.current
            .lock()
            .as_ref()
            .map_or(ListenerLifecycleState::Stopped, |run| run.state())
    }

    pub fn is_running(&self) -> bool {
        self.state() == ListenerLifecycleState::Running
    }

    /// Starts a new run, stopping the current one first.
    ///
    /// Fails without spawning anything when the topic or broker host is
    /// missing from `config`, or its flush interval is zero.
    pub fn start(&self, config: ListenerConfig) -> AppResult<()> {
        if !config.is_complete() {
            error!(
                "Could not start consumer '{}'. Topic config is invalid.",
                config.name
            );
            return Err(AppError::InvalidValue(
                "listener config",
                format!(
                    "topic: {:?}, broker host: {:?}",
                    config.topic, config.broker_host
                ),
            ));
        }

        if config.flush_interval_ms == 0 {
            error!("Could not start consumer '{}'. Flush interval is zero.", config.name);
            return Err(AppError::InvalidValue(
                "flush_interval_ms",
                config.flush_interval_ms.to_string(),
            ));
        }

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            request_stop(&previous);
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let buffer = Arc::new(RecordBuffer::with_capacity(config.max_buffered_records));
        let run = Arc::new(RunContext {
            generation,
            name: config.name.clone(),
            state: Mutex::new(ListenerLifecycleState::Stopped),
            consumer: Mutex::new(None),
            watchdog: WatchdogTimer::new(format!("{}-{}", config.name, generation)),
            flusher: PeriodicFlusher::new(
                config.name.clone(),
                config.flush_interval(),
                buffer,
                Arc::clone(&self.sink),
            ),
        });
        run.transition(ListenerLifecycleState::Starting);
        run.flusher.start()?;

        let thread_run = Arc::clone(&run);
        let factory = Arc::clone(&self.factory);
        let spawned = thread::Builder::new()
            .name(format!("kafkascope-listener:{}", config.name))
            .spawn(move || consume(thread_run, factory, config));
        if let Err(err) = spawned {
            run.transition(ListenerLifecycleState::StoppingRequested);
            run.flusher.stop();
            run.transition(ListenerLifecycleState::Stopped);
            return Err(err.into());
        }

        *current = Some(run);
        Ok(())
    }

    /// Asks the current run to stop. Idempotent, and a no-op when idle.
    pub fn stop(&self) {
        let current = self.current.lock();
        match current.as_ref() {
            Some(run) => request_stop(run),
            None => trace!("no listener run to stop"),
        }
    }
}

impl Drop for ConsumerListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn request_stop(run: &RunContext) {
    if !run.transition(ListenerLifecycleState::StoppingRequested) {
        return;
    }
    debug!("stop requested for listener '{}'", run.name);
    run.watchdog.disarm();
    if let Some(consumer) = run.consumer() {
        consumer.wakeup();
    }
}

fn consume(run: Arc<RunContext>, factory: Arc<dyn ConsumerFactory>, config: ListenerConfig) {
    info!(
        "Starting consumer '{}', consumer group '{}'",
        config.name, config.consumer_group
    );
    let topic = config.topic.clone().unwrap_or_default();

    match subscribe(&run, factory.as_ref(), &config, &topic) {
        Ok(consumer) => {
            if run.transition(ListenerLifecycleState::Running) {
                info!(
                    "Consumer started (topic:{}, consumer group:{})",
                    topic, config.consumer_group
                );
                match poll_loop(&run, &consumer, &config) {
                    Ok(()) => {}
                    Err(AppError::ConsumerInterrupted) => {
                        trace!("closing consumer '{}' due to wakeup", config.name)
                    }
                    Err(err) => error!("consumer '{}' failed: {}", config.name, err),
                }
                info!(
                    "Consumer stopped (topic:{}, consumer group:{})",
                    topic, config.consumer_group
                );
            }
            release(&consumer);
        }
        Err(err) => error!("could not start consumer '{}': {}", config.name, err),
    }

    run.transition(ListenerLifecycleState::StoppingRequested);
    run.watchdog.disarm();
    run.consumer.lock().take();
    run.flusher.stop();
    run.transition(ListenerLifecycleState::Stopped);
}

fn subscribe(
    run: &RunContext,
    factory: &dyn ConsumerFactory,
    config: &ListenerConfig,
    topic: &str,
) -> AppResult<Arc<dyn MessageConsumer>> {
    let consumer = factory.create(config)?;
    *run.consumer.lock() = Some(Arc::clone(&consumer));
    if let Err(err) = consumer.subscribe(&[topic.to_string()]) {
        release(&consumer);
        return Err(err);
    }
    Ok(consumer)
}

fn poll_loop(
    run: &RunContext,
    consumer: &Arc<dyn MessageConsumer>,
    config: &ListenerConfig,
) -> AppResult<()> {
    let poll_timeout = config.poll_timeout();
    let wakeup_after = poll_timeout + config.wakeup_grace();

    while run.is_running() {
        let sleeper = Arc::clone(consumer);
        run.watchdog.arm(wakeup_after, move || {
            warn!(
                "Waking up consumer (after {} ms), because poll did not respond within its {} ms timeout.",
                wakeup_after.as_millis(),
                poll_timeout.as_millis()
            );
            sleeper.wakeup();
        })?;
        let polled = consumer.poll(poll_timeout);
        run.watchdog.disarm();

        let records = polled?;
        if !records.is_empty() {
            let now = Local::now();
            for record in &records {
                run.flusher.buffer().append(format_record_line(record, now));
            }
        }
        if let Err(err) = consumer.commit() {
            warn!("offset commit failed for '{}': {}", config.name, err);
        }
    }
    Ok(())
}

fn release(consumer: &Arc<dyn MessageConsumer>) {
    if let Err(err) = consumer.unsubscribe() {
        debug!("unsubscribe failed: {}", err);
    }
    if let Err(err) = consumer.close() {
        debug!("close failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};

    /// Consumer whose poll blocks until woken up.
    #[derive(Default)]
    struct SilentConsumer {
        woken: Mutex<bool>,
        cond: parking_lot::Condvar,
        closed: AtomicBool,
    }

    impl MessageConsumer for SilentConsumer {
        fn subscribe(&self, _topics: &[String]) -> AppResult<()> {
            Ok(())
        }

        fn poll(&self, _timeout: Duration) -> AppResult<Vec<crate::listener::ConsumedRecord>> {
            let mut woken = self.woken.lock();
            while !*woken {
                self.cond.wait(&mut woken);
            }
            *woken = false;
            Err(AppError::ConsumerInterrupted)
        }

        fn commit(&self) -> AppResult<()> {
            Ok(())
        }

        fn wakeup(&self) {
            *self.woken.lock() = true;
            self.cond.notify_all();
        }

        fn unsubscribe(&self) -> AppResult<()> {
            Ok(())
        }

        fn close(&self) -> AppResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SharedFactory(Arc<SilentConsumer>);

    impl ConsumerFactory for SharedFactory {
        fn create(&self, _config: &ListenerConfig) -> AppResult<Arc<dyn MessageConsumer>> {
            Ok(self.0.clone() as Arc<dyn MessageConsumer>)
        }
    }

    fn config() -> ListenerConfig {
        ListenerConfig {
            name: "unit".to_string(),
            topic: Some("orders".to_string()),
            broker_host: Some("localhost:9092".to_string()),
            poll_timeout_ms: 50,
            wakeup_grace_ms: 50,
            flush_interval_ms: 20,
            ..Default::default()
        }
    }

    fn wait_for(listener: &ConsumerListener, state: ListenerLifecycleState) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if listener.state() == state {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_stop_wakes_blocked_poll() {
        let consumer = Arc::new(SilentConsumer::default());
        let listener = ConsumerListener::new(
            Arc::new(SharedFactory(consumer.clone())),
            Arc::new(|_: &str| {}),
        );
        let mut config = config();
        config.poll_timeout_ms = 10_000;
        listener.start(config).unwrap();
        assert!(wait_for(&listener, ListenerLifecycleState::Running));

        listener.stop();
        assert!(wait_for(&listener, ListenerLifecycleState::Stopped));
        assert!(consumer.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let listener = ConsumerListener::new(
            Arc::new(SharedFactory(Arc::new(SilentConsumer::default()))),
            Arc::new(|_: &str| {}),
        );
        listener.stop();
        listener.stop();
        assert_eq!(listener.state(), ListenerLifecycleState::Stopped);
    }
}
