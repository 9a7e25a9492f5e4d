use crate::config::VerificationConfig;
use crate::gateway::client::BookingGateway;
use crate::gateway::types::{PaymentMethod, PaymentStatusReport};
use crate::services::notification::{Notification, Notifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub booking_id: String,
    pub payment_method: PaymentMethod,
}

pub type ConfirmationCallback = Arc<dyn Fn(PaymentConfirmation) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Idle,
    Polling {
        booking_id: String,
    },
    Confirmed {
        booking_id: String,
        payment_method: PaymentMethod,
    },
    Stopped,
}

// ---------------------------------------------------------------------------
// Session bookkeeping
// ---------------------------------------------------------------------------

/// Owned handle to the running poll task. Dropping it closes the shutdown
/// channel, which ends the task at its next suspension point.
struct PollTask {
    shutdown_tx: watch::Sender<bool>,
}

impl PollTask {
    fn cancel(self) {
        let _ = self.shutdown_tx.send(true);
    }
}

struct Shared {
    state: VerificationState,
    /// Bumped on every start/stop; a task may only confirm its own session.
    session: u64,
    task: Option<PollTask>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts live poll tasks; decremented when the task future is dropped.
struct LiveTask(Arc<AtomicUsize>);

impl LiveTask {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SessionContext {
    session: u64,
    trace_id: Uuid,
    booking_id: String,
    interval: Duration,
    gateway: Arc<dyn BookingGateway>,
    notifier: Arc<dyn Notifier>,
    on_confirmed: Option<ConfirmationCallback>,
    shared: Arc<Mutex<Shared>>,
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Polls the payment-status endpoint for one booking until it reports paid or
/// the session is stopped.
///
/// At most one poll task exists per poller. Starting again cancels the
/// previous task first; stopping and dropping the poller both release it.
pub struct PaymentVerificationPoller {
    gateway: Arc<dyn BookingGateway>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    on_confirmed: Option<ConfirmationCallback>,
    shared: Arc<Mutex<Shared>>,
    live_tasks: Arc<AtomicUsize>,
}

impl PaymentVerificationPoller {
    pub fn new(
        gateway: Arc<dyn BookingGateway>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            let fallback = VerificationConfig::default().poll_interval();
            warn!(
                fallback_ms = fallback.as_millis() as u64,
                "zero payment poll interval; using default"
            );
            fallback
        } else {
            interval
        };

        Self {
            gateway,
            notifier,
            interval,
            on_confirmed: None,
            shared: Arc::new(Mutex::new(Shared {
                state: VerificationState::Idle,
                session: 0,
                task: None,
            })),
            live_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(
        gateway: Arc<dyn BookingGateway>,
        notifier: Arc<dyn Notifier>,
        config: &VerificationConfig,
    ) -> Self {
        let interval = match config.validate() {
            Ok(()) => config.poll_interval(),
            Err(e) => {
                warn!(error = %e, "invalid verification config; using default interval");
                VerificationConfig::default().poll_interval()
            }
        };
        Self::new(gateway, notifier, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn with_success_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(PaymentConfirmation) + Send + Sync + 'static,
    {
        self.on_confirmed = Some(Arc::new(callback));
        self
    }

    pub fn state(&self) -> VerificationState {
        lock(&self.shared).state.clone()
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state(), VerificationState::Polling { .. })
    }

    /// Number of poll tasks that have not yet wound down.
    pub fn active_tasks(&self) -> usize {
        self.live_tasks.load(Ordering::SeqCst)
    }

    /// Begins polling for `booking_id`. Does nothing when no id is given.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, booking_id: Option<&str>) {
        let booking_id = match booking_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                debug!("payment verification not started: no booking id");
                return;
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = {
            let mut shared = lock(&self.shared);
            if let Some(previous) = shared.task.take() {
                debug!("cancelling previous payment verification session");
                previous.cancel();
            }
            shared.session += 1;
            shared.state = VerificationState::Polling {
                booking_id: booking_id.clone(),
            };
            shared.task = Some(PollTask { shutdown_tx });

            SessionContext {
                session: shared.session,
                trace_id: Uuid::new_v4(),
                booking_id,
                interval: self.interval,
                gateway: self.gateway.clone(),
                notifier: self.notifier.clone(),
                on_confirmed: self.on_confirmed.clone(),
                shared: self.shared.clone(),
            }
        };

        info!(
            session_id = %ctx.trace_id,
            booking_id = %ctx.booking_id,
            interval_ms = ctx.interval.as_millis() as u64,
            "payment verification started"
        );

        let live = LiveTask::register(&self.live_tasks);
        tokio::spawn(async move {
            let _live = live;
            run_session(ctx, shutdown_rx).await;
        });
    }

    /// Cancels any outstanding poll. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut shared = lock(&self.shared);
        shared.session += 1;
        if let Some(task) = shared.task.take() {
            task.cancel();
            debug!("payment verification stopped");
        }
        if !matches!(shared.state, VerificationState::Confirmed { .. }) {
            shared.state = VerificationState::Stopped;
        }
    }
}

impl Drop for PaymentVerificationPoller {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.session += 1;
        if let Some(task) = shared.task.take() {
            task.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

async fn run_session(ctx: SessionContext, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + ctx.interval, ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {}
        }
        ticks += 1;

        let result = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            result = ctx.gateway.payment_status(&ctx.booking_id) => result,
        };

        match result {
            Ok(report) if report.is_paid => {
                confirm(&ctx, report, ticks);
                break;
            }
            Ok(_) => {
                debug!(
                    session_id = %ctx.trace_id,
                    booking_id = %ctx.booking_id,
                    tick = ticks,
                    "payment not yet confirmed"
                );
            }
            Err(e) => {
                warn!(
                    session_id = %ctx.trace_id,
                    booking_id = %ctx.booking_id,
                    tick = ticks,
                    error = %e,
                    "payment status check failed; retrying on next tick"
                );
            }
        }
    }

    debug!(session_id = %ctx.trace_id, ticks, "payment verification session ended");
}

fn confirm(ctx: &SessionContext, report: PaymentStatusReport, ticks: u64) {
    let payment_method = report.payment_method.unwrap_or(PaymentMethod::Upi);
    {
        let mut shared = lock(&ctx.shared);
        if shared.session != ctx.session {
            debug!(
                session_id = %ctx.trace_id,
                "payment confirmed for a superseded session; ignoring"
            );
            return;
        }
        shared.task = None;
        shared.state = VerificationState::Confirmed {
            booking_id: ctx.booking_id.clone(),
            payment_method,
        };
    }

    info!(
        session_id = %ctx.trace_id,
        booking_id = %ctx.booking_id,
        method = %payment_method,
        ticks,
        "payment confirmed"
    );
    ctx.notifier.notify(Notification::PaymentSuccessful {
        booking_id: ctx.booking_id.clone(),
        method: payment_method,
    });
    if let Some(callback) = &ctx.on_confirmed {
        callback(PaymentConfirmation {
            booking_id: ctx.booking_id.clone(),
            payment_method,
        });
    }
}
