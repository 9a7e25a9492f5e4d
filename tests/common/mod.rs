#![allow(dead_code)]

use async_trait::async_trait;
use parkwise::gateway::types::{
    Booking, BookingStatus, CreateBookingRequest, DebitRequest, GlobalAccount, Money,
    PaymentMethod, PaymentStatus, PaymentStatusReport, SpotType,
};
use parkwise::gateway::{BookingGateway, GatewayError, GatewayResult, WalletLedger};
use parkwise::services::{Notification, Notifier};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn booking(id: &str, status: BookingStatus, amount_due: u32) -> Booking {
    Booking {
        id: id.to_string(),
        user: None,
        floor: None,
        spot_type: SpotType::Normal,
        spot_number: Some(7),
        status,
        payment_status: PaymentStatus::Pending,
        payment_method: PaymentMethod::None,
        created_at: None,
        expected_exit_time: None,
        expires_at: None,
        amount_due: Some(Money::from(amount_due)),
    }
}

pub fn server_error() -> GatewayError {
    GatewayError::server(500, "internal error")
}

/// In-memory backend with scripted responses and per-endpoint call counters.
pub struct ScriptedBackend {
    current: Mutex<GatewayResult<Booking>>,
    active: Mutex<GatewayResult<Vec<Booking>>>,
    statuses: Mutex<VecDeque<GatewayResult<PaymentStatusReport>>>,
    balance: Mutex<GatewayResult<Money>>,
    debit_result: Mutex<Option<GatewayError>>,
    debit_delay: Option<Duration>,
    status_delay: Option<Duration>,
    created: Mutex<Booking>,

    pub current_calls: AtomicUsize,
    pub active_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub debit_calls: AtomicUsize,
    pub queried_ids: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            current: Mutex::new(Err(GatewayError::not_found("no booking"))),
            active: Mutex::new(Ok(vec![])),
            statuses: Mutex::new(VecDeque::new()),
            balance: Mutex::new(Ok(Money::ZERO)),
            debit_result: Mutex::new(None),
            debit_delay: None,
            status_delay: None,
            created: Mutex::new(booking("b-created", BookingStatus::Pending, 120)),
            current_calls: AtomicUsize::new(0),
            active_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            debit_calls: AtomicUsize::new(0),
            queried_ids: Mutex::new(vec![]),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current(self, result: GatewayResult<Booking>) -> Self {
        *self.current.lock().unwrap() = result;
        self
    }

    pub fn with_active(self, result: GatewayResult<Vec<Booking>>) -> Self {
        *self.active.lock().unwrap() = result;
        self
    }

    /// Status responses served in order; once exhausted, "not paid" is returned.
    pub fn with_statuses(self, script: Vec<GatewayResult<Option<PaymentMethod>>>) -> Self {
        let mut statuses = self.statuses.lock().unwrap();
        for entry in script {
            statuses.push_back(entry.map(|method| PaymentStatusReport {
                booking_id: String::new(),
                is_paid: method.is_some(),
                payment_method: method,
            }));
        }
        drop(statuses);
        self
    }

    /// Raw status reports, for payloads the `with_statuses` shorthand cannot express.
    pub fn with_reports(self, script: Vec<GatewayResult<PaymentStatusReport>>) -> Self {
        self.statuses.lock().unwrap().extend(script);
        self
    }

    pub fn with_balance(self, result: GatewayResult<Money>) -> Self {
        self.set_balance(result);
        self
    }

    pub fn set_balance(&self, result: GatewayResult<Money>) {
        *self.balance.lock().unwrap() = result;
    }

    pub fn with_debit_failure(self, error: GatewayError) -> Self {
        *self.debit_result.lock().unwrap() = Some(error);
        self
    }

    pub fn with_debit_delay(mut self, delay: Duration) -> Self {
        self.debit_delay = Some(delay);
        self
    }

    /// Holds every status query open for `delay` before answering.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn with_created(self, created: Booking) -> Self {
        *self.created.lock().unwrap() = created;
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingGateway for ScriptedBackend {
    async fn current_booking(&self) -> GatewayResult<Booking> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().clone()
    }

    async fn active_bookings(&self) -> GatewayResult<Vec<Booking>> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        self.active.lock().unwrap().clone()
    }

    async fn payment_status(&self, booking_id: &str) -> GatewayResult<PaymentStatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.queried_ids.lock().unwrap().push(booking_id.to_string());
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map(|report| PaymentStatusReport {
                booking_id: booking_id.to_string(),
                ..report
            }),
            None => Ok(PaymentStatusReport {
                booking_id: booking_id.to_string(),
                is_paid: false,
                payment_method: None,
            }),
        }
    }

    async fn create_booking(&self, _request: CreateBookingRequest) -> GatewayResult<Booking> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.created.lock().unwrap().clone())
    }
}

#[async_trait]
impl WalletLedger for ScriptedBackend {
    async fn global_account(&self) -> GatewayResult<GlobalAccount> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let balance = self.balance.lock().unwrap().clone()?;
        Ok(GlobalAccount {
            balance,
            last_updated: None,
        })
    }

    async fn debit(&self, request: DebitRequest) -> GatewayResult<GlobalAccount> {
        self.debit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.debit_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.debit_result.lock().unwrap().clone() {
            return Err(error);
        }
        let current = self.balance.lock().unwrap().clone()?;
        Ok(GlobalAccount {
            balance: Money::new(current.value() - request.amount.value())?,
            last_updated: Some(chrono::Utc::now()),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}
