mod common;

use common::{booking, server_error, RecordingNotifier, ScriptedBackend};
use parkwise::gateway::types::{BookingStatus, Money, PaymentMethod, PaymentStatus};
use parkwise::services::{
    can_settle_from_wallet, Notification, PaymentResolution, SettlementError,
    WalletPaymentResolver,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn resolver(
    backend: &Arc<ScriptedBackend>,
    notifier: &Arc<RecordingNotifier>,
) -> WalletPaymentResolver {
    WalletPaymentResolver::new(backend.clone(), notifier.clone())
}

fn money(value: u32) -> Money {
    Money::from(value)
}

#[tokio::test]
async fn insufficient_balance_records_due_without_debit() {
    let backend = Arc::new(ScriptedBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .resolve_payment(money(100), money(150), "b-1")
        .await
        .unwrap();

    assert_eq!(resolution, PaymentResolution::Due { amount: money(150) });
    assert_eq!(resolution.payment_status(), PaymentStatus::Due);
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 0);
    assert_eq!(
        notifier.sent(),
        vec![Notification::PaymentDeferred {
            booking_id: Some("b-1".to_string()),
            amount_due: money(150),
        }]
    );
}

#[tokio::test]
async fn sufficient_balance_debits_exactly_once() {
    let backend = Arc::new(ScriptedBackend::new().with_balance(Ok(money(200))));
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .resolve_payment(money(200), money(150), "b-1")
        .await
        .unwrap();

    assert_eq!(
        resolution,
        PaymentResolution::Paid {
            method: PaymentMethod::Wallet,
            amount: money(150),
            remaining_balance: Some(money(50)),
        }
    );
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 1);
    assert_eq!(
        notifier.sent(),
        vec![Notification::PaymentSuccessful {
            booking_id: "b-1".to_string(),
            method: PaymentMethod::Wallet,
        }]
    );
}

#[tokio::test]
async fn exact_balance_is_enough() {
    let backend = Arc::new(ScriptedBackend::new().with_balance(Ok(money(150))));
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .resolve_payment(money(150), money(150), "b-1")
        .await
        .unwrap();

    assert!(resolution.is_paid());
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 1);
}

#[tokio::test]
async fn zero_amount_is_settled_free_without_debit() {
    let backend = Arc::new(ScriptedBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .resolve_payment(Money::ZERO, Money::ZERO, "b-1")
        .await
        .unwrap();

    assert!(matches!(
        resolution,
        PaymentResolution::Paid {
            method: PaymentMethod::Free,
            ..
        }
    ));
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 0);
}

#[tokio::test]
async fn debit_outcome_matches_eligibility_for_sampled_amounts() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..64 {
        let balance = money(rng.gen_range(0..500));
        let due = money(rng.gen_range(1..500));
        let backend = Arc::new(ScriptedBackend::new().with_balance(Ok(balance)));
        let notifier = Arc::new(RecordingNotifier::new());

        let resolution = resolver(&backend, &notifier)
            .resolve_payment(balance, due, "b-sample")
            .await
            .unwrap();

        let expected_debits = usize::from(can_settle_from_wallet(balance, due));
        assert_eq!(resolution.is_paid(), balance >= due);
        assert_eq!(
            ScriptedBackend::calls(&backend.debit_calls),
            expected_debits,
            "balance {balance} due {due}"
        );
        assert_eq!(notifier.sent().len(), 1);
    }
}

#[tokio::test]
async fn failed_debit_falls_back_to_due() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_balance(Ok(money(500)))
            .with_debit_failure(server_error()),
    );
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .resolve_payment(money(500), money(150), "b-1")
        .await
        .unwrap();

    assert_eq!(resolution, PaymentResolution::Due { amount: money(150) });
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_settlement_is_rejected_while_in_flight() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_balance(Ok(money(300)))
            .with_debit_delay(Duration::from_millis(200)),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let resolver = resolver(&backend, &notifier);

    let (first, second) = tokio::join!(
        resolver.resolve_payment(money(300), money(150), "b-1"),
        resolver.resolve_payment(money(300), money(150), "b-1"),
    );

    assert!(first.unwrap().is_paid());
    assert_eq!(second, Err(SettlementError::AlreadyInFlight));
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 1);
    assert!(!resolver.is_settling());
}

#[tokio::test]
async fn settle_reads_a_fresh_balance_each_time() {
    let backend = Arc::new(ScriptedBackend::new().with_balance(Ok(money(100))));
    let notifier = Arc::new(RecordingNotifier::new());
    let resolver = resolver(&backend, &notifier);
    let booking = booking("b-1", BookingStatus::Active, 150);

    let first = resolver.settle(&booking).await.unwrap();
    assert_eq!(first, PaymentResolution::Due { amount: money(150) });

    backend.set_balance(Ok(money(400)));
    let second = resolver.settle(&booking).await.unwrap();
    assert!(second.is_paid());

    assert_eq!(ScriptedBackend::calls(&backend.balance_calls), 2);
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 1);
}

#[tokio::test]
async fn settle_records_due_when_balance_is_unavailable() {
    let backend = Arc::new(ScriptedBackend::new().with_balance(Err(server_error())));
    let notifier = Arc::new(RecordingNotifier::new());

    let resolution = resolver(&backend, &notifier)
        .settle(&booking("b-1", BookingStatus::Active, 80))
        .await
        .unwrap();

    assert_eq!(resolution, PaymentResolution::Due { amount: money(80) });
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 0);
}

#[tokio::test]
async fn settle_treats_missing_amount_as_zero() {
    let backend = Arc::new(ScriptedBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let mut booking = booking("b-1", BookingStatus::Active, 0);
    booking.amount_due = None;

    let resolution = resolver(&backend, &notifier).settle(&booking).await.unwrap();

    assert!(resolution.is_paid());
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 0);
}

#[tokio::test]
async fn defer_records_due_without_touching_the_wallet() {
    let backend = Arc::new(ScriptedBackend::new().with_balance(Ok(money(1000))));
    let notifier = Arc::new(RecordingNotifier::new());

    let amount = Money::new(dec!(42.50)).unwrap();
    let resolution = resolver(&backend, &notifier).defer(amount, None).unwrap();

    assert_eq!(resolution, PaymentResolution::Due { amount });
    assert_eq!(ScriptedBackend::calls(&backend.balance_calls), 0);
    assert_eq!(ScriptedBackend::calls(&backend.debit_calls), 0);
    assert_eq!(
        notifier.sent(),
        vec![Notification::PaymentDeferred {
            booking_id: None,
            amount_due: amount,
        }]
    );
}
