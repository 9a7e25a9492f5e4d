use parkwise::config::AppConfig;
use parkwise::gateway::HttpBookingGateway;
use parkwise::logging::init_tracing;
use parkwise::services::{ActiveBookingGuard, NotificationService, Notifier};
use parkwise::workers::{PaymentConfirmation, PaymentVerificationPoller};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping kiosk");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.gateway.base_url,
        poll_interval_ms = config.verification.poll_interval_ms,
        failure_policy = ?config.guard.failure_policy,
        "Starting parkwise kiosk"
    );

    let gateway = Arc::new(HttpBookingGateway::new(config.gateway.clone())?);
    let notifier: Arc<dyn Notifier> = Arc::new(NotificationService::new());

    let guard = ActiveBookingGuard::new(gateway.clone(), notifier.clone())
        .with_policy(config.guard.failure_policy);
    let check = guard.check_active_booking().await;
    info!(
        has_active = check.has_active,
        source = ?check.source,
        booking_id = check.booking.as_ref().map(|b| b.id.as_str()).unwrap_or("-"),
        "Active booking check complete"
    );

    let booking_id = config
        .kiosk
        .booking_id
        .clone()
        .or_else(|| check.booking.as_ref().map(|b| b.id.clone()));
    let Some(booking_id) = booking_id else {
        info!("No booking to verify; exiting");
        return Ok(());
    };

    let (confirmed_tx, mut confirmed_rx) = watch::channel::<Option<PaymentConfirmation>>(None);
    let poller = PaymentVerificationPoller::from_config(gateway, notifier, &config.verification)
        .with_success_callback(move |confirmation| {
            let _ = confirmed_tx.send(Some(confirmation));
        });
    poller.start(Some(&booking_id));

    tokio::select! {
        _ = shutdown_signal() => {
            poller.stop();
        }
        changed = confirmed_rx.changed() => {
            if changed.is_ok() {
                if let Some(confirmation) = confirmed_rx.borrow().as_ref() {
                    info!(
                        booking_id = %confirmation.booking_id,
                        method = %confirmation.payment_method,
                        "Payment verified"
                    );
                }
            }
        }
    }

    info!(state = ?poller.state(), "Kiosk stopped");
    Ok(())
}
