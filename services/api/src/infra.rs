use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use superapp_core::ledger::{
    InMemoryLedgerStore, LedgerNotification, NotificationError, NotificationPublisher,
    WalletService,
};
use superapp_core::payroll::{IncentiveCurve, PayrollCalculator, PayrollRates};
use superapp_core::performance::{InMemoryReviewStore, ReviewService};
use tracing::info;

pub(crate) type Wallets = WalletService<InMemoryLedgerStore, LoggedNotifications>;
pub(crate) type Reviews = ReviewService<InMemoryReviewStore, LoggedNotifications>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) payroll: Arc<PayrollCalculator>,
    pub(crate) reviews: Arc<Reviews>,
}

/// Stand-in for the push gateway: logs each notification and keeps a copy.
#[derive(Default, Clone)]
pub(crate) struct LoggedNotifications {
    events: Arc<Mutex<Vec<LedgerNotification>>>,
}

impl NotificationPublisher for LoggedNotifications {
    fn publish(&self, notification: LedgerNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            user = %notification.user_id,
            details = ?notification.details,
            "notification dispatched"
        );
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

impl LoggedNotifications {
    pub(crate) fn events(&self) -> Vec<LedgerNotification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) fn default_payroll_rates() -> PayrollRates {
    PayrollRates {
        pph21_rate: Decimal::new(5, 2),
        ppn_rate: Decimal::new(11, 2),
        pension_wage_cap: Some(10_042_300),
        incentive: IncentiveCurve::Linear {
            pool_percent: Decimal::new(10, 2),
        },
    }
}

/// Accepts plain digits or Indonesian thousand separators (`1.500.000`).
pub(crate) fn parse_rupiah(raw: &str) -> Result<i64, String> {
    let digits: String = raw
        .trim()
        .trim_start_matches("Rp")
        .chars()
        .filter(|ch| !matches!(ch, '.' | '_' | ' '))
        .collect();
    digits
        .parse::<i64>()
        .map_err(|err| format!("failed to parse '{raw}' as a rupiah amount ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rupiah_amounts() {
        assert_eq!(parse_rupiah("1.500.000"), Ok(1_500_000));
        assert_eq!(parse_rupiah("Rp 750_000"), Ok(750_000));
        assert!(parse_rupiah("lima ratus").is_err());
    }

    #[test]
    fn default_rates_validate() {
        assert!(default_payroll_rates().validate().is_ok());
    }
}
