use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggedNotifications};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use superapp_core::config::AppConfig;
use superapp_core::error::AppError;
use superapp_core::ledger::{InMemoryLedgerStore, WalletService};
use superapp_core::payroll::PayrollCalculator;
use superapp_core::performance::{InMemoryReviewStore, ReviewService};
use superapp_core::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let notifications = Arc::new(LoggedNotifications::default());
    let wallets = Arc::new(WalletService::new(
        Arc::new(InMemoryLedgerStore::default()),
        notifications.clone(),
    ));
    let reviews = Arc::new(ReviewService::new(
        Arc::new(InMemoryReviewStore::default()),
        notifications,
    ));
    let payroll = Arc::new(PayrollCalculator::new(config.payroll.clone())?);

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        payroll,
        reviews,
    };

    let app = with_service_routes(wallets, &app_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wallet ledger service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
