use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tilexport::callbacks::{CallbackDispatcher, HttpCallbackSender};
use tilexport::clients::{HttpConfig, HttpJobStore, HttpWorkQueue, JsonClient};
use tilexport::config::Config;
use tilexport::finalizer::{FinalizationStateMachine, LocalArtifactFinalizer, PollRunner};
use tilexport::observability::Metrics;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(config: Config) -> Result<(), AnyError> {
    let metrics = Arc::new(Metrics::new());
    let machine = build_machine(&config, metrics.clone())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = PollRunner::new(
        Arc::new(machine),
        Duration::from_millis(config.queue.poll_interval_ms),
    );
    let runner_task = tokio::spawn(runner.run(shutdown_rx));

    let address = config.server.bind_addr;
    let listener = TcpListener::bind(address).await?;
    info!(%address, "tilexport listening");

    axum::serve(listener, router(metrics).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    runner_task.await?;
    Ok(())
}

fn build_machine(
    config: &Config,
    metrics: Arc<Metrics>,
) -> Result<FinalizationStateMachine, AnyError> {
    let http = HttpConfig::from(&config.http);
    let jobs = JsonClient::new(&http, &config.job_manager.url)?;
    let queue = JsonClient::new(&http, &config.queue.url)?;

    let sender = HttpCallbackSender::new(
        &http,
        Duration::from_millis(config.http.callback_timeout_ms),
    )?;
    let artifacts = LocalArtifactFinalizer::new(
        config.storage.output_dir.clone(),
        config.storage.download_server_url.clone(),
        config.storage.cleanup_expiration_days,
    );

    Ok(FinalizationStateMachine::builder()
        .store(Arc::new(HttpJobStore::new(jobs.clone(), &config.job_manager.job_type)))
        .queue(Arc::new(HttpWorkQueue::new(jobs, queue, &config.job_manager.job_type)))
        .artifacts(Arc::new(artifacts))
        .dispatcher(CallbackDispatcher::new(Arc::new(sender), metrics.clone()))
        .metrics(metrics)
        .task_type(config.queue.finalize_task_type.clone())
        .max_attempts(config.queue.max_attempts)
        .build())
}

fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .with_state(metrics)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_snapshot(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    Json(metrics.snapshot())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let response = router(Arc::new(Metrics::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let metrics = Arc::new(Metrics::new());
        metrics.job_completed();

        let response = router(metrics)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["jobs_completed"], 1);
    }
}
