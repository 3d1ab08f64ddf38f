use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use autoblog_worker::{
    app::{ComponentRegistry, build_router, shutdown},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    // tracing は Telemetry::new() が初期化する
    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();
    let autostart = config.scheduler_autostart();
    let interval = config.scheduler_interval();
    let grace = config.scheduler_shutdown_grace();

    let registry = Arc::new(
        ComponentRegistry::build(config)
            .await
            .context("failed to build component registry")?,
    );
    let scheduler = registry.scheduler().clone();
    let telemetry = registry.telemetry().clone();

    if autostart {
        scheduler
            .start(interval)
            .context("failed to start scheduler")?;
    } else {
        info!("scheduler autostart disabled; waiting for POST /v1/scheduler/start");
    }

    let router = build_router(Arc::clone(&registry));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {bind_addr}"))?;

    info!(%bind_addr, "listening");

    if let Err(error) = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            shutdown::wait_for_shutdown().await;
        })
        .await
    {
        warn!(error = %error, "server exited with error");
    }

    if !scheduler.shutdown(grace).await {
        warn!("exiting with a run still in flight; it will remain pending in the ledger");
    }
    telemetry.shutdown();

    Ok(())
}
