//! プロセス停止シグナルの待ち受け。
use tokio::signal;
use tracing::{info, warn};

/// 受け取った停止シグナルの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// SIGINT（Ctrl+C）か SIGTERM のどちらかを待つ。
///
/// ハンドラを登録できなかった方は永久に待機扱いにする。
pub async fn wait_for_shutdown() -> ShutdownSignal {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        () = interrupt => ShutdownSignal::Interrupt,
        () = terminate => ShutdownSignal::Terminate,
    };
    info!(signal = ?received, "shutdown signal received");
    received
}
