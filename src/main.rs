use actix_web::{middleware, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as GrpcServer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_dispatch::{
    config::Config,
    grpc::{NotificationIngestServer, NotificationIngestService},
    handlers::{metrics, notifications, users},
    metrics::DeliveryMetrics,
    services::{DeliveryQueue, Dispatcher, SyntheticTransport},
    store::MemoryStore,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting notification dispatch service");

    let store = Arc::new(MemoryStore::new());
    if config.seed_demo_data() {
        store.seed_demo_data();
        info!("Seeded demo users and posts");
    }

    let delivery_metrics = Arc::new(DeliveryMetrics::new());
    let transport = Arc::new(SyntheticTransport::from_config(&config.delivery));
    let queue = Arc::new(DeliveryQueue::new(
        Arc::clone(&store),
        delivery_metrics,
        transport,
        &config.delivery,
    ));
    queue.start();

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), Arc::clone(&queue)));

    let shutdown = CancellationToken::new();

    // gRPC ingest server in the background
    let grpc_addr: std::net::SocketAddr = format!("0.0.0.0:{}", config.app.grpc_port)
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    {
        let dispatcher = Arc::clone(&dispatcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            info!("gRPC ingest listening on {}", grpc_addr);
            let service = NotificationIngestService::new(dispatcher);
            if let Err(e) = GrpcServer::builder()
                .add_service(NotificationIngestServer::new(service))
                .serve_with_shutdown(grpc_addr, shutdown.cancelled_owned())
                .await
            {
                error!("gRPC server error: {}", e);
            }
        });
    }

    let http_addr = format!("0.0.0.0:{}", config.app.http_port);
    info!("HTTP server listening on {}", http_addr);

    let store_data = web::Data::new(Arc::clone(&store));
    let queue_data = web::Data::new(Arc::clone(&queue));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(store_data.clone())
            .app_data(queue_data.clone())
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(metrics::health))
            .route("/metrics", web::get().to(metrics::get_metrics))
            .route(
                "/",
                web::get().to(|| async { "Notification Dispatch Service v0.1" }),
            )
            .configure(|cfg| {
                notifications::register_routes(cfg);
                users::register_routes(cfg);
                metrics::register_routes(cfg);
            })
    })
    .shutdown_timeout(config.app.shutdown_timeout_secs)
    .disable_signals()
    .bind(&http_addr)?
    .run();

    let server_handle = server.handle();

    // Signal watcher: stop accepting ingest first, drain the delivery
    // queue, then stop the HTTP read surface within its drain window.
    {
        let queue = Arc::clone(&queue);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown signal received, stopping servers");
            shutdown.cancel();
            queue.stop().await;
            server_handle.stop(true).await;
            info!("Server gracefully stopped");
        });
    }

    server.await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
