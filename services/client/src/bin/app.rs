//! services/client/src/bin/app.rs

use client_lib::{
    adapters::{FrameSourceCamera, RestAuthAdapter, RestDataAdapter, SmtpEmailAdapter},
    config::Config,
    error::AppError,
    ui::{AppState, NavPresenter, ScannerController},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting the GuestGo client shell...");

    // --- 2. Initialize Collaborator Adapters ---
    let data = Arc::new(RestDataAdapter::new(
        &config.backend_url,
        &config.backend_api_key,
    ));
    let auth = Arc::new(RestAuthAdapter::new(
        &config.backend_url,
        &config.backend_api_key,
        config.backend_access_token.clone(),
    ));
    let email = Arc::new(SmtpEmailAdapter::new(&config)?);
    let camera = Arc::new(FrameSourceCamera::new(
        config.camera_frames_dir.clone(),
        Duration::from_millis(config.camera_frame_interval_ms),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = AppState {
        auth: auth.clone(),
        data: data.clone(),
        email,
        camera,
        config: config.clone(),
    };

    if let Err(e) = app_state
        .data
        .log_action("app_start", "client shell booted")
        .await
    {
        warn!("Could not record the startup action: {:?}", e);
    }
    match app_state.data.list_places().await {
        Ok(places) => info!("{} places available for scheduling.", places.len()),
        Err(e) => warn!("Could not load places: {:?}", e),
    }

    // --- 4. Start the Navigation Presenter ---
    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel();
    let presenter = NavPresenter::new(app_state.data.clone(), nav_tx);
    let shutdown = CancellationToken::new();
    let presenter_task = {
        let auth = app_state.auth.clone();
        let token = shutdown.clone();
        tokio::spawn(async move { presenter.run(auth, token).await })
    };

    // --- 5. Drive the Scanner From Navigation Changes ---
    let (scan_tx, mut scan_rx) = mpsc::unbounded_channel();
    let scanner = Arc::new(ScannerController::new(
        app_state.camera.clone(),
        app_state.data.clone(),
        scan_tx,
    ));
    let scan_logger = tokio::spawn(async move {
        while let Some(event) = scan_rx.recv().await {
            info!("Scanner: {:?}", event);
        }
    });
    let nav_task = {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            while let Some(view) = nav_rx.recv().await {
                info!(
                    "Navigation: dashboard={} scanner={} schedule_visit={}",
                    view.dashboard, view.scanner, view.schedule_visit
                );
                if view.scanner && !scanner.is_active().await {
                    // Personnel land on the scanner page, which auto-starts.
                    scanner.start().await;
                } else if !view.scanner {
                    scanner.teardown().await;
                }
            }
        })
    };

    // --- 6. Run Until Shutdown ---
    tokio::signal::ctrl_c().await?;
    info!("Shutting down.");
    shutdown.cancel();
    scanner.teardown().await;
    presenter_task.abort();
    nav_task.abort();
    scan_logger.abort();

    Ok(())
}
