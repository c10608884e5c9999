//! DNS Flood Guard
//!
//! This is the main entry point for the DNS flood guard.
//! It initializes the detection engine, the mitigation driver and the
//! packet-in HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};
use metrics_exporter_prometheus::PrometheusBuilder;

use dns_flood_guard::api::{self, ApiState};
use dns_flood_guard::config;
use dns_flood_guard::core::{mitigation_queue, DetectionEngine, FloodlightClient, MitigationDriver};
use dns_flood_guard::utils::SystemClock;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting DNS Flood Guard...");

    // Load configuration
    let config = config::load_config().context("Failed to load configuration")?;
    let config = Arc::new(config);

    if config.metrics.enabled {
        let addr: SocketAddr = config
            .metrics
            .listen_address
            .parse()
            .context("Invalid metrics listen address")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exported on {}", addr);
    }

    // Initialize mitigation driver
    let controller = FloodlightClient::new(&config.controller).context("Failed to create controller client")?;
    let (queue, requests) = mitigation_queue(config.mitigation.queue_capacity);
    let driver = MitigationDriver::new(
        Arc::new(controller),
        config.detection.dns_port,
        config.mitigation.rule_priority,
    );
    tokio::spawn(driver.run(requests));

    // Initialize detection engine
    let engine = Arc::new(DetectionEngine::new(
        config.detection.clone(),
        Arc::new(SystemClock),
        queue,
    ));

    if config.detection.tick_rollover {
        info!("Closing windows every {} ms on a timer", config.detection.window_ms);
        let engine = engine.clone();
        let period = Duration::from_millis(config.detection.window_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                engine.tick();
            }
        });
    } else {
        warn!("Windows close on the first packet after each boundary; sparse traffic stretches windows");
    }

    // Create API state
    let state = web::Data::new(ApiState {
        engine,
        config: config.clone(),
    });

    // Start HTTP server
    info!("Listening for packet-in events on {}:{}", config.server.host, config.server.port);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::config))
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;

    Ok(())
}
