//! API endpoints for the DNS flood guard.
//!
//! The controller forwards DNS packet-in events here; operators can query
//! the ban state of a source and the service health.

use std::net::Ipv4Addr;
use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::core::{DetectionEngine, EventOutcome};
use crate::models::{BanStatusResponse, Config, PacketInRequest, PacketInResponse, PacketVerdict};

pub struct ApiState {
    pub engine: Arc<DetectionEngine>,
    pub config: Arc<Config>,
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/health").route(web::get().to(health_check)))
            .service(web::resource("/packet-in").route(web::post().to(packet_in)))
            .service(web::resource("/bans/{source}").route(web::get().to(ban_status))),
    );
}

/// Health check endpoint response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    tracked_domains: usize,
    ban_records: usize,
}

/// Health check endpoint
async fn health_check(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tracked_domains: state.engine.tracked_domains(),
        ban_records: state.engine.active_bans(),
    })
}

/// Packet-in endpoint. Only UDP datagrams to the DNS port reach the engine.
pub async fn packet_in(state: web::Data<ApiState>, req: web::Json<PacketInRequest>) -> impl Responder {
    let dns_port = state.config.detection.dns_port;
    if !req.protocol.eq_ignore_ascii_case("udp") || req.destination_port != dns_port {
        return HttpResponse::Ok().json(PacketInResponse {
            verdict: PacketVerdict::Ignored,
            remaining_seconds: None,
            floods: Vec::new(),
        });
    }

    let response = match state.engine.handle_query(req.source_address, &req.payload) {
        EventOutcome::Recorded => PacketInResponse {
            verdict: PacketVerdict::Recorded,
            remaining_seconds: None,
            floods: Vec::new(),
        },
        EventOutcome::WindowClosed(report) => PacketInResponse {
            verdict: PacketVerdict::WindowClosed,
            remaining_seconds: None,
            floods: report.floods().map(|v| v.domain.clone()).collect(),
        },
        EventOutcome::Dropped { remaining_seconds } => PacketInResponse {
            verdict: PacketVerdict::Dropped,
            remaining_seconds: Some(remaining_seconds),
            floods: Vec::new(),
        },
        EventOutcome::Malformed => PacketInResponse {
            verdict: PacketVerdict::Malformed,
            remaining_seconds: None,
            floods: Vec::new(),
        },
    };

    HttpResponse::Ok().json(response)
}

/// Ban status endpoint
async fn ban_status(state: web::Data<ApiState>, path: web::Path<String>) -> impl Responder {
    let source: Ipv4Addr = match path.parse() {
        Ok(source) => source,
        Err(_) => return HttpResponse::BadRequest().body("invalid IPv4 address"),
    };

    let banned = state.engine.is_banned(source);
    HttpResponse::Ok().json(BanStatusResponse {
        source,
        banned,
        remaining_seconds: if banned { state.engine.remaining_seconds(source) } else { 0 },
    })
}
