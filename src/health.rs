use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": "audio-capture-backend",
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "capture": {
            "active_sessions": metrics.active_sessions,
            "connections_total": metrics.connections_total,
            "bytes_received": metrics.bytes_received,
            "streams_persisted": metrics.streams_persisted
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    let session_usage = if config.stream.max_concurrent_sessions > 0 {
        metrics.active_sessions as f64 / config.stream.max_concurrent_sessions as f64
    } else {
        0.0
    };

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "capture": {
            "active_sessions": metrics.active_sessions,
            "connections_total": metrics.connections_total,
            "bytes_received": metrics.bytes_received,
            "streams_persisted": metrics.streams_persisted,
            "protocol_violations": metrics.protocol_violations,
            "bytes_per_second": if uptime_seconds > 0 {
                metrics.bytes_received as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "limits": {
            "max_concurrent_sessions": config.stream.max_concurrent_sessions,
            "session_usage_percent": (session_usage * 100.0).round()
        },
        "storage": {
            "data_dir": config.storage.data_dir
        }
    }))
}
