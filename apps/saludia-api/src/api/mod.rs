//! Enrutamiento HTTP del servicio

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod admin;
mod aseguradora;
mod casos;
mod notificaciones;

/// Construye el router completo con sus capas
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/casos", post(casos::crear).get(casos::listar))
        .route("/casos/:id", get(casos::obtener).put(casos::editar))
        .route("/casos/:id/decision", post(casos::decidir))
        .route("/casos/:id/resolucion-final", post(casos::resolucion_final))
        .route("/casos/:id/cancelar-edicion", post(casos::cancelar_edicion))
        .route("/casos/:id/notificar-paciente", post(casos::notificar_paciente))
        .route("/aseguradora/casos/:id", post(aseguradora::anular_manual))
        .route("/aseguradora/importar", post(aseguradora::importar_texto))
        .route(
            "/aseguradora/importar-planilla",
            post(aseguradora::importar_planilla),
        )
        .route("/notificaciones", get(notificaciones::listar))
        .route("/notificaciones/:id/leer", post(notificaciones::marcar_leida))
        .route("/usuarios/:id", delete(admin::borrar_usuario))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(512))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": crate::built_info::PKG_VERSION,
    }))
}
