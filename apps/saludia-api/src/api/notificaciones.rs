//! Handlers de la campana de notificaciones

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::auth::UsuarioActual;
use crate::error::ApiError;
use crate::notificaciones;
use crate::state::AppState;
use saludia_db::models::Notificacion;

pub async fn listar(
    State(state): State<AppState>,
    usuario: UsuarioActual,
) -> Result<Json<Vec<Notificacion>>, ApiError> {
    let filas = notificaciones::listar_para(&state.pool, usuario.id).await?;
    Ok(Json(filas))
}

pub async fn marcar_leida(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(notificacion_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    notificaciones::marcar_leida(&state.pool, usuario.id, notificacion_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
