//! Handlers administrativos

use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::auth::UsuarioActual;
use crate::error::ApiError;
use crate::state::AppState;
use saludia_db::models::RolUsuario;

/// Elimina la identidad externa de un usuario y su fila local de rol
///
/// La acción remota va primero: si falla, la fila local queda intacta.
pub async fn borrar_usuario(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    usuario.exigir_rol(RolUsuario::Admin)?;

    state.usuarios.borrar(user_id).await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
