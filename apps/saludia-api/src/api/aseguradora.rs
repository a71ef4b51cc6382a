//! Handlers del seguimiento de resoluciones de la aseguradora

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::aseguradora::{self, ResumenImportacion};
use crate::auth::UsuarioActual;
use crate::error::ApiError;
use crate::planilla;
use crate::state::AppState;
use saludia_db::models::{ResolucionAseguradora, RolUsuario};

#[derive(Debug, Deserialize)]
pub struct AnulacionManual {
    pub resolucion: ResolucionAseguradora,
}

/// Cambio manual del estado de aseguradora de un caso aceptado
pub async fn anular_manual(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(peticion): Json<AnulacionManual>,
) -> Result<StatusCode, ApiError> {
    usuario.exigir_rol(RolUsuario::Admin)?;
    aseguradora::cambiar_resolucion_manual(&state.pool, caso_id, peticion.resolucion).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LoteTexto {
    pub contenido: String,
}

/// Importación masiva desde texto `episodio,etiqueta`
pub async fn importar_texto(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Json(lote): Json<LoteTexto>,
) -> Result<Json<ResumenImportacion>, ApiError> {
    usuario.exigir_rol(RolUsuario::Admin)?;
    let resumen = aseguradora::importar_lote(&state.pool, &lote.contenido).await?;
    Ok(Json(resumen))
}

#[derive(Debug, Deserialize)]
pub struct LotePlanilla {
    pub filas: Vec<Vec<String>>,
}

/// Importación masiva desde filas de planilla (Episodio / Validación)
pub async fn importar_planilla(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Json(lote): Json<LotePlanilla>,
) -> Result<Json<ResumenImportacion>, ApiError> {
    usuario.exigir_rol(RolUsuario::Admin)?;
    let texto = planilla::traducir_planilla(&lote.filas)?;
    let resumen = aseguradora::importar_lote(&state.pool, &texto).await?;
    Ok(Json(resumen))
}
