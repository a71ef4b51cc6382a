//! Handlers de casos: creación, consulta, edición y decisiones

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::CorreoPaciente;
use crate::auth::UsuarioActual;
use crate::casos::{self, EdicionClinica, NuevoCaso, SnapshotCaso};
use crate::error::ApiError;
use crate::resolucion::{self, SolicitudDecision};
use crate::state::AppState;
use saludia_db::models::{Caso, CasoResumen, EstadoCaso, RolUsuario, Sugerencia};

/// Caso junto a su sugerencia vigente
#[derive(Debug, Serialize)]
pub struct CasoConSugerencia {
    #[serde(flatten)]
    pub caso: Caso,
    pub sugerencia: Option<Sugerencia>,
}

pub async fn crear(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Json(nuevo): Json<NuevoCaso>,
) -> Result<(StatusCode, Json<CasoConSugerencia>), ApiError> {
    usuario.exigir_rol(RolUsuario::MedicoTratante)?;
    let (caso, sugerencia) =
        casos::crear_caso(&state.pool, state.oraculo.as_ref(), usuario.id, nuevo).await?;
    Ok((
        StatusCode::CREATED,
        Json(CasoConSugerencia {
            caso,
            sugerencia: Some(sugerencia),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct FiltroListado {
    pub estado: Option<EstadoCaso>,
}

pub async fn listar(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Query(filtro): Query<FiltroListado>,
) -> Result<Json<Vec<CasoResumen>>, ApiError> {
    let filas = casos::listar_casos(&state.pool, usuario.id, usuario.rol, filtro.estado).await?;
    Ok(Json(filas))
}

pub async fn obtener(
    State(state): State<AppState>,
    _usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
) -> Result<Json<CasoConSugerencia>, ApiError> {
    let caso = casos::obtener_caso(&state.pool, caso_id).await?;
    let sugerencia = casos::sugerencia_actual(&state.pool, &caso).await?;
    Ok(Json(CasoConSugerencia { caso, sugerencia }))
}

/// Respuesta de edición: incluye el snapshot previo para poder cancelar
#[derive(Debug, Serialize)]
pub struct RespuestaEdicion {
    pub caso: Caso,
    pub sugerencia: Sugerencia,
    pub snapshot_previo: SnapshotCaso,
}

pub async fn editar(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(edicion): Json<EdicionClinica>,
) -> Result<Json<RespuestaEdicion>, ApiError> {
    autorizar_sobre_caso(&state, &usuario, caso_id).await?;
    let snapshot_previo = casos::capturar_snapshot(&state.pool, caso_id).await?;
    let (caso, sugerencia) =
        casos::editar_clinica(&state.pool, state.oraculo.as_ref(), caso_id, edicion).await?;
    Ok(Json(RespuestaEdicion {
        caso,
        sugerencia,
        snapshot_previo,
    }))
}

pub async fn cancelar_edicion(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(snapshot): Json<SnapshotCaso>,
) -> Result<Json<Caso>, ApiError> {
    autorizar_sobre_caso(&state, &usuario, caso_id).await?;
    if snapshot.caso.id != caso_id {
        return Err(ApiError::Validacion(
            "el snapshot no corresponde al caso indicado".to_string(),
        ));
    }
    let caso = casos::cancelar_edicion(&state.pool, &snapshot).await?;
    Ok(Json(caso))
}

/// Decisión del médico tratante sobre su caso pendiente
pub async fn decidir(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(solicitud): Json<SolicitudDecision>,
) -> Result<Json<Caso>, ApiError> {
    usuario.exigir_rol(RolUsuario::MedicoTratante)?;
    let caso = resolucion::aplicar_decision(&state.pool, &usuario, caso_id, solicitud).await?;
    Ok(Json(caso))
}

/// Resolución final de jefatura (casos derivados o reabiertos)
pub async fn resolucion_final(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(solicitud): Json<SolicitudDecision>,
) -> Result<Json<Caso>, ApiError> {
    usuario.exigir_rol(RolUsuario::MedicoJefe)?;
    let caso = resolucion::aplicar_decision(&state.pool, &usuario, caso_id, solicitud).await?;
    Ok(Json(caso))
}

#[derive(Debug, Deserialize)]
pub struct NotificarPaciente {
    pub comentario_adicional: Option<String>,
}

/// Envía al paciente el correo con el resultado de su caso
pub async fn notificar_paciente(
    State(state): State<AppState>,
    usuario: UsuarioActual,
    Path(caso_id): Path<Uuid>,
    Json(peticion): Json<NotificarPaciente>,
) -> Result<StatusCode, ApiError> {
    autorizar_sobre_caso(&state, &usuario, caso_id).await?;
    let caso = casos::obtener_caso(&state.pool, caso_id).await?;

    if !caso.estado.es_terminal() {
        return Err(ApiError::Validacion(
            "el caso aún no tiene resultado que informar".to_string(),
        ));
    }

    let sugerencia = casos::sugerencia_actual(&state.pool, &caso).await?;
    let correo = CorreoPaciente {
        to: caso.email_paciente.clone(),
        patient_name: caso.nombre_paciente.clone(),
        diagnosis: caso.diagnostico.clone(),
        result: caso.estado.to_string(),
        explanation: sugerencia.map(|s| s.explicacion).unwrap_or_default(),
        additional_comment: peticion.comentario_adicional,
    };

    // Una falla del servicio de correo llega al usuario como error remoto
    state.correo.enviar(&correo).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Propiedad: el tratante solo opera sus casos; jefatura y admin, cualquiera
async fn autorizar_sobre_caso(
    state: &AppState,
    usuario: &UsuarioActual,
    caso_id: Uuid,
) -> Result<(), ApiError> {
    if usuario.rol != RolUsuario::MedicoTratante {
        return Ok(());
    }
    let caso = casos::obtener_caso(&state.pool, caso_id).await?;
    if caso.medico_tratante_id != usuario.id {
        return Err(ApiError::AccesoDenegado(
            "el caso pertenece a otro médico tratante".to_string(),
        ));
    }
    Ok(())
}
