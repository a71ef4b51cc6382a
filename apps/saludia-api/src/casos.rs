//! Almacén de casos: creación, consulta, edición clínica y snapshot
//!
//! Las ediciones clínicas regeneran la sugerencia (el oráculo es síncrono)
//! y nunca alteran `estado`; solo las acciones de decisión mueven el estado.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::oraculo::{self, OraculoSugerencias};
use saludia_db::models::{Caso, CasoResumen, EstadoCaso, RolUsuario, Sugerencia};

/// Datos requeridos para registrar un caso nuevo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NuevoCaso {
    #[validate(length(min = 1, message = "el nombre del paciente es obligatorio"))]
    pub nombre_paciente: String,
    #[validate(range(min = 0, max = 130, message = "edad fuera de rango"))]
    pub edad: i32,
    #[validate(length(min = 1, message = "el sexo es obligatorio"))]
    pub sexo: String,
    #[validate(email(message = "correo de paciente inválido"))]
    pub email_paciente: String,
    #[validate(length(min = 1, message = "el diagnóstico es obligatorio"))]
    pub diagnostico: String,
    pub episodio: Option<String>,
    pub sintomas: Option<String>,
    pub historia_clinica: Option<String>,
    pub presion_arterial: Option<String>,
    pub frecuencia_cardiaca: Option<i32>,
    pub temperatura: Option<f64>,
    pub saturacion_o2: Option<i32>,
    pub frecuencia_respiratoria: Option<i32>,
    pub prevision: Option<String>,
    pub aseguradora: Option<String>,
}

/// Edición de datos clínicos; cada campo presente reemplaza al actual
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EdicionClinica {
    #[validate(length(min = 1, message = "el diagnóstico no puede quedar vacío"))]
    pub diagnostico: Option<String>,
    pub sintomas: Option<String>,
    pub historia_clinica: Option<String>,
    pub presion_arterial: Option<String>,
    pub frecuencia_cardiaca: Option<i32>,
    pub temperatura: Option<f64>,
    pub saturacion_o2: Option<i32>,
    pub frecuencia_respiratoria: Option<i32>,
}

/// Fotografía de caso + sugerencia previa a una edición
///
/// La cancelación de edición restaura ambos valores textualmente
/// (reemplazo completo, no mezcla). Es la única operación del sistema
/// que revierte estado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCaso {
    pub caso: Caso,
    pub sugerencia: Option<Sugerencia>,
}

/// Crea un caso en estado pendiente y le adjunta su sugerencia inicial
pub async fn crear_caso(
    pool: &SqlitePool,
    oraculo_ia: &dyn OraculoSugerencias,
    medico_tratante_id: Uuid,
    nuevo: NuevoCaso,
) -> Result<(Caso, Sugerencia), ApiError> {
    nuevo.validate()?;

    let id = Uuid::new_v4();
    let ahora = Utc::now();

    sqlx::query(
        "INSERT INTO casos (
            id, created_at, updated_at, episodio, nombre_paciente, edad, sexo,
            email_paciente, diagnostico, sintomas, historia_clinica,
            presion_arterial, frecuencia_cardiaca, temperatura, saturacion_o2,
            frecuencia_respiratoria, estado, medico_tratante_id, prevision, aseguradora
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pendiente', ?, ?, ?)",
    )
    .bind(id)
    .bind(ahora)
    .bind(ahora)
    .bind(&nuevo.episodio)
    .bind(&nuevo.nombre_paciente)
    .bind(nuevo.edad)
    .bind(&nuevo.sexo)
    .bind(&nuevo.email_paciente)
    .bind(&nuevo.diagnostico)
    .bind(&nuevo.sintomas)
    .bind(&nuevo.historia_clinica)
    .bind(&nuevo.presion_arterial)
    .bind(nuevo.frecuencia_cardiaca)
    .bind(nuevo.temperatura)
    .bind(nuevo.saturacion_o2)
    .bind(nuevo.frecuencia_respiratoria)
    .bind(medico_tratante_id)
    .bind(&nuevo.prevision)
    .bind(&nuevo.aseguradora)
    .execute(pool)
    .await?;

    let caso = obtener_caso(pool, id).await?;
    let generada = oraculo_ia.evaluar(&caso);
    let sugerencia = oraculo::reemplazar_sugerencia(pool, id, generada).await?;
    let caso = obtener_caso(pool, id).await?;

    info!(caso_id = %id, medico = %medico_tratante_id, "caso creado");
    Ok((caso, sugerencia))
}

/// Busca un caso por id
pub async fn obtener_caso(pool: &SqlitePool, caso_id: Uuid) -> Result<Caso, ApiError> {
    sqlx::query_as::<_, Caso>("SELECT * FROM casos WHERE id = ?")
        .bind(caso_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NoEncontrado(format!("caso {}", caso_id)))
}

/// Sugerencia vigente de un caso, según el puntero del propio caso
pub async fn sugerencia_actual(
    pool: &SqlitePool,
    caso: &Caso,
) -> Result<Option<Sugerencia>, ApiError> {
    let Some(sugerencia_id) = caso.sugerencia_actual_id else {
        return Ok(None);
    };
    let sugerencia = sqlx::query_as::<_, Sugerencia>("SELECT * FROM sugerencia_ia WHERE id = ?")
        .bind(sugerencia_id)
        .fetch_optional(pool)
        .await?;
    Ok(sugerencia)
}

/// Listado de cola según el rol del solicitante
///
/// Los médicos tratantes ven sus propios casos; jefatura ve el pool de
/// derivados más los casos cerrados (que puede re-resolver); admin ve todo.
pub async fn listar_casos(
    pool: &SqlitePool,
    usuario_id: Uuid,
    rol: RolUsuario,
    estado: Option<EstadoCaso>,
) -> Result<Vec<CasoResumen>, ApiError> {
    let filas = match rol {
        RolUsuario::MedicoTratante => {
            sqlx::query_as::<_, CasoResumen>(
                "SELECT * FROM casos WHERE medico_tratante_id = ?
                 AND (? IS NULL OR estado = ?)
                 ORDER BY updated_at DESC",
            )
            .bind(usuario_id)
            .bind(estado.map(|e| e.as_str()))
            .bind(estado.map(|e| e.as_str()))
            .fetch_all(pool)
            .await?
        }
        RolUsuario::MedicoJefe => {
            sqlx::query_as::<_, CasoResumen>(
                "SELECT * FROM casos WHERE estado IN ('derivado', 'aceptado', 'rechazado')
                 AND (? IS NULL OR estado = ?)
                 ORDER BY updated_at DESC",
            )
            .bind(estado.map(|e| e.as_str()))
            .bind(estado.map(|e| e.as_str()))
            .fetch_all(pool)
            .await?
        }
        RolUsuario::Admin => {
            sqlx::query_as::<_, CasoResumen>(
                "SELECT * FROM casos WHERE (? IS NULL OR estado = ?)
                 ORDER BY updated_at DESC",
            )
            .bind(estado.map(|e| e.as_str()))
            .bind(estado.map(|e| e.as_str()))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(filas)
}

/// Captura el snapshot previo a una edición
pub async fn capturar_snapshot(pool: &SqlitePool, caso_id: Uuid) -> Result<SnapshotCaso, ApiError> {
    let caso = obtener_caso(pool, caso_id).await?;
    let sugerencia = sugerencia_actual(pool, &caso).await?;
    Ok(SnapshotCaso { caso, sugerencia })
}

/// Aplica una edición clínica
///
/// Actualiza los campos presentes, marca `actualizado_tras_evaluacion`
/// cuando ya existe una fila de resolución y regenera la sugerencia.
/// El `estado` del caso no cambia por una edición.
pub async fn editar_clinica(
    pool: &SqlitePool,
    oraculo_ia: &dyn OraculoSugerencias,
    caso_id: Uuid,
    edicion: EdicionClinica,
) -> Result<(Caso, Sugerencia), ApiError> {
    edicion.validate()?;

    let caso = obtener_caso(pool, caso_id).await?;

    let evaluado: Option<(Uuid,)> =
        sqlx::query_as("SELECT caso_id FROM resolucion_caso WHERE caso_id = ?")
            .bind(caso_id)
            .fetch_optional(pool)
            .await?;
    let marca_advertencia = evaluado.is_some();

    sqlx::query(
        "UPDATE casos SET
            diagnostico = COALESCE(?, diagnostico),
            sintomas = COALESCE(?, sintomas),
            historia_clinica = COALESCE(?, historia_clinica),
            presion_arterial = COALESCE(?, presion_arterial),
            frecuencia_cardiaca = COALESCE(?, frecuencia_cardiaca),
            temperatura = COALESCE(?, temperatura),
            saturacion_o2 = COALESCE(?, saturacion_o2),
            frecuencia_respiratoria = COALESCE(?, frecuencia_respiratoria),
            actualizado_tras_evaluacion = CASE WHEN ? THEN 1 ELSE actualizado_tras_evaluacion END,
            updated_at = ?
         WHERE id = ?",
    )
    .bind(&edicion.diagnostico)
    .bind(&edicion.sintomas)
    .bind(&edicion.historia_clinica)
    .bind(&edicion.presion_arterial)
    .bind(edicion.frecuencia_cardiaca)
    .bind(edicion.temperatura)
    .bind(edicion.saturacion_o2)
    .bind(edicion.frecuencia_respiratoria)
    .bind(marca_advertencia)
    .bind(Utc::now())
    .bind(caso_id)
    .execute(pool)
    .await?;

    let caso_editado = obtener_caso(pool, caso_id).await?;
    let generada = oraculo_ia.evaluar(&caso_editado);
    let sugerencia = oraculo::reemplazar_sugerencia(pool, caso_id, generada).await?;
    let caso_editado = obtener_caso(pool, caso_id).await?;

    info!(caso_id = %caso_id, estado = %caso.estado, "edición clínica aplicada");
    Ok((caso_editado, sugerencia))
}

/// Restaura un caso desde el snapshot capturado antes de editar
///
/// Reemplazo completo de los campos clínicos y de la sugerencia, y limpieza
/// de la marca de advertencia. No toca `estado`, la bitácora de resolución
/// ni el estado de la aseguradora.
pub async fn cancelar_edicion(
    pool: &SqlitePool,
    snapshot: &SnapshotCaso,
) -> Result<Caso, ApiError> {
    let previo = &snapshot.caso;
    // El snapshot debe corresponder a un caso existente
    obtener_caso(pool, previo.id).await?;

    sqlx::query(
        "UPDATE casos SET
            nombre_paciente = ?, edad = ?, sexo = ?, email_paciente = ?,
            diagnostico = ?, sintomas = ?, historia_clinica = ?,
            presion_arterial = ?, frecuencia_cardiaca = ?, temperatura = ?,
            saturacion_o2 = ?, frecuencia_respiratoria = ?,
            actualizado_tras_evaluacion = 0,
            updated_at = ?, ai_analyzed_at = ?, sugerencia_actual_id = NULL
         WHERE id = ?",
    )
    .bind(&previo.nombre_paciente)
    .bind(previo.edad)
    .bind(&previo.sexo)
    .bind(&previo.email_paciente)
    .bind(&previo.diagnostico)
    .bind(&previo.sintomas)
    .bind(&previo.historia_clinica)
    .bind(&previo.presion_arterial)
    .bind(previo.frecuencia_cardiaca)
    .bind(previo.temperatura)
    .bind(previo.saturacion_o2)
    .bind(previo.frecuencia_respiratoria)
    .bind(previo.updated_at)
    .bind(previo.ai_analyzed_at)
    .bind(previo.id)
    .execute(pool)
    .await?;

    match &snapshot.sugerencia {
        Some(sugerencia) => oraculo::restaurar_sugerencia(pool, sugerencia).await?,
        None => {
            sqlx::query("DELETE FROM sugerencia_ia WHERE caso_id = ?")
                .bind(previo.id)
                .execute(pool)
                .await?;
        }
    }

    info!(caso_id = %previo.id, "edición cancelada, snapshot restaurado");
    obtener_caso(pool, previo.id).await
}
