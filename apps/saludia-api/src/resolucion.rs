//! Servicio de resolución: aplica decisiones clínicas de punta a punta
//!
//! Cada decisión se evalúa con la tabla de transiciones y, si es válida, sus
//! escrituras (bitácora de resolución, estado del caso, notificaciones) se
//! ejecutan dentro de una única transacción: o se aplican todas o ninguna.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::auth::UsuarioActual;
use crate::casos;
use crate::error::ApiError;
use crate::notificaciones;
use crate::transiciones::{self, EntradaTransicion, ObjetivoNotificacion, ResultadoTransicion};
use saludia_db::models::{
    Caso, DecisionClinica, EstadoCaso, PolaridadSugerencia, ResolucionAseguradora, RolUsuario,
};
use serde::Deserialize;

/// Petición de decisión clínica sobre un caso
#[derive(Debug, Clone, Deserialize)]
pub struct SolicitudDecision {
    pub decision: DecisionClinica,
    pub comentario: Option<String>,
}

fn comentario_normalizado(comentario: &Option<String>) -> Option<&str> {
    comentario
        .as_deref()
        .map(str::trim)
        .filter(|texto| !texto.is_empty())
}

/// Aplica una decisión clínica sobre un caso
///
/// Valida propiedad y rol, evalúa la transición (sin escrituras si falla) y
/// ejecuta los efectos de forma atómica. Devuelve el caso actualizado.
pub async fn aplicar_decision(
    pool: &SqlitePool,
    actor: &UsuarioActual,
    caso_id: Uuid,
    solicitud: SolicitudDecision,
) -> Result<Caso, ApiError> {
    let caso = casos::obtener_caso(pool, caso_id).await?;

    // Un médico tratante solo decide sobre sus propios casos
    if actor.rol == RolUsuario::MedicoTratante && caso.medico_tratante_id != actor.id {
        return Err(ApiError::AccesoDenegado(
            "el caso pertenece a otro médico tratante".to_string(),
        ));
    }

    let polaridad = casos::sugerencia_actual(pool, &caso)
        .await?
        .map(|s| s.sugerencia)
        .unwrap_or(PolaridadSugerencia::Incierto);

    let comentario = comentario_normalizado(&solicitud.comentario);

    let resultado = transiciones::evaluar(EntradaTransicion {
        rol: actor.rol,
        estado_actual: caso.estado,
        decision: solicitud.decision,
        sugerencia: polaridad,
        tiene_justificacion: comentario.is_some(),
        resolucion_aseguradora: caso.resolucion_aseguradora,
    })?;

    let mut tx = pool.begin().await?;
    escribir_resolucion(&mut tx, &caso, solicitud.decision, comentario, &resultado).await?;
    actualizar_caso(&mut tx, &caso, actor, &resultado).await?;
    emitir_notificaciones(&mut tx, &caso, &resultado).await?;
    tx.commit().await?;

    info!(
        caso_id = %caso_id,
        actor = %actor.id,
        rol = %actor.rol,
        nuevo_estado = %resultado.nuevo_estado,
        "decisión aplicada"
    );

    casos::obtener_caso(pool, caso_id).await
}

/// Upsert de la bitácora de resolución (a lo más una fila por caso)
async fn escribir_resolucion(
    tx: &mut Transaction<'_, Sqlite>,
    caso: &Caso,
    decision: DecisionClinica,
    comentario: Option<&str>,
    resultado: &ResultadoTransicion,
) -> Result<(), ApiError> {
    let ahora = Utc::now();

    if resultado.registra_decision_medico {
        // Decisión del médico tratante; si además cierra el caso, la misma
        // decisión queda como final
        let decision_final = resultado.decision_final.map(|d| d.as_str());
        sqlx::query(
            "INSERT INTO resolucion_caso
                (caso_id, decision_medico, comentario_medico, fecha_decision_medico,
                 decision_final, comentario_final)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (caso_id) DO UPDATE SET
                decision_medico = excluded.decision_medico,
                comentario_medico = excluded.comentario_medico,
                fecha_decision_medico = excluded.fecha_decision_medico,
                decision_final = excluded.decision_final,
                comentario_final = excluded.comentario_final",
        )
        .bind(caso.id)
        .bind(decision.as_str())
        .bind(comentario)
        .bind(ahora)
        .bind(decision_final)
        .bind(resultado.decision_final.and(comentario))
        .execute(&mut **tx)
        .await?;
    } else {
        // Decisión final de jefatura; la decisión inicial del tratante se conserva
        sqlx::query(
            "INSERT INTO resolucion_caso
                (caso_id, decision_final, comentario_final, fecha_decision_medico_jefe)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (caso_id) DO UPDATE SET
                decision_final = excluded.decision_final,
                comentario_final = excluded.comentario_final,
                fecha_decision_medico_jefe = excluded.fecha_decision_medico_jefe",
        )
        .bind(caso.id)
        .bind(decision.as_str())
        .bind(comentario)
        .bind(ahora)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Actualiza estado, reclamo de jefatura y estado de aseguradora del caso
async fn actualizar_caso(
    tx: &mut Transaction<'_, Sqlite>,
    caso: &Caso,
    actor: &UsuarioActual,
    resultado: &ResultadoTransicion,
) -> Result<(), ApiError> {
    // La aseguradora solo tiene sentido con el caso aceptado: se inicializa
    // en pendiente al aceptar (conservando un estado previo si lo había) y
    // se limpia al rechazar
    let resolucion_aseguradora = match resultado.nuevo_estado {
        EstadoCaso::Aceptado => Some(
            caso.resolucion_aseguradora
                .unwrap_or(ResolucionAseguradora::Pendiente),
        ),
        _ => None,
    };

    let medico_jefe_id = if resultado.reclama_jefatura {
        caso.medico_jefe_id.or(Some(actor.id))
    } else {
        caso.medico_jefe_id
    };

    sqlx::query(
        "UPDATE casos SET estado = ?, medico_jefe_id = ?, resolucion_aseguradora = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(resultado.nuevo_estado.as_str())
    .bind(medico_jefe_id)
    .bind(resolucion_aseguradora.map(|r| r.as_str()))
    .bind(Utc::now())
    .bind(caso.id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Inserta las notificaciones que exige la transición
async fn emitir_notificaciones(
    tx: &mut Transaction<'_, Sqlite>,
    caso: &Caso,
    resultado: &ResultadoTransicion,
) -> Result<(), ApiError> {
    match resultado.notificar {
        None => Ok(()),
        Some(ObjetivoNotificacion::MedicoTratante) => {
            let decision = resultado
                .decision_final
                .map(|d| d.as_str())
                .unwrap_or("resuelto");
            notificaciones::insertar(
                tx,
                caso.medico_tratante_id,
                caso.id,
                "Caso resuelto por jefatura",
                &format!(
                    "El caso del paciente {} fue resuelto como {}.",
                    caso.nombre_paciente, decision
                ),
            )
            .await
        }
        Some(ObjetivoNotificacion::PoolJefes) => {
            // Modelo pull: el caso aparece en la cola de jefatura; las filas
            // de notificación alimentan además la campana de cada jefe
            let jefes: Vec<(Uuid,)> =
                sqlx::query_as("SELECT user_id FROM user_roles WHERE role = 'medico_jefe'")
                    .fetch_all(&mut **tx)
                    .await?;
            for (jefe_id,) in jefes {
                notificaciones::insertar(
                    tx,
                    jefe_id,
                    caso.id,
                    "Caso derivado",
                    &format!(
                        "El caso del paciente {} fue derivado para resolución de jefatura.",
                        caso.nombre_paciente
                    ),
                )
                .await?;
            }
            Ok(())
        }
    }
}
