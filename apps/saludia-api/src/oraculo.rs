//! Oráculo de sugerencias de IA
//!
//! El contrato real del que depende el resto del sistema es mínimo: produce
//! exactamente una sugerencia de forma síncrona tras crear o editar un caso,
//! reemplazando cualquier sugerencia previa. La implementación actual es un
//! stub aleatorio; la máquina de estados no asume determinismo ni corrección.

use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use saludia_db::models::{Caso, PolaridadSugerencia, Sugerencia};

/// Sugerencia recién generada, aún sin persistir
#[derive(Debug, Clone)]
pub struct SugerenciaGenerada {
    pub sugerencia: PolaridadSugerencia,
    pub confianza: i32,
    pub explicacion: String,
}

/// Dependencia inyectada que evalúa un caso y emite una recomendación
#[cfg_attr(test, mockall::automock)]
pub trait OraculoSugerencias: Send + Sync {
    fn evaluar(&self, caso: &Caso) -> SugerenciaGenerada;
}

/// Implementación stub: elección uniforme con confianza entre 70 y 99
pub struct OraculoAleatorio;

impl OraculoSugerencias for OraculoAleatorio {
    fn evaluar(&self, caso: &Caso) -> SugerenciaGenerada {
        let mut rng = rand::thread_rng();
        let acepta = rng.gen_bool(0.5);
        let confianza = rng.gen_range(70..=99);

        let (sugerencia, veredicto) = if acepta {
            (PolaridadSugerencia::Aceptar, "cumpliría")
        } else {
            (PolaridadSugerencia::Rechazar, "no cumpliría")
        };

        SugerenciaGenerada {
            sugerencia,
            confianza,
            explicacion: format!(
                "Según el análisis preliminar del cuadro \"{}\", el caso {} los criterios de la Ley de Urgencia (confianza {}%).",
                caso.diagnostico, veredicto, confianza
            ),
        }
    }
}

/// Reemplaza la sugerencia vigente de un caso
///
/// Borra todas las filas previas, inserta la nueva y actualiza el puntero
/// `sugerencia_actual_id` del caso, todo dentro de una transacción. El
/// puntero es la fuente autoritativa de "sugerencia vigente"; el orden por
/// timestamp es solo informativo.
pub async fn reemplazar_sugerencia(
    pool: &SqlitePool,
    caso_id: Uuid,
    generada: SugerenciaGenerada,
) -> Result<Sugerencia, ApiError> {
    let ahora = Utc::now();
    let nueva = Sugerencia {
        id: Uuid::new_v4(),
        caso_id,
        sugerencia: generada.sugerencia,
        confianza: generada.confianza,
        explicacion: generada.explicacion,
        processed_at: ahora,
    };

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM sugerencia_ia WHERE caso_id = ?")
        .bind(caso_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO sugerencia_ia (id, caso_id, sugerencia, confianza, explicacion, processed_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(nueva.id)
    .bind(nueva.caso_id)
    .bind(nueva.sugerencia.as_str())
    .bind(nueva.confianza)
    .bind(&nueva.explicacion)
    .bind(nueva.processed_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE casos SET sugerencia_actual_id = ?, ai_analyzed_at = ? WHERE id = ?")
        .bind(nueva.id)
        .bind(ahora)
        .bind(caso_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    debug!(caso_id = %caso_id, sugerencia = nueva.sugerencia.as_str(), "sugerencia reemplazada");
    Ok(nueva)
}

/// Restaura una sugerencia puntual desde un snapshot (cancelación de edición)
pub async fn restaurar_sugerencia(
    pool: &SqlitePool,
    sugerencia: &Sugerencia,
) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM sugerencia_ia WHERE caso_id = ?")
        .bind(sugerencia.caso_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO sugerencia_ia (id, caso_id, sugerencia, confianza, explicacion, processed_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(sugerencia.id)
    .bind(sugerencia.caso_id)
    .bind(sugerencia.sugerencia.as_str())
    .bind(sugerencia.confianza)
    .bind(&sugerencia.explicacion)
    .bind(sugerencia.processed_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE casos SET sugerencia_actual_id = ? WHERE id = ?")
        .bind(sugerencia.id)
        .bind(sugerencia.caso_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
