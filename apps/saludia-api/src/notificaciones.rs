//! Emisión y consulta de notificaciones de la campana
//!
//! Las filas se crean como efecto de las transiciones de derivación y
//! resolución; el destinatario solo puede marcar como leídas las suyas.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use saludia_db::models::Notificacion;

/// Inserta una notificación dentro de la transacción en curso
pub async fn insertar(
    tx: &mut Transaction<'_, Sqlite>,
    usuario_id: Uuid,
    caso_id: Uuid,
    titulo: &str,
    mensaje: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO notificaciones (id, usuario_id, caso_id, titulo, mensaje, leida, created_at)
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(usuario_id)
    .bind(caso_id)
    .bind(titulo)
    .bind(mensaje)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Notificaciones del usuario, no leídas primero
pub async fn listar_para(
    pool: &SqlitePool,
    usuario_id: Uuid,
) -> Result<Vec<Notificacion>, ApiError> {
    let filas = sqlx::query_as::<_, Notificacion>(
        "SELECT * FROM notificaciones WHERE usuario_id = ?
         ORDER BY leida ASC, created_at DESC",
    )
    .bind(usuario_id)
    .fetch_all(pool)
    .await?;
    Ok(filas)
}

/// Marca una notificación como leída; solo el destinatario puede hacerlo
pub async fn marcar_leida(
    pool: &SqlitePool,
    usuario_id: Uuid,
    notificacion_id: Uuid,
) -> Result<(), ApiError> {
    let resultado = sqlx::query(
        "UPDATE notificaciones SET leida = 1, read_at = ?
         WHERE id = ? AND usuario_id = ?",
    )
    .bind(Utc::now())
    .bind(notificacion_id)
    .bind(usuario_id)
    .execute(pool)
    .await?;

    if resultado.rows_affected() == 0 {
        return Err(ApiError::NoEncontrado(format!(
            "notificación {}",
            notificacion_id
        )));
    }
    Ok(())
}
