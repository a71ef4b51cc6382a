//! Seguimiento de resoluciones de la aseguradora
//!
//! Opera solo sobre casos aceptados. Dos canales de entrada: anulación
//! manual de un caso y carga masiva de líneas `episodio,etiqueta`. La carga
//! masiva valida el formato de todas las líneas antes de escribir nada;
//! los episodios no encontrados se toleran línea a línea.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::casos;
use crate::error::ApiError;
use saludia_db::models::{EstadoCaso, ResolucionAseguradora};

/// Quita tildes y diéresis del español; suficiente para plegar etiquetas
fn quitar_acentos(texto: &str) -> String {
    texto
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            otro => otro,
        })
        .collect()
}

/// Normaliza una etiqueta libre de resolución a uno de los cuatro estados
///
/// Insensible a mayúsculas, acentos y variantes ortográficas comunes.
pub fn normalizar_etiqueta(etiqueta: &str) -> Option<ResolucionAseguradora> {
    let plegada = quitar_acentos(etiqueta)
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match plegada.as_str() {
        "aceptada" | "aceptado" | "aceptar" | "aprobada" | "aprobado" => {
            Some(ResolucionAseguradora::Aceptada)
        }
        "rechazada" | "rechazado" | "rechazar" | "denegada" | "denegado" => {
            Some(ResolucionAseguradora::Rechazada)
        }
        "pendiente" => Some(ResolucionAseguradora::Pendiente),
        "pendiente envio" | "pendiente de envio" => Some(ResolucionAseguradora::PendienteEnvio),
        _ => None,
    }
}

/// Línea bien formada del lote de importación
#[derive(Debug, Clone, PartialEq)]
pub struct LineaImportacion {
    pub episodio: String,
    pub resolucion: ResolucionAseguradora,
}

/// Resultado agregado de una importación masiva
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResumenImportacion {
    /// Líneas cuyo episodio actualizó al menos un caso
    pub exitosas: usize,
    /// Líneas cuyo episodio no corresponde a ningún caso aceptado
    pub no_encontradas: usize,
    /// Casos efectivamente actualizados (los episodios pueden repetirse)
    pub casos_actualizados: usize,
    /// Episodios sin coincidencia, para el reporte
    pub episodios_no_encontrados: Vec<String>,
}

/// Primera pasada: parseo de todas las líneas con acumulación de errores
///
/// Cualquier error de formato (línea sin exactamente dos campos separados
/// por coma, o etiqueta no normalizable) rechaza el lote completo.
pub fn parsear_lote(texto: &str) -> Result<Vec<LineaImportacion>, Vec<String>> {
    let mut lineas = Vec::new();
    let mut errores = Vec::new();

    for (numero, cruda) in texto.lines().enumerate() {
        let cruda = cruda.trim();
        if cruda.is_empty() {
            continue;
        }

        let campos: Vec<&str> = cruda.split(',').collect();
        if campos.len() != 2 {
            errores.push(format!(
                "línea {}: se esperaban dos campos separados por coma, hay {}",
                numero + 1,
                campos.len()
            ));
            continue;
        }

        let episodio = campos[0].trim();
        if episodio.is_empty() {
            errores.push(format!("línea {}: episodio vacío", numero + 1));
            continue;
        }

        match normalizar_etiqueta(campos[1]) {
            Some(resolucion) => lineas.push(LineaImportacion {
                episodio: episodio.to_string(),
                resolucion,
            }),
            None => errores.push(format!(
                "línea {}: etiqueta de resolución desconocida \"{}\"",
                numero + 1,
                campos[1].trim()
            )),
        }
    }

    if errores.is_empty() {
        Ok(lineas)
    } else {
        Err(errores)
    }
}

/// Importa un lote de resoluciones en texto `episodio,etiqueta`
///
/// Si el formato pasa la compuerta inicial, cada línea actualiza todos los
/// casos aceptados que compartan el episodio. El éxito parcial es normal y
/// se reporta como agregado, nunca como error.
pub async fn importar_lote(
    pool: &SqlitePool,
    texto: &str,
) -> Result<ResumenImportacion, ApiError> {
    let lineas = parsear_lote(texto).map_err(|errores| {
        ApiError::Validacion(format!(
            "el lote tiene errores de formato y no se importó: {}",
            errores.join("; ")
        ))
    })?;

    let mut resumen = ResumenImportacion::default();

    for linea in &lineas {
        let resultado = sqlx::query(
            "UPDATE casos SET resolucion_aseguradora = ?, updated_at = ?
             WHERE episodio = ? AND estado = 'aceptado'",
        )
        .bind(linea.resolucion.as_str())
        .bind(Utc::now())
        .bind(&linea.episodio)
        .execute(pool)
        .await?;

        let afectados = resultado.rows_affected() as usize;
        if afectados == 0 {
            resumen.no_encontradas += 1;
            resumen.episodios_no_encontrados.push(linea.episodio.clone());
        } else {
            resumen.exitosas += 1;
            resumen.casos_actualizados += afectados;
        }
    }

    if resumen.no_encontradas > 0 {
        warn!(
            no_encontradas = resumen.no_encontradas,
            "importación con episodios sin coincidencia"
        );
    }
    info!(
        exitosas = resumen.exitosas,
        casos = resumen.casos_actualizados,
        "importación de resoluciones completada"
    );

    Ok(resumen)
}

/// Anulación manual de la resolución de aseguradora de un caso
///
/// Se permite cualquier cambio entre los cuatro estados, pero solo sobre
/// casos con estado clínico aceptado.
pub async fn cambiar_resolucion_manual(
    pool: &SqlitePool,
    caso_id: Uuid,
    nueva: ResolucionAseguradora,
) -> Result<(), ApiError> {
    let caso = casos::obtener_caso(pool, caso_id).await?;
    if caso.estado != EstadoCaso::Aceptado {
        return Err(ApiError::Validacion(
            "la resolución de aseguradora solo aplica a casos aceptados".to_string(),
        ));
    }

    sqlx::query("UPDATE casos SET resolucion_aseguradora = ?, updated_at = ? WHERE id = ?")
        .bind(nueva.as_str())
        .bind(Utc::now())
        .bind(caso_id)
        .execute(pool)
        .await?;

    info!(caso_id = %caso_id, resolucion = nueva.as_str(), "anulación manual de aseguradora");
    Ok(())
}
