//! Traducción de planillas de la aseguradora al lote de texto
//!
//! Acepta filas tabulares ya extraídas de una planilla, ubica las columnas
//! "Episodio"/"Episode" y "Validación"/"Validacion"/"Validation" y traduce
//! los veredictos PERTINENTE / NO PERTINENTE a Aceptada / Rechazada. La
//! salida alimenta el mismo pipeline de texto de la importación masiva.

use crate::error::ApiError;

fn plegar_encabezado(celda: &str) -> String {
    celda
        .trim()
        .to_lowercase()
        .replace('á', "a")
        .replace('é', "e")
        .replace('í', "i")
        .replace('ó', "o")
        .replace('ú', "u")
}

fn es_columna_episodio(celda: &str) -> bool {
    matches!(plegar_encabezado(celda).as_str(), "episodio" | "episode")
}

fn es_columna_validacion(celda: &str) -> bool {
    matches!(
        plegar_encabezado(celda).as_str(),
        "validacion" | "validation"
    )
}

/// Traduce el veredicto de la planilla a la etiqueta del pipeline de texto
fn traducir_veredicto(celda: &str) -> String {
    let plegado = celda.trim().to_uppercase();
    match plegado.as_str() {
        "PERTINENTE" => "Aceptada".to_string(),
        "NO PERTINENTE" => "Rechazada".to_string(),
        // Cualquier otro valor pasa tal cual; la compuerta de formato
        // del lote decide si es válido
        _ => celda.trim().to_string(),
    }
}

/// Convierte filas de planilla en el lote de texto `episodio,etiqueta`
///
/// La primera fila debe ser el encabezado con ambas columnas requeridas.
pub fn traducir_planilla(filas: &[Vec<String>]) -> Result<String, ApiError> {
    let encabezado = filas.first().ok_or_else(|| {
        ApiError::Validacion("la planilla está vacía".to_string())
    })?;

    let col_episodio = encabezado
        .iter()
        .position(|celda| es_columna_episodio(celda))
        .ok_or_else(|| {
            ApiError::Validacion(
                "la planilla no tiene columna Episodio/Episode".to_string(),
            )
        })?;
    let col_validacion = encabezado
        .iter()
        .position(|celda| es_columna_validacion(celda))
        .ok_or_else(|| {
            ApiError::Validacion(
                "la planilla no tiene columna Validación/Validation".to_string(),
            )
        })?;

    let mut lineas = Vec::new();
    for fila in &filas[1..] {
        let episodio = fila.get(col_episodio).map(|c| c.trim()).unwrap_or("");
        let veredicto = fila.get(col_validacion).map(|c| c.trim()).unwrap_or("");
        if episodio.is_empty() && veredicto.is_empty() {
            continue;
        }
        lineas.push(format!("{},{}", episodio, traducir_veredicto(veredicto)));
    }

    Ok(lineas.join("\n"))
}
