//! Taxonomía de errores del servicio
//!
//! Los errores de validación se responden con el detalle del campo y nunca
//! llegan a la base de datos; los errores remotos se informan al usuario sin
//! reintentos automáticos.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::transiciones::ErrorTransicion;
use saludia_db::error::DbError;

/// Errores expuestos por los handlers y servicios del API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error de validación: {0}")]
    Validacion(String),

    #[error("No encontrado: {0}")]
    NoEncontrado(String),

    #[error("Credenciales ausentes o inválidas")]
    NoAutenticado,

    #[error("Acceso denegado: {0}")]
    AccesoDenegado(String),

    #[error(transparent)]
    Transicion(#[from] ErrorTransicion),

    #[error("Error de servicio remoto: {0}")]
    Remoto(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::Db(DbError::from(error))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validacion(errors.to_string())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validacion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NoEncontrado(_) => StatusCode::NOT_FOUND,
            ApiError::NoAutenticado => StatusCode::UNAUTHORIZED,
            ApiError::AccesoDenegado(_) => StatusCode::FORBIDDEN,
            ApiError::Transicion(ErrorTransicion::JustificacionRequerida) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Transicion(_) => StatusCode::CONFLICT,
            ApiError::Remoto(_) => StatusCode::BAD_GATEWAY,
            ApiError::Db(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Error interno al atender la petición: {}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
