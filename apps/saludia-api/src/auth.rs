//! Extracción del usuario autenticado
//!
//! La emisión de tokens es responsabilidad del proveedor de identidad
//! externo; aquí solo se decodifica el bearer JWT y se aplica el rol.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use saludia_db::models::RolUsuario;

/// Claims esperados en el token del proveedor de identidad
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identificador del usuario
    pub sub: Uuid,
    /// Rol asignado en SaludIA
    pub role: RolUsuario,
    /// Expiración (epoch segundos)
    pub exp: usize,
}

/// Usuario autenticado que origina la petición
#[derive(Debug, Clone, Copy)]
pub struct UsuarioActual {
    pub id: Uuid,
    pub rol: RolUsuario,
}

impl UsuarioActual {
    /// Falla con acceso denegado si el usuario no tiene el rol exigido
    pub fn exigir_rol(&self, rol: RolUsuario) -> Result<(), ApiError> {
        if self.rol == rol {
            Ok(())
        } else {
            Err(ApiError::AccesoDenegado(format!(
                "se requiere rol {}",
                rol
            )))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for UsuarioActual {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let encabezado = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|valor| valor.to_str().ok())
            .ok_or(ApiError::NoAutenticado)?;

        let token = encabezado
            .strip_prefix("Bearer ")
            .ok_or(ApiError::NoAutenticado)?;

        let datos = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::NoAutenticado)?;

        Ok(UsuarioActual {
            id: datos.claims.sub,
            rol: datos.claims.role,
        })
    }
}
