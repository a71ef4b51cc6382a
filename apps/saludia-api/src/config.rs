//! Configuración del servicio, leída del entorno al arrancar
//!
//! El nivel de log se controla con `RUST_LOG` vía el `EnvFilter` del
//! suscriptor de tracing; no existe ningún interruptor de log compilado.

use anyhow::{Context, Result};
use saludia_db::DbConfig;

/// Configuración completa del proceso
#[derive(Debug, Clone)]
pub struct Config {
    /// Dirección de escucha del servidor HTTP
    pub bind_addr: String,
    /// Configuración de la base de datos
    pub db: DbConfig,
    /// Secreto HS256 compartido con el proveedor de identidad
    pub jwt_secret: String,
    /// URL base de las funciones serverless (correo, borrado de usuarios)
    pub functions_url: String,
}

impl Config {
    /// Carga la configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("SALUDIA_JWT_SECRET")
            .context("SALUDIA_JWT_SECRET es obligatoria")?;

        let db = DbConfig {
            db_path: std::env::var("SALUDIA_DB_PATH")
                .unwrap_or_else(|_| "data/saludia.db".to_string()),
            max_connections: std::env::var("SALUDIA_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        };

        Ok(Self {
            bind_addr: std::env::var("SALUDIA_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            db,
            jwt_secret,
            functions_url: std::env::var("SALUDIA_FUNCTIONS_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
        })
    }
}
