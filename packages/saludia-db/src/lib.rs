//! SaludIA DB - Biblioteca compartida de acceso a la base de datos de casos
//!
//! Esta biblioteca provee:
//! - Modelos de datos compartidos del dominio Ley de Urgencia
//! - Migraciones automáticas de la base de datos
//! - Pool de conexión y utilidades para SQLite

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod error;
pub mod migrations;
pub mod models;

/// Configuración de la conexión con la base de datos
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Ruta al archivo SQLite
    pub db_path: String,
    /// Número máximo de conexiones en el pool
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/saludia.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Inicializa una conexión con la base de datos SQLite
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verifica que exista el directorio padre
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Falla al crear directorio para la base de datos")?;
        }
    }

    // Configura las opciones de conexión SQLite
    let connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    // Crea el pool de conexiones
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Falla al conectar con la base de datos SQLite")?;

    // Aplica migraciones automáticas
    migrations::run_migrations(&pool)
        .await
        .context("Falla al aplicar migraciones")?;

    info!("Base de datos inicializada: {}", config.db_path);
    Ok(pool)
}
