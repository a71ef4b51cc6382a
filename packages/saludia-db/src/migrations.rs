//! Sistema de migraciones para la base de datos
//!
//! Este módulo administra las migraciones de la base de datos SQLite

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{error, info};

/// Lista de migraciones SQL a aplicar
const MIGRATIONS: &[&str] = &[
    // 001_casos_core.sql
    r#"
    -- Tabla de casos clínicos bajo revisión Ley de Urgencia
    CREATE TABLE IF NOT EXISTS casos (
        id TEXT PRIMARY KEY NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        episodio TEXT,
        nombre_paciente TEXT NOT NULL,
        edad INTEGER NOT NULL,
        sexo TEXT NOT NULL,
        email_paciente TEXT NOT NULL,
        diagnostico TEXT NOT NULL,
        sintomas TEXT,
        historia_clinica TEXT,
        presion_arterial TEXT,
        frecuencia_cardiaca INTEGER,
        temperatura REAL,
        saturacion_o2 INTEGER,
        frecuencia_respiratoria INTEGER,
        estado TEXT NOT NULL DEFAULT 'pendiente'
            CHECK (estado IN ('pendiente', 'aceptado', 'rechazado', 'derivado')),
        medico_tratante_id TEXT NOT NULL,
        medico_jefe_id TEXT,
        prevision TEXT,
        aseguradora TEXT,
        resolucion_aseguradora TEXT
            CHECK (resolucion_aseguradora IN ('pendiente', 'pendiente_envio', 'aceptada', 'rechazada')),
        actualizado_tras_evaluacion BOOLEAN NOT NULL DEFAULT 0,
        sugerencia_actual_id TEXT,
        ai_analyzed_at TIMESTAMP
    );

    -- Tabla de sugerencias generadas por el oráculo de IA
    CREATE TABLE IF NOT EXISTS sugerencia_ia (
        id TEXT PRIMARY KEY NOT NULL,
        caso_id TEXT NOT NULL,
        sugerencia TEXT NOT NULL CHECK (sugerencia IN ('aceptar', 'rechazar', 'incierto')),
        confianza INTEGER NOT NULL CHECK (confianza BETWEEN 0 AND 100),
        explicacion TEXT NOT NULL,
        processed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (caso_id) REFERENCES casos (id) ON DELETE CASCADE
    );

    -- Tabla de resoluciones: a lo más una fila por caso
    CREATE TABLE IF NOT EXISTS resolucion_caso (
        caso_id TEXT PRIMARY KEY NOT NULL,
        decision_medico TEXT CHECK (decision_medico IN ('aceptado', 'rechazado')),
        comentario_medico TEXT,
        fecha_decision_medico TIMESTAMP,
        decision_final TEXT CHECK (decision_final IN ('aceptado', 'rechazado')),
        comentario_final TEXT,
        fecha_decision_medico_jefe TIMESTAMP,
        FOREIGN KEY (caso_id) REFERENCES casos (id) ON DELETE CASCADE
    );

    -- Índices para optimización
    CREATE INDEX IF NOT EXISTS idx_casos_estado ON casos (estado);
    CREATE INDEX IF NOT EXISTS idx_casos_medico_tratante ON casos (medico_tratante_id);
    CREATE INDEX IF NOT EXISTS idx_casos_episodio ON casos (episodio);
    CREATE INDEX IF NOT EXISTS idx_sugerencia_caso ON sugerencia_ia (caso_id);
    "#,
    // 002_notificaciones_roles.sql
    r#"
    -- Tabla de notificaciones para la campana de la interfaz
    CREATE TABLE IF NOT EXISTS notificaciones (
        id TEXT PRIMARY KEY NOT NULL,
        usuario_id TEXT NOT NULL,
        caso_id TEXT NOT NULL,
        titulo TEXT NOT NULL,
        mensaje TEXT NOT NULL,
        leida BOOLEAN NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        read_at TIMESTAMP,
        FOREIGN KEY (caso_id) REFERENCES casos (id) ON DELETE CASCADE
    );

    -- Tabla de roles de usuario (el proveedor de identidad es externo)
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id TEXT PRIMARY KEY NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('medico_tratante', 'medico_jefe', 'admin')),
        nombre TEXT NOT NULL,
        email TEXT NOT NULL
    );

    -- Índices para optimización
    CREATE INDEX IF NOT EXISTS idx_notificaciones_usuario ON notificaciones (usuario_id, leida);
    CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles (role);
    "#,
];

/// Ejecuta todas las migraciones pendientes en la base de datos
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migraciones de base de datos...");

    // Obtener la versión actual de la base de datos
    let mut version: i64 = 0;
    match sqlx::query_scalar("PRAGMA user_version").fetch_one(pool).await {
        Ok(v) => version = v,
        Err(e) => {
            error!("Error al obtener versión de la base: {}", e);
            // Continuar de todos modos, puede ser la primera ejecución
        }
    }

    info!("Versión actual de la base: {}", version);

    // Aplicar cada migración pendiente en orden
    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        // Saltar migraciones ya aplicadas
        if migration_version <= version {
            info!("Migración {} ya aplicada", migration_version);
            continue;
        }

        info!("Aplicando migración {}...", migration_version);

        // Ejecutar en una transacción para garantizar atomicidad
        let mut transaction = pool.begin().await.context(format!(
            "Falla al iniciar transacción para la migración {}",
            migration_version
        ))?;

        // Ejecutar los comandos SQL
        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .context(format!("Falla al ejecutar la migración {}", migration_version))?;

        // Actualizar versión de la base
        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .context(format!("Falla al actualizar versión a {}", migration_version))?;

        // Commit de la transacción
        transaction.commit().await.context(format!(
            "Falla al confirmar transacción de la migración {}",
            migration_version
        ))?;

        info!("Migración {} aplicada con éxito", migration_version);
    }

    info!("Migraciones completadas. Versión actual: {}", MIGRATIONS.len());
    Ok(())
}
