//! Estado compartido del servicio

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::actions::{BorradoUsuarios, EnvioCorreoPaciente};
use crate::config::Config;
use crate::oraculo::OraculoSugerencias;

/// Dependencias inyectadas disponibles para todos los handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub oraculo: Arc<dyn OraculoSugerencias>,
    pub correo: Arc<dyn EnvioCorreoPaciente>,
    pub usuarios: Arc<dyn BorradoUsuarios>,
}
