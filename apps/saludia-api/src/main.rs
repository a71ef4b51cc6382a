//! Punto de entrada del servicio SaludIA API

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use saludia_api::actions::GatewayFunciones;
use saludia_api::api;
use saludia_api::config::Config;
use saludia_api::oraculo::OraculoAleatorio;
use saludia_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Nivel de log elegido al arrancar vía RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Configuración inválida")?;
    let pool = saludia_db::init_db_pool(&config.db).await?;

    let gateway = Arc::new(GatewayFunciones::new(config.functions_url.clone()));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        oraculo: Arc::new(OraculoAleatorio),
        correo: gateway.clone(),
        usuarios: gateway,
    };

    let addr = config
        .bind_addr
        .parse()
        .context("Dirección de escucha inválida")?;

    info!(
        version = saludia_api::built_info::PKG_VERSION,
        %addr,
        "SaludIA API escuchando"
    );

    axum::Server::bind(&addr)
        .serve(api::router(state).into_make_service())
        .await
        .context("El servidor HTTP terminó con error")?;

    Ok(())
}
