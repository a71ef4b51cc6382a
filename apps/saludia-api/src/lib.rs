//! SaludIA API - Servicio de gestión de casos Ley de Urgencia
//!
//! Expone el ciclo de resolución de casos clínicos: creación con sugerencia
//! de IA, decisión del médico tratante, derivación a jefatura, seguimiento
//! de resoluciones de la aseguradora y notificaciones.

pub mod actions;
pub mod api;
pub mod aseguradora;
pub mod auth;
pub mod casos;
pub mod config;
pub mod error;
pub mod notificaciones;
pub mod oraculo;
pub mod planilla;
pub mod resolucion;
pub mod state;
pub mod transiciones;

/// Información de compilación generada por `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
