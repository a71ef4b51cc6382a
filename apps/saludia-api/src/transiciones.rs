//! Máquina de estados de resolución de casos
//!
//! La lógica de transición está expresada como una función pura sobre una
//! tabla (rol, estado actual, decisión, polaridad de sugerencia,
//! justificación), independiente de la interfaz y de la base de datos.
//! El servicio de resolución traduce el resultado en escrituras.

use saludia_db::models::{
    DecisionClinica, EstadoCaso, PolaridadSugerencia, ResolucionAseguradora, RolUsuario,
};
use thiserror::Error;

/// Errores de transición; ninguno produce escrituras en la base
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ErrorTransicion {
    #[error("Se requiere una justificación para contradecir la sugerencia")]
    JustificacionRequerida,

    #[error("El rol {rol} no puede decidir sobre un caso en estado {estado}")]
    EstadoInvalido { rol: RolUsuario, estado: EstadoCaso },

    #[error("El rol {0} no participa de decisiones clínicas")]
    RolNoPermitido(RolUsuario),
}

/// A quién se notifica como efecto de la transición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjetivoNotificacion {
    /// El médico tratante dueño del caso (cuando jefatura resuelve)
    MedicoTratante,
    /// El pool de médicos jefe (cuando un caso se deriva)
    PoolJefes,
}

/// Entrada de la tabla de transiciones
#[derive(Debug, Clone, Copy)]
pub struct EntradaTransicion {
    pub rol: RolUsuario,
    pub estado_actual: EstadoCaso,
    pub decision: DecisionClinica,
    pub sugerencia: PolaridadSugerencia,
    pub tiene_justificacion: bool,
    pub resolucion_aseguradora: Option<ResolucionAseguradora>,
}

/// Resultado de una transición válida: nuevo estado más las escrituras
/// requeridas, que el servicio ejecuta dentro de una única transacción
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultadoTransicion {
    pub nuevo_estado: EstadoCaso,
    /// Decisión final, presente exactamente cuando el nuevo estado es terminal
    pub decision_final: Option<DecisionClinica>,
    /// Registrar decision_medico/comentario_medico en la bitácora
    pub registra_decision_medico: bool,
    /// Fijar medico_jefe_id al actor si aún no está fijado
    pub reclama_jefatura: bool,
    pub notificar: Option<ObjetivoNotificacion>,
}

/// Evalúa la tabla de transiciones del ciclo de resolución
pub fn evaluar(entrada: EntradaTransicion) -> Result<ResultadoTransicion, ErrorTransicion> {
    match entrada.rol {
        RolUsuario::MedicoTratante => evaluar_medico_tratante(entrada),
        RolUsuario::MedicoJefe => evaluar_medico_jefe(entrada),
        RolUsuario::Admin => Err(ErrorTransicion::RolNoPermitido(RolUsuario::Admin)),
    }
}

fn evaluar_medico_tratante(
    entrada: EntradaTransicion,
) -> Result<ResultadoTransicion, ErrorTransicion> {
    if entrada.estado_actual != EstadoCaso::Pendiente {
        return Err(ErrorTransicion::EstadoInvalido {
            rol: entrada.rol,
            estado: entrada.estado_actual,
        });
    }

    if entrada.decision.coincide_con(entrada.sugerencia) {
        // Acuerdo con el oráculo: el caso se cierra sin derivación
        return Ok(ResultadoTransicion {
            nuevo_estado: entrada.decision.estado_resultante(),
            decision_final: Some(entrada.decision),
            registra_decision_medico: true,
            reclama_jefatura: false,
            notificar: None,
        });
    }

    // Desacuerdo (incluye sugerencia incierta): derivación obligatoria,
    // con justificación no vacía como requisito de validación
    if !entrada.tiene_justificacion {
        return Err(ErrorTransicion::JustificacionRequerida);
    }

    Ok(ResultadoTransicion {
        nuevo_estado: EstadoCaso::Derivado,
        decision_final: None,
        registra_decision_medico: true,
        reclama_jefatura: false,
        notificar: Some(ObjetivoNotificacion::PoolJefes),
    })
}

fn evaluar_medico_jefe(
    entrada: EntradaTransicion,
) -> Result<ResultadoTransicion, ErrorTransicion> {
    // Jefatura actúa sobre casos derivados o reabre casos ya cerrados
    if !matches!(
        entrada.estado_actual,
        EstadoCaso::Derivado | EstadoCaso::Aceptado | EstadoCaso::Rechazado
    ) {
        return Err(ErrorTransicion::EstadoInvalido {
            rol: entrada.rol,
            estado: entrada.estado_actual,
        });
    }

    let discrepa = !entrada.decision.coincide_con(entrada.sugerencia);
    // Sub-flujo de anulación directa: caso aceptado con resolución de
    // aseguradora pendiente de envío se resuelve en un paso, comentario opcional
    let anulacion_directa = entrada.estado_actual == EstadoCaso::Aceptado
        && entrada.resolucion_aseguradora == Some(ResolucionAseguradora::PendienteEnvio);

    if discrepa && !anulacion_directa && !entrada.tiene_justificacion {
        return Err(ErrorTransicion::JustificacionRequerida);
    }

    Ok(ResultadoTransicion {
        nuevo_estado: entrada.decision.estado_resultante(),
        decision_final: Some(entrada.decision),
        registra_decision_medico: false,
        reclama_jefatura: true,
        notificar: Some(ObjetivoNotificacion::MedicoTratante),
    })
}
