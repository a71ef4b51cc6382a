//! Modelos de datos compartidos entre aplicaciones
//!
//! Este módulo define las estructuras de datos principales del dominio
//! Ley de Urgencia usadas por el ecosistema SaludIA

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Valor inválido para {}: {}", column, value),
        )),
    }
}

/// Estados posibles de un caso (pregunta clínica principal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoCaso {
    /// Caso recién creado, a la espera de la decisión del médico tratante
    Pendiente,
    /// Ley de Urgencia aplicada
    Aceptado,
    /// Ley de Urgencia denegada
    Rechazado,
    /// Derivado al pool de médicos jefe
    Derivado,
}

impl EstadoCaso {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoCaso::Pendiente => "pendiente",
            EstadoCaso::Aceptado => "aceptado",
            EstadoCaso::Rechazado => "rechazado",
            EstadoCaso::Derivado => "derivado",
        }
    }

    pub fn parse(value: &str) -> sqlx::Result<Self> {
        match value {
            "pendiente" => Ok(EstadoCaso::Pendiente),
            "aceptado" => Ok(EstadoCaso::Aceptado),
            "rechazado" => Ok(EstadoCaso::Rechazado),
            "derivado" => Ok(EstadoCaso::Derivado),
            other => Err(decode_error("estado", other)),
        }
    }

    /// Un caso cerrado ya tiene decisión final; sigue visible para
    /// los médicos jefe, que pueden re-resolverlo
    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoCaso::Aceptado | EstadoCaso::Rechazado)
    }
}

impl std::fmt::Display for EstadoCaso {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estado secundario de resolución de la aseguradora
///
/// Solo tiene sentido cuando el caso está `aceptado`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolucionAseguradora {
    Pendiente,
    PendienteEnvio,
    Aceptada,
    Rechazada,
}

impl ResolucionAseguradora {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolucionAseguradora::Pendiente => "pendiente",
            ResolucionAseguradora::PendienteEnvio => "pendiente_envio",
            ResolucionAseguradora::Aceptada => "aceptada",
            ResolucionAseguradora::Rechazada => "rechazada",
        }
    }

    pub fn parse(value: &str) -> sqlx::Result<Self> {
        match value {
            "pendiente" => Ok(ResolucionAseguradora::Pendiente),
            "pendiente_envio" => Ok(ResolucionAseguradora::PendienteEnvio),
            "aceptada" => Ok(ResolucionAseguradora::Aceptada),
            "rechazada" => Ok(ResolucionAseguradora::Rechazada),
            other => Err(decode_error("resolucion_aseguradora", other)),
        }
    }
}

impl std::fmt::Display for ResolucionAseguradora {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Polaridad de la sugerencia emitida por el oráculo de IA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolaridadSugerencia {
    Aceptar,
    Rechazar,
    Incierto,
}

impl PolaridadSugerencia {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolaridadSugerencia::Aceptar => "aceptar",
            PolaridadSugerencia::Rechazar => "rechazar",
            PolaridadSugerencia::Incierto => "incierto",
        }
    }

    pub fn parse(value: &str) -> sqlx::Result<Self> {
        match value {
            "aceptar" => Ok(PolaridadSugerencia::Aceptar),
            "rechazar" => Ok(PolaridadSugerencia::Rechazar),
            "incierto" => Ok(PolaridadSugerencia::Incierto),
            other => Err(decode_error("sugerencia", other)),
        }
    }
}

/// Decisión clínica sobre la aplicación de la Ley de Urgencia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionClinica {
    /// Aplicar la ley
    Aceptado,
    /// Denegar la ley
    Rechazado,
}

impl DecisionClinica {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionClinica::Aceptado => "aceptado",
            DecisionClinica::Rechazado => "rechazado",
        }
    }

    pub fn parse(value: &str) -> sqlx::Result<Self> {
        match value {
            "aceptado" => Ok(DecisionClinica::Aceptado),
            "rechazado" => Ok(DecisionClinica::Rechazado),
            other => Err(decode_error("decision", other)),
        }
    }

    /// Estado terminal al que lleva esta decisión
    pub fn estado_resultante(&self) -> EstadoCaso {
        match self {
            DecisionClinica::Aceptado => EstadoCaso::Aceptado,
            DecisionClinica::Rechazado => EstadoCaso::Rechazado,
        }
    }

    /// True si la decisión coincide con la polaridad de la sugerencia.
    /// Una sugerencia `incierto` no coincide con ninguna decisión.
    pub fn coincide_con(&self, sugerencia: PolaridadSugerencia) -> bool {
        matches!(
            (self, sugerencia),
            (DecisionClinica::Aceptado, PolaridadSugerencia::Aceptar)
                | (DecisionClinica::Rechazado, PolaridadSugerencia::Rechazar)
        )
    }
}

impl std::fmt::Display for DecisionClinica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roles de usuario reconocidos por el sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolUsuario {
    MedicoTratante,
    MedicoJefe,
    Admin,
}

impl RolUsuario {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolUsuario::MedicoTratante => "medico_tratante",
            RolUsuario::MedicoJefe => "medico_jefe",
            RolUsuario::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> sqlx::Result<Self> {
        match value {
            "medico_tratante" => Ok(RolUsuario::MedicoTratante),
            "medico_jefe" => Ok(RolUsuario::MedicoJefe),
            "admin" => Ok(RolUsuario::Admin),
            other => Err(decode_error("role", other)),
        }
    }
}

impl std::fmt::Display for RolUsuario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Representa un caso clínico bajo revisión Ley de Urgencia
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caso {
    /// Identificador único del caso
    pub id: Uuid,
    /// Fecha y hora de creación del registro
    pub created_at: DateTime<Utc>,
    /// Fecha y hora de la última modificación
    pub updated_at: DateTime<Utc>,
    /// Número de episodio administrativo (no es único)
    pub episodio: Option<String>,
    /// Nombre del paciente
    pub nombre_paciente: String,
    /// Edad del paciente
    pub edad: i32,
    /// Sexo del paciente
    pub sexo: String,
    /// Correo del paciente para notificaciones
    pub email_paciente: String,
    /// Diagnóstico principal
    pub diagnostico: String,
    /// Sintomatología descrita
    pub sintomas: Option<String>,
    /// Antecedentes / historia clínica
    pub historia_clinica: Option<String>,
    /// Presión arterial (texto libre, ej. "120/80")
    pub presion_arterial: Option<String>,
    /// Frecuencia cardíaca (lpm)
    pub frecuencia_cardiaca: Option<i32>,
    /// Temperatura corporal (°C)
    pub temperatura: Option<f64>,
    /// Saturación de oxígeno (%)
    pub saturacion_o2: Option<i32>,
    /// Frecuencia respiratoria (rpm)
    pub frecuencia_respiratoria: Option<i32>,
    /// Estado principal del caso
    pub estado: EstadoCaso,
    /// Médico tratante dueño del caso (inmutable desde la creación)
    pub medico_tratante_id: Uuid,
    /// Médico jefe que reclamó el caso; se fija en la primera derivación
    /// o resolución de jefatura y no se limpia después
    pub medico_jefe_id: Option<Uuid>,
    /// Previsión del paciente (familia de aseguradora)
    pub prevision: Option<String>,
    /// Nombre de la aseguradora
    pub aseguradora: Option<String>,
    /// Estado de resolución de la aseguradora; solo aplica con estado aceptado
    pub resolucion_aseguradora: Option<ResolucionAseguradora>,
    /// Marca de advertencia: los datos clínicos cambiaron después de una evaluación
    pub actualizado_tras_evaluacion: bool,
    /// Puntero a la sugerencia vigente
    pub sugerencia_actual_id: Option<Uuid>,
    /// Fecha y hora del último análisis de IA
    pub ai_analyzed_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for Caso {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let estado: String = row.try_get("estado")?;
        let resolucion: Option<String> = row.try_get("resolucion_aseguradora")?;
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            episodio: row.try_get("episodio")?,
            nombre_paciente: row.try_get("nombre_paciente")?,
            edad: row.try_get("edad")?,
            sexo: row.try_get("sexo")?,
            email_paciente: row.try_get("email_paciente")?,
            diagnostico: row.try_get("diagnostico")?,
            sintomas: row.try_get("sintomas")?,
            historia_clinica: row.try_get("historia_clinica")?,
            presion_arterial: row.try_get("presion_arterial")?,
            frecuencia_cardiaca: row.try_get("frecuencia_cardiaca")?,
            temperatura: row.try_get("temperatura")?,
            saturacion_o2: row.try_get("saturacion_o2")?,
            frecuencia_respiratoria: row.try_get("frecuencia_respiratoria")?,
            estado: EstadoCaso::parse(&estado)?,
            medico_tratante_id: row.try_get("medico_tratante_id")?,
            medico_jefe_id: row.try_get("medico_jefe_id")?,
            prevision: row.try_get("prevision")?,
            aseguradora: row.try_get("aseguradora")?,
            resolucion_aseguradora: resolucion
                .as_deref()
                .map(ResolucionAseguradora::parse)
                .transpose()?,
            actualizado_tras_evaluacion: row.try_get("actualizado_tras_evaluacion")?,
            sugerencia_actual_id: row.try_get("sugerencia_actual_id")?,
            ai_analyzed_at: row.try_get("ai_analyzed_at")?,
        })
    }
}

/// Sugerencia emitida por el oráculo de IA para un caso
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sugerencia {
    /// Identificador único
    pub id: Uuid,
    /// Caso al que pertenece
    pub caso_id: Uuid,
    /// Polaridad de la recomendación
    pub sugerencia: PolaridadSugerencia,
    /// Confianza (0-100)
    pub confianza: i32,
    /// Explicación en texto libre
    pub explicacion: String,
    /// Fecha y hora de procesamiento
    pub processed_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Sugerencia {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let polaridad: String = row.try_get("sugerencia")?;
        Ok(Self {
            id: row.try_get("id")?,
            caso_id: row.try_get("caso_id")?,
            sugerencia: PolaridadSugerencia::parse(&polaridad)?,
            confianza: row.try_get("confianza")?,
            explicacion: row.try_get("explicacion")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

/// Bitácora de resolución de un caso: a lo más una fila por caso
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolucionCaso {
    /// Caso al que pertenece (clave primaria)
    pub caso_id: Uuid,
    /// Decisión inicial del médico tratante
    pub decision_medico: Option<DecisionClinica>,
    /// Justificación del médico tratante
    pub comentario_medico: Option<String>,
    /// Fecha de la decisión del médico tratante
    pub fecha_decision_medico: Option<DateTime<Utc>>,
    /// Decisión final (del médico jefe o auto-resuelta)
    pub decision_final: Option<DecisionClinica>,
    /// Comentario de la decisión final
    pub comentario_final: Option<String>,
    /// Fecha de la decisión del médico jefe
    pub fecha_decision_medico_jefe: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for ResolucionCaso {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let decision_medico: Option<String> = row.try_get("decision_medico")?;
        let decision_final: Option<String> = row.try_get("decision_final")?;
        Ok(Self {
            caso_id: row.try_get("caso_id")?,
            decision_medico: decision_medico
                .as_deref()
                .map(DecisionClinica::parse)
                .transpose()?,
            comentario_medico: row.try_get("comentario_medico")?,
            fecha_decision_medico: row.try_get("fecha_decision_medico")?,
            decision_final: decision_final
                .as_deref()
                .map(DecisionClinica::parse)
                .transpose()?,
            comentario_final: row.try_get("comentario_final")?,
            fecha_decision_medico_jefe: row.try_get("fecha_decision_medico_jefe")?,
        })
    }
}

/// Notificación para la campana de la interfaz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notificacion {
    /// Identificador único
    pub id: Uuid,
    /// Usuario destinatario
    pub usuario_id: Uuid,
    /// Caso relacionado
    pub caso_id: Uuid,
    /// Título corto
    pub titulo: String,
    /// Cuerpo del mensaje
    pub mensaje: String,
    /// Marca de leída
    pub leida: bool,
    /// Fecha y hora de creación
    pub created_at: DateTime<Utc>,
    /// Fecha y hora de lectura
    pub read_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for Notificacion {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            usuario_id: row.try_get("usuario_id")?,
            caso_id: row.try_get("caso_id")?,
            titulo: row.try_get("titulo")?,
            mensaje: row.try_get("mensaje")?,
            leida: row.try_get("leida")?,
            created_at: row.try_get("created_at")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

/// Fila de rol de usuario; el perfil completo vive en el proveedor externo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsuarioRol {
    pub user_id: Uuid,
    pub role: RolUsuario,
    pub nombre: String,
    pub email: String,
}

impl FromRow<'_, SqliteRow> for UsuarioRol {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            user_id: row.try_get("user_id")?,
            role: RolUsuario::parse(&role)?,
            nombre: row.try_get("nombre")?,
            email: row.try_get("email")?,
        })
    }
}

/// Versión resumida de un caso para listados de cola
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasoResumen {
    pub id: Uuid,
    pub episodio: Option<String>,
    pub nombre_paciente: String,
    pub diagnostico: String,
    pub estado: EstadoCaso,
    pub resolucion_aseguradora: Option<ResolucionAseguradora>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for CasoResumen {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let estado: String = row.try_get("estado")?;
        let resolucion: Option<String> = row.try_get("resolucion_aseguradora")?;
        Ok(Self {
            id: row.try_get("id")?,
            episodio: row.try_get("episodio")?,
            nombre_paciente: row.try_get("nombre_paciente")?,
            diagnostico: row.try_get("diagnostico")?,
            estado: EstadoCaso::parse(&estado)?,
            resolucion_aseguradora: resolucion
                .as_deref()
                .map(ResolucionAseguradora::parse)
                .transpose()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
