//! Pruebas de extremo a extremo del ciclo de resolución de casos
//!
//! Corren contra una base SQLite temporal con las migraciones reales.

use std::sync::Mutex;

use tempfile::TempDir;
use uuid::Uuid;

use saludia_api::aseguradora;
use saludia_api::auth::UsuarioActual;
use saludia_api::casos::{self, EdicionClinica, NuevoCaso};
use saludia_api::error::ApiError;
use saludia_api::oraculo::{OraculoSugerencias, SugerenciaGenerada};
use saludia_api::planilla;
use saludia_api::resolucion::{self, SolicitudDecision};
use saludia_api::transiciones::ErrorTransicion;
use saludia_db::models::{
    Caso, DecisionClinica, EstadoCaso, PolaridadSugerencia, ResolucionAseguradora, ResolucionCaso,
    RolUsuario,
};
use saludia_db::DbConfig;
use sqlx::SqlitePool;

/// Oráculo determinista para las pruebas; la máquina de estados no debe
/// depender de la aleatoriedad del stub de producción
struct OraculoFijo {
    respuestas: Mutex<Vec<(PolaridadSugerencia, i32)>>,
}

impl OraculoFijo {
    fn siempre(polaridad: PolaridadSugerencia, confianza: i32) -> Self {
        Self {
            respuestas: Mutex::new(vec![(polaridad, confianza)]),
        }
    }

    fn secuencia(respuestas: Vec<(PolaridadSugerencia, i32)>) -> Self {
        Self {
            respuestas: Mutex::new(respuestas),
        }
    }
}

impl OraculoSugerencias for OraculoFijo {
    fn evaluar(&self, _caso: &Caso) -> SugerenciaGenerada {
        let mut respuestas = self.respuestas.lock().unwrap();
        let (polaridad, confianza) = if respuestas.len() > 1 {
            respuestas.remove(0)
        } else {
            respuestas[0]
        };
        SugerenciaGenerada {
            sugerencia: polaridad,
            confianza,
            explicacion: "sugerencia de prueba".to_string(),
        }
    }
}

async fn pool_de_prueba() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig {
        db_path: dir.path().join("test.db").to_str().unwrap().to_string(),
        max_connections: 2,
    };
    let pool = saludia_db::init_db_pool(&config).await.unwrap();
    (dir, pool)
}

async fn registrar_usuario(pool: &SqlitePool, rol: RolUsuario) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO user_roles (user_id, role, nombre, email) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(rol.as_str())
        .bind("Usuario de prueba")
        .bind(format!("{}@saludia.cl", id))
        .execute(pool)
        .await
        .unwrap();
    id
}

fn caso_base() -> NuevoCaso {
    NuevoCaso {
        nombre_paciente: "María Soto".to_string(),
        edad: 62,
        sexo: "F".to_string(),
        email_paciente: "maria.soto@example.com".to_string(),
        diagnostico: "IAM con supradesnivel ST".to_string(),
        episodio: Some("EP-001".to_string()),
        sintomas: Some("Dolor torácico opresivo".to_string()),
        historia_clinica: None,
        presion_arterial: Some("150/90".to_string()),
        frecuencia_cardiaca: Some(110),
        temperatura: Some(36.8),
        saturacion_o2: Some(93),
        frecuencia_respiratoria: Some(22),
        prevision: Some("Isapre".to_string()),
        aseguradora: Some("Aseguradora Andina".to_string()),
    }
}

async fn resolucion_de(pool: &SqlitePool, caso_id: Uuid) -> Option<ResolucionCaso> {
    sqlx::query_as::<_, ResolucionCaso>("SELECT * FROM resolucion_caso WHERE caso_id = ?")
        .bind(caso_id)
        .fetch_optional(pool)
        .await
        .unwrap()
}

async fn notificaciones_de_caso(pool: &SqlitePool, caso_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notificaciones WHERE caso_id = ?")
        .bind(caso_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Escenario concreto del ciclo completo: decisión en desacuerdo sin
/// justificación falla sin escrituras; con justificación deriva; jefatura
/// resuelve, reclama el caso y se notifica al tratante
#[tokio::test]
async fn ciclo_derivacion_y_resolucion_de_jefatura() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Rechazar, 85);

    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    let jefe_id = registrar_usuario(&pool, RolUsuario::MedicoJefe).await;

    let (caso, sugerencia) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();
    assert_eq!(caso.estado, EstadoCaso::Pendiente);
    assert_eq!(sugerencia.sugerencia, PolaridadSugerencia::Rechazar);
    assert_eq!(sugerencia.confianza, 85);
    assert_eq!(caso.sugerencia_actual_id, Some(sugerencia.id));

    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };

    // Desacuerdo sin justificación: falla de validación, cero escrituras
    let error = resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        error,
        ApiError::Transicion(ErrorTransicion::JustificacionRequerida)
    ));

    let sin_cambios = casos::obtener_caso(&pool, caso.id).await.unwrap();
    assert_eq!(sin_cambios.estado, EstadoCaso::Pendiente);
    assert!(resolucion_de(&pool, caso.id).await.is_none());
    assert_eq!(notificaciones_de_caso(&pool, caso.id).await, 0);

    // Con justificación: el caso se deriva, se registra la decisión del
    // tratante y se notifica al pool (un jefe registrado, una notificación)
    let derivado = resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: Some("clinical judgment override".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(derivado.estado, EstadoCaso::Derivado);
    assert_eq!(derivado.medico_jefe_id, None);

    let bitacora = resolucion_de(&pool, caso.id).await.unwrap();
    assert_eq!(bitacora.decision_medico, Some(DecisionClinica::Aceptado));
    assert_eq!(
        bitacora.comentario_medico.as_deref(),
        Some("clinical judgment override")
    );
    assert_eq!(bitacora.decision_final, None);
    assert_eq!(notificaciones_de_caso(&pool, caso.id).await, 1);

    // Jefatura resuelve en acuerdo con su decisión final
    let jefe = UsuarioActual {
        id: jefe_id,
        rol: RolUsuario::MedicoJefe,
    };
    let resuelto = resolucion::aplicar_decision(
        &pool,
        &jefe,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: Some("corresponde aplicar la ley".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(resuelto.estado, EstadoCaso::Aceptado);
    assert_eq!(resuelto.medico_jefe_id, Some(jefe_id));
    // El caso aceptado entra al seguimiento de aseguradora en pendiente
    assert_eq!(
        resuelto.resolucion_aseguradora,
        Some(ResolucionAseguradora::Pendiente)
    );

    let bitacora = resolucion_de(&pool, caso.id).await.unwrap();
    assert_eq!(bitacora.decision_final, Some(DecisionClinica::Aceptado));
    // La decisión inicial del tratante se conserva tras la resolución final
    assert_eq!(bitacora.decision_medico, Some(DecisionClinica::Aceptado));
    assert!(bitacora.fecha_decision_medico_jefe.is_some());

    // Notificación de derivación + notificación de resolución al tratante
    assert_eq!(notificaciones_de_caso(&pool, caso.id).await, 2);
    let para_medico: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notificaciones WHERE caso_id = ? AND usuario_id = ?",
    )
    .bind(caso.id)
    .bind(medico_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(para_medico, 1);
}

/// Acuerdo con la sugerencia: cierre inmediato sin derivación ni notificación
#[tokio::test]
async fn acuerdo_cierra_sin_derivar() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Rechazar, 90);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    registrar_usuario(&pool, RolUsuario::MedicoJefe).await;

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();

    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };
    let cerrado = resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Rechazado,
            comentario: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(cerrado.estado, EstadoCaso::Rechazado);
    assert_eq!(cerrado.medico_jefe_id, None);
    // Rechazado: sin seguimiento de aseguradora
    assert_eq!(cerrado.resolucion_aseguradora, None);

    let bitacora = resolucion_de(&pool, caso.id).await.unwrap();
    assert_eq!(bitacora.decision_final, Some(DecisionClinica::Rechazado));
    assert_eq!(bitacora.decision_medico, Some(DecisionClinica::Rechazado));
    assert_eq!(notificaciones_de_caso(&pool, caso.id).await, 0);
}

/// Editar datos clínicos reemplaza todas las sugerencias y no toca el estado
#[tokio::test]
async fn edicion_regenera_sugerencia_sin_cambiar_estado() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::secuencia(vec![
        (PolaridadSugerencia::Rechazar, 85),
        (PolaridadSugerencia::Aceptar, 74),
    ]);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;

    let (caso, primera) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();

    let (editado, segunda) = casos::editar_clinica(
        &pool,
        &oraculo,
        caso.id,
        EdicionClinica {
            diagnostico: Some("IAM Killip II".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(editado.estado, EstadoCaso::Pendiente);
    assert_eq!(editado.diagnostico, "IAM Killip II");
    assert_eq!(editado.sugerencia_actual_id, Some(segunda.id));
    assert_ne!(primera.id, segunda.id);

    // Exactamente una fila de sugerencia sobrevive a la edición
    let filas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sugerencia_ia WHERE caso_id = ?")
        .bind(caso.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(filas, 1);
}

/// Cancelar la edición restaura el snapshot textual del caso y su sugerencia
#[tokio::test]
async fn cancelar_edicion_restaura_el_snapshot() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::secuencia(vec![
        (PolaridadSugerencia::Rechazar, 85),
        (PolaridadSugerencia::Aceptar, 74),
    ]);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();

    let snapshot = casos::capturar_snapshot(&pool, caso.id).await.unwrap();

    casos::editar_clinica(
        &pool,
        &oraculo,
        caso.id,
        EdicionClinica {
            diagnostico: Some("Otro diagnóstico".to_string()),
            sintomas: Some("Otros síntomas".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let restaurado = casos::cancelar_edicion(&pool, &snapshot).await.unwrap();

    assert_eq!(restaurado.diagnostico, snapshot.caso.diagnostico);
    assert_eq!(restaurado.sintomas, snapshot.caso.sintomas);
    assert_eq!(restaurado.updated_at, snapshot.caso.updated_at);
    assert!(!restaurado.actualizado_tras_evaluacion);
    assert_eq!(
        restaurado.sugerencia_actual_id,
        snapshot.sugerencia.as_ref().map(|s| s.id)
    );

    let vigente = casos::sugerencia_actual(&pool, &restaurado)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some(vigente), snapshot.sugerencia);
}

/// Importación masiva: casos aceptados actualizados, episodios duplicados
/// incluidos, y episodios sin coincidencia tolerados línea a línea
#[tokio::test]
async fn importacion_masiva_actualiza_casos_aceptados() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Aceptar, 80);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };

    // Dos casos aceptados con episodios EP-001 y EP-002
    for episodio in ["EP-001", "EP-002"] {
        let mut nuevo = caso_base();
        nuevo.episodio = Some(episodio.to_string());
        let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, nuevo)
            .await
            .unwrap();
        resolucion::aplicar_decision(
            &pool,
            &medico,
            caso.id,
            SolicitudDecision {
                decision: DecisionClinica::Aceptado,
                comentario: None,
            },
        )
        .await
        .unwrap();
    }

    let resumen = aseguradora::importar_lote(
        &pool,
        "EP-001,Aceptada\nEP-002,Rechazada\nEP-999,Pendiente",
    )
    .await
    .unwrap();

    assert_eq!(resumen.exitosas, 2);
    assert_eq!(resumen.casos_actualizados, 2);
    assert_eq!(resumen.no_encontradas, 1);
    assert_eq!(resumen.episodios_no_encontrados, vec!["EP-999".to_string()]);

    let estados: Vec<(String, String)> = sqlx::query_as(
        "SELECT episodio, resolucion_aseguradora FROM casos ORDER BY episodio",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        estados,
        vec![
            ("EP-001".to_string(), "aceptada".to_string()),
            ("EP-002".to_string(), "rechazada".to_string()),
        ]
    );
}

/// Compuerta de formato: una línea malformada impide todas las escrituras
#[tokio::test]
async fn lote_malformado_no_escribe_nada() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Aceptar, 80);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();
    resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: None,
        },
    )
    .await
    .unwrap();

    let error = aseguradora::importar_lote(&pool, "EP-001,Aceptada\nEP-002,sin,formato")
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::Validacion(_)));

    // EP-001 sigue en pendiente: la línea válida tampoco se aplicó
    let actual = casos::obtener_caso(&pool, caso.id).await.unwrap();
    assert_eq!(
        actual.resolucion_aseguradora,
        Some(ResolucionAseguradora::Pendiente)
    );
}

/// La planilla PERTINENTE/NO PERTINENTE alimenta el mismo pipeline de texto
#[tokio::test]
async fn planilla_pertinente_termina_en_aceptada() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Aceptar, 80);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();
    resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: None,
        },
    )
    .await
    .unwrap();

    let filas = vec![
        vec!["Episodio".to_string(), "Validación".to_string()],
        vec!["EP-001".to_string(), "PERTINENTE".to_string()],
    ];
    let texto = planilla::traducir_planilla(&filas).unwrap();
    assert_eq!(texto, "EP-001,Aceptada");

    let resumen = aseguradora::importar_lote(&pool, &texto).await.unwrap();
    assert_eq!(resumen.exitosas, 1);

    let actual = casos::obtener_caso(&pool, caso.id).await.unwrap();
    assert_eq!(
        actual.resolucion_aseguradora,
        Some(ResolucionAseguradora::Aceptada)
    );
}

/// La anulación manual solo aplica sobre casos aceptados
#[tokio::test]
async fn anulacion_manual_exige_caso_aceptado() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Rechazar, 85);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();

    // Caso pendiente: el seguimiento de aseguradora no aplica
    let error =
        aseguradora::cambiar_resolucion_manual(&pool, caso.id, ResolucionAseguradora::Aceptada)
            .await
            .unwrap_err();
    assert!(matches!(error, ApiError::Validacion(_)));

    let actual = casos::obtener_caso(&pool, caso.id).await.unwrap();
    assert_eq!(actual.resolucion_aseguradora, None);
}

/// Jefatura puede re-resolver un caso cerrado; el reclamo de jefatura no se pierde
#[tokio::test]
async fn jefatura_reresuelve_caso_cerrado() {
    let (_dir, pool) = pool_de_prueba().await;
    let oraculo = OraculoFijo::siempre(PolaridadSugerencia::Aceptar, 80);
    let medico_id = registrar_usuario(&pool, RolUsuario::MedicoTratante).await;
    let jefe_id = registrar_usuario(&pool, RolUsuario::MedicoJefe).await;

    let (caso, _) = casos::crear_caso(&pool, &oraculo, medico_id, caso_base())
        .await
        .unwrap();
    let medico = UsuarioActual {
        id: medico_id,
        rol: RolUsuario::MedicoTratante,
    };
    resolucion::aplicar_decision(
        &pool,
        &medico,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Aceptado,
            comentario: None,
        },
    )
    .await
    .unwrap();

    // Re-resolución en desacuerdo con la sugerencia: comentario obligatorio
    let jefe = UsuarioActual {
        id: jefe_id,
        rol: RolUsuario::MedicoJefe,
    };
    let reresuelto = resolucion::aplicar_decision(
        &pool,
        &jefe,
        caso.id,
        SolicitudDecision {
            decision: DecisionClinica::Rechazado,
            comentario: Some("no cumple criterios tras revisión".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(reresuelto.estado, EstadoCaso::Rechazado);
    assert_eq!(reresuelto.medico_jefe_id, Some(jefe_id));
    assert_eq!(reresuelto.resolucion_aseguradora, None);

    let bitacora = resolucion_de(&pool, caso.id).await.unwrap();
    assert_eq!(bitacora.decision_final, Some(DecisionClinica::Rechazado));
    // La decisión original del tratante sigue registrada
    assert_eq!(bitacora.decision_medico, Some(DecisionClinica::Aceptado));
}
