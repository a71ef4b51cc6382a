//! Acciones fuera de proceso: funciones serverless del backend gestionado
//!
//! Ambas acciones se invocan por HTTP y sus fallas se propagan al usuario
//! como error remoto; no hay reintentos automáticos.

use reqwest::Client;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

/// Datos del correo de resultado enviado al paciente
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorreoPaciente {
    pub to: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub result: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_comment: Option<String>,
}

/// Envía el correo de resultado al paciente
#[cfg_attr(test, mockall::automock)]
#[axum::async_trait]
pub trait EnvioCorreoPaciente: Send + Sync {
    async fn enviar(&self, correo: &CorreoPaciente) -> Result<(), ApiError>;
}

/// Elimina la identidad de un usuario en el proveedor externo
#[cfg_attr(test, mockall::automock)]
#[axum::async_trait]
pub trait BorradoUsuarios: Send + Sync {
    async fn borrar(&self, user_id: Uuid) -> Result<(), ApiError>;
}

/// Cliente de las funciones serverless
#[derive(Debug, Clone)]
pub struct GatewayFunciones {
    base_url: String,
    client: Client,
}

impl GatewayFunciones {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    async fn invocar<T: Serialize + Sync>(&self, funcion: &str, cuerpo: &T) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), funcion);
        let respuesta = self
            .client
            .post(&url)
            .json(cuerpo)
            .send()
            .await
            .map_err(|e| ApiError::Remoto(format!("{} no respondió: {}", funcion, e)))?;

        if !respuesta.status().is_success() {
            return Err(ApiError::Remoto(format!(
                "{} respondió {}",
                funcion,
                respuesta.status()
            )));
        }
        Ok(())
    }
}

#[axum::async_trait]
impl EnvioCorreoPaciente for GatewayFunciones {
    async fn enviar(&self, correo: &CorreoPaciente) -> Result<(), ApiError> {
        self.invocar("send-patient-email", correo).await?;
        info!(destinatario = %correo.to, "correo de resultado enviado");
        Ok(())
    }
}

#[axum::async_trait]
impl BorradoUsuarios for GatewayFunciones {
    async fn borrar(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.invocar("delete-user", &serde_json::json!({ "userId": user_id }))
            .await?;
        info!(usuario = %user_id, "identidad eliminada en el proveedor externo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn correo_de_prueba() -> CorreoPaciente {
        CorreoPaciente {
            to: "paciente@example.com".to_string(),
            patient_name: "María Soto".to_string(),
            diagnosis: "Apendicitis aguda".to_string(),
            result: "aceptado".to_string(),
            explanation: "Cumple criterios de urgencia vital.".to_string(),
            additional_comment: None,
        }
    }

    #[tokio::test]
    async fn envia_correo_contra_la_funcion() {
        let servidor = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-patient-email"))
            .and(body_partial_json(serde_json::json!({
                "to": "paciente@example.com",
                "patientName": "María Soto",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&servidor)
            .await;

        let gateway = GatewayFunciones::new(servidor.uri());
        gateway.enviar(&correo_de_prueba()).await.unwrap();
    }

    #[tokio::test]
    async fn falla_de_la_funcion_se_propaga_como_error_remoto() {
        let servidor = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-patient-email"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&servidor)
            .await;

        let gateway = GatewayFunciones::new(servidor.uri());
        let error = gateway.enviar(&correo_de_prueba()).await.unwrap_err();
        assert!(matches!(error, ApiError::Remoto(_)));
    }

    #[tokio::test]
    async fn borra_usuario_con_payload_esperado() {
        let servidor = MockServer::start().await;
        let user_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/delete-user"))
            .and(body_partial_json(serde_json::json!({ "userId": user_id })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&servidor)
            .await;

        let gateway = GatewayFunciones::new(servidor.uri());
        gateway.borrar(user_id).await.unwrap();
    }
}
