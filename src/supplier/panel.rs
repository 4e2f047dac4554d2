//! HTTP client for standard SMM panel APIs.
//!
//! Panels expose a single endpoint taking `{key, action, ...}` and answer
//! 200 for almost everything; logical failures come back as an `error`
//! field in the body. Response shapes drift between panels, so parsing is
//! deliberately lenient about scalars but strict about which field names
//! are tried.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{DispatchReceipt, DispatchRequest, SupplierClient, SupplierError, SupplierService};
use crate::settings::SupplierSettings;
use crate::utils::{body_snippet, scalar_to_string, scalar_to_u64};

pub struct PanelClient {
    http: Client,
    settings: SupplierSettings,
}

#[derive(Serialize)]
struct PanelRequest<'a> {
    key: &'a str,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a str>,
}

impl<'a> PanelRequest<'a> {
    fn new(key: &'a str, action: &'a str) -> Self {
        Self {
            key,
            action,
            service: None,
            link: None,
            quantity: None,
            order: None,
        }
    }
}

impl PanelClient {
    pub fn new(http: Client, settings: SupplierSettings) -> Self {
        Self { http, settings }
    }

    fn ensure_configured(&self) -> Result<(), SupplierError> {
        if !self.settings.is_configured() {
            return Err(SupplierError::Unconfigured(
                "supplier API url and key must be set".to_string(),
            ));
        }
        Ok(())
    }

    async fn call(&self, request: &PanelRequest<'_>) -> Result<Value, SupplierError> {
        let response = self
            .http
            .post(&self.settings.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| SupplierError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| SupplierError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SupplierError::Upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body_snippet(&raw)
            )));
        }

        let value: Value = serde_json::from_str(&raw)
            .map_err(|_| SupplierError::UnrecognizedResponse(body_snippet(&raw)))?;

        if let Some(error) = value.get("error") {
            let message = scalar_to_string(error).unwrap_or_else(|| error.to_string());
            return Err(SupplierError::Upstream(message));
        }
        Ok(value)
    }
}

#[async_trait]
impl SupplierClient for PanelClient {
    async fn submit_order(
        &self,
        request: &DispatchRequest,
    ) -> Result<DispatchReceipt, SupplierError> {
        self.ensure_configured()?;

        let mut body = PanelRequest::new(&self.settings.api_key, "add");
        body.service = Some(&request.service);
        body.link = Some(&request.link);
        body.quantity = Some(request.quantity);

        let value = self.call(&body).await?;
        let supplier_order_id = value
            .get("order")
            .and_then(scalar_to_string)
            .ok_or_else(|| {
                SupplierError::UnrecognizedResponse(format!("no order id in: {value}"))
            })?;

        Ok(DispatchReceipt {
            supplier_order_id,
            supplier_status: None,
        })
    }

    async fn order_status(&self, supplier_order_id: &str) -> Result<String, SupplierError> {
        self.ensure_configured()?;

        let mut body = PanelRequest::new(&self.settings.api_key, "status");
        body.order = Some(supplier_order_id);
        let value = self.call(&body).await?;

        // Ordered probe: the configured override first, then the common
        // field, then the bare order echo some panels send.
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(field) = self.settings.status_field.as_deref() {
            candidates.push(field);
        }
        candidates.push("status");
        candidates.push("order");

        for field in candidates {
            if let Some(status) = value.get(field).and_then(scalar_to_string) {
                return Ok(status);
            }
        }
        Err(SupplierError::UnrecognizedResponse(format!(
            "no status field in: {value}"
        )))
    }

    async fn balance(&self) -> Result<BigDecimal, SupplierError> {
        self.ensure_configured()?;

        let value = self
            .call(&PanelRequest::new(&self.settings.api_key, "balance"))
            .await?;

        value
            .get("balance")
            .and_then(scalar_to_string)
            .and_then(|raw| raw.trim().parse::<BigDecimal>().ok())
            .ok_or_else(|| SupplierError::UnrecognizedResponse(format!("no balance in: {value}")))
    }

    async fn list_services(&self) -> Result<Vec<SupplierService>, SupplierError> {
        self.ensure_configured()?;

        let value = self
            .call(&PanelRequest::new(&self.settings.api_key, "services"))
            .await?;

        let entries = value.as_array().ok_or_else(|| {
            SupplierError::UnrecognizedResponse(format!("services is not a list: {value}"))
        })?;

        let mut services = Vec::with_capacity(entries.len());
        for entry in entries {
            let service = entry.get("service").and_then(scalar_to_string);
            let name = entry.get("name").and_then(scalar_to_string);
            let (Some(service), Some(name)) = (service, name) else {
                return Err(SupplierError::UnrecognizedResponse(format!(
                    "service entry missing id or name: {entry}"
                )));
            };

            services.push(SupplierService {
                service,
                name,
                rate: entry
                    .get("rate")
                    .and_then(scalar_to_string)
                    .unwrap_or_default(),
                min: entry.get("min").and_then(scalar_to_u64).unwrap_or(0),
                max: entry.get("max").and_then(scalar_to_u64).unwrap_or(0),
            });
        }
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::str::FromStr;

    fn settings_for(server: &mockito::Server) -> SupplierSettings {
        SupplierSettings {
            api_url: format!("{}/api/v2", server.url()),
            api_key: "panel-key".to_string(),
            default_service: None,
            default_quantity: 100,
            status_field: None,
        }
    }

    fn dispatch_request() -> DispatchRequest {
        DispatchRequest {
            order_id: 1001,
            service: "2044".to_string(),
            link: "https://instagram.com/someone".to_string(),
            quantity: 1000,
        }
    }

    #[tokio::test]
    async fn test_submit_order_returns_the_supplier_order_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2")
            .match_body(Matcher::PartialJson(json!({
                "key": "panel-key",
                "action": "add",
                "service": "2044",
                "link": "https://instagram.com/someone",
                "quantity": 1000,
            })))
            .with_status(200)
            .with_body(r#"{"order": 777123}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let receipt = client.submit_order(&dispatch_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(receipt.supplier_order_id, "777123");
        assert_eq!(receipt.supplier_status, None);
    }

    #[tokio::test]
    async fn test_error_field_means_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"error": "Not enough funds"}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let err = client.submit_order(&dispatch_request()).await.unwrap_err();

        match err {
            SupplierError::Upstream(message) => assert_eq!(message, "Not enough funds"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_without_order_id_is_unrecognized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let err = client.submit_order(&dispatch_request()).await.unwrap_err();

        assert!(matches!(err, SupplierError::UnrecognizedResponse(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_client_never_calls_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/api/v2").expect(0).create_async().await;

        let mut settings = settings_for(&server);
        settings.api_key = String::new();
        let client = PanelClient::new(Client::new(), settings);

        let err = client.submit_order(&dispatch_request()).await.unwrap_err();
        assert!(matches!(err, SupplierError::Unconfigured(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_order_status_reads_the_status_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .match_body(Matcher::PartialJson(json!({
                "action": "status",
                "order": "777123",
            })))
            .with_status(200)
            .with_body(r#"{"charge": "0.90", "status": "In progress", "remains": "500"}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let status = client.order_status("777123").await.unwrap();

        assert_eq!(status, "In progress");
    }

    #[tokio::test]
    async fn test_order_status_prefers_the_configured_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"order_state": "Completed", "status": "stale"}"#)
            .create_async()
            .await;

        let mut settings = settings_for(&server);
        settings.status_field = Some("order_state".to_string());
        let client = PanelClient::new(Client::new(), settings);

        let status = client.order_status("1").await.unwrap();
        assert_eq!(status, "Completed");
    }

    #[tokio::test]
    async fn test_order_status_falls_back_to_order_echo() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"order": 777123}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let status = client.order_status("777123").await.unwrap();

        assert_eq!(status, "777123");
    }

    #[tokio::test]
    async fn test_order_status_without_known_fields_is_unrecognized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"foo": "bar"}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let err = client.order_status("1").await.unwrap_err();

        assert!(matches!(err, SupplierError::UnrecognizedResponse(_)));
    }

    #[tokio::test]
    async fn test_balance_parses_string_and_number_forms() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .match_body(Matcher::PartialJson(json!({"action": "balance"})))
            .with_status(200)
            .with_body(r#"{"balance": "99.85", "currency": "USD"}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let balance = client.balance().await.unwrap();
        assert_eq!(balance, BigDecimal::from_str("99.85").unwrap());
    }

    #[tokio::test]
    async fn test_list_services_tolerates_scalar_drift() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .match_body(Matcher::PartialJson(json!({"action": "services"})))
            .with_status(200)
            .with_body(
                json!([
                    {"service": 2044, "name": "Followers", "rate": 1.5, "min": "100", "max": 10000},
                    {"service": "2045", "name": "Likes", "rate": "0.90", "min": 50, "max": "5000"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let services = client.list_services().await.unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service, "2044");
        assert_eq!(services[0].min, 100);
        assert_eq!(services[1].rate, "0.90");
        assert_eq!(services[1].max, 5000);
    }

    #[tokio::test]
    async fn test_non_list_services_response_is_unrecognized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(200)
            .with_body(r#"{"services": []}"#)
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let err = client.list_services().await.unwrap_err();

        assert!(matches!(err, SupplierError::UnrecognizedResponse(_)));
    }

    #[tokio::test]
    async fn test_http_failure_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2")
            .with_status(500)
            .with_body("panel exploded")
            .create_async()
            .await;

        let client = PanelClient::new(Client::new(), settings_for(&server));
        let err = client.balance().await.unwrap_err();

        match err {
            SupplierError::Upstream(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("panel exploded"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
