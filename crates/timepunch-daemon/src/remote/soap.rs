//! SOAP 1.1 client for the remote swipe services.
//!
//! Uses reqwest to POST hand-built envelopes; the response surface is a
//! handful of scalar tags, decoded in [`super::codec`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use timepunch_core::config::RemoteConfig;

use super::SwipeApi;
use super::codec::{base64_encode, parse_swipe_summary, tag_text, xml_escape};
use super::types::{RemoteError, SwipeSummary};

const NAMESPACE: &str = "http://msiwebtrax.com/";
const SUMMARY_SERVICE: &str = "MSIWebTraxCheckInSummary.asmx";
const CHECKIN_SERVICE: &str = "MSIWebTraxCheckIn.asmx";

/// Transport-level timeout cap; per-call deadlines are enforced above this
/// layer by the gateway.
const MAX_TRANSPORT_SECS: u64 = 10;

/// Production [`SwipeApi`] implementation over HTTP.
pub struct SoapSwipeClient {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl SoapSwipeClient {
    /// Create a client from the remote section of the settings.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if config.endpoint.is_empty() {
            return Err(RemoteError::Config("remote.endpoint is empty".into()));
        }

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.min(MAX_TRANSPORT_SECS)))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Build the URL for a service under `{endpoint}Services/`.
    fn service_url(&self, service: &str) -> String {
        format!("{}Services/{}", self.endpoint, service)
    }

    /// Wrap an operation element in a SOAP envelope carrying the
    /// credentials header the service expects on every call.
    fn envelope(&self, body: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
                r#"<soap:Header><UserCredentials xmlns="{ns}">"#,
                "<UserName>{user}</UserName><PWD>{pwd}</PWD>",
                "</UserCredentials></soap:Header>",
                "<soap:Body>{body}</soap:Body></soap:Envelope>"
            ),
            ns = NAMESPACE,
            user = xml_escape(&self.username),
            pwd = xml_escape(&self.password),
            body = body,
        )
    }

    async fn post(
        &self,
        service: &str,
        operation: &str,
        body: &str,
    ) -> Result<String, RemoteError> {
        let url = self.service_url(service);
        debug!(url = %url, operation, "SOAP call");
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{NAMESPACE}{operation}\""))
            .body(self.envelope(body))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").into(),
            });
        }
        Ok(resp.text().await?)
    }

    async fn record_swipe(
        &self,
        operation: &str,
        swipe_input: &str,
    ) -> Result<SwipeSummary, RemoteError> {
        let body = format!(
            r#"<{operation} xmlns="{NAMESPACE}"><swipeInput>{}</swipeInput></{operation}>"#,
            xml_escape(swipe_input),
        );
        let text = self.post(SUMMARY_SERVICE, operation, &body).await?;
        parse_swipe_summary(&text)
    }

    /// Fetch a service's WSDL and check the named operation is published.
    async fn probe_service(&self, service: &str, operation: &str) -> Result<bool, RemoteError> {
        let url = format!("{}?WSDL", self.service_url(service));
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").into(),
            });
        }
        Ok(resp.text().await?.contains(operation))
    }
}

#[async_trait]
impl SwipeApi for SoapSwipeClient {
    async fn record_swipe_summary(&self, swipe_input: &str) -> Result<SwipeSummary, RemoteError> {
        self.record_swipe("RecordSwipeSummary", swipe_input).await
    }

    async fn record_swipe_summary_department_override(
        &self,
        swipe_input: &str,
    ) -> Result<SwipeSummary, RemoteError> {
        self.record_swipe("RecordSwipeSummaryDepartmentOverride", swipe_input)
            .await
    }

    async fn save_image(
        &self,
        file_name: &str,
        data: &[u8],
        dir: &str,
    ) -> Result<(), RemoteError> {
        let body = format!(
            concat!(
                r#"<SaveImage xmlns="{ns}">"#,
                "<fileName>{file}</fileName><data>{data}</data><dir>{dir}</dir>",
                "</SaveImage>"
            ),
            ns = NAMESPACE,
            file = xml_escape(file_name),
            data = base64_encode(data),
            dir = xml_escape(dir),
        );
        let text = self.post(CHECKIN_SERVICE, "SaveImage", &body).await?;

        if let Some(code) = tag_text(&text, "SystemErrorCode")
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|&c| c != 0)
        {
            return Err(RemoteError::Api {
                status: 200,
                message: format!("SaveImage error code {code}"),
            });
        }
        Ok(())
    }

    async fn probe(&self) -> Result<(), RemoteError> {
        let mut missing = Vec::new();
        if !self
            .probe_service(SUMMARY_SERVICE, "RecordSwipeSummary")
            .await?
        {
            missing.push("RecordSwipeSummary");
        }
        if !self.probe_service(CHECKIN_SERVICE, "RecordSwipe").await? {
            missing.push("RecordSwipe");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RemoteError::Probe(format!(
                "Required SOAP operations not found: {}",
                missing.join(", ")
            )))
        }
    }
}
