use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use machinery_core::{PublishRequest, VersionCreationTicket};

use crate::error::{BackendError, Result};
use crate::types::FinalizeVersionRequest;
use crate::PublishProtocol;

const CODE_CONTENT_TYPE: &str = "application/javascript";

/// HTTP client for the machines backend.
pub struct MachinesClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl MachinesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            client: Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.json().await?;
        Ok(body)
    }

    async fn expect_success(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PublishProtocol for MachinesClient {
    async fn create_version(&self, machine: &str) -> Result<VersionCreationTicket> {
        debug!(machine, "creating version record");

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/machines/{}/versions", self.base_url, machine),
            )
            .json(&serde_json::json!({}))
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn upload_code(
        &self,
        ticket: &VersionCreationTicket,
        file_name: &str,
        code: Vec<u8>,
    ) -> Result<()> {
        debug!(
            machine_version_id = %ticket.machine_version_id,
            file_name,
            bytes = code.len(),
            "uploading compressed code"
        );

        // The ticket's fields go into the form verbatim, before the file.
        let mut form = Form::new();
        for (key, value) in &ticket.upload_fields {
            form = form.text(key.clone(), value.clone());
        }
        let part = Part::bytes(code)
            .file_name(file_name.to_string())
            .mime_str(CODE_CONTENT_TYPE)?;
        form = form.part("file", part);

        let response = self
            .client
            .post(&ticket.upload_url)
            .multipart(form)
            .send()
            .await?;

        self.expect_success(response).await
    }

    async fn finalize_version(
        &self,
        machine: &str,
        machine_version_id: &str,
        request: &PublishRequest,
    ) -> Result<()> {
        info!(
            machine,
            machine_version_id,
            version_reference = %request.version_reference,
            make_current = request.make_current,
            "finalizing version"
        );

        let payload = FinalizeVersionRequest {
            version_reference: request.version_reference.clone(),
            make_current: request.make_current,
        };

        let response = self
            .request(
                reqwest::Method::PUT,
                format!(
                    "{}/machines/{}/versions/{}",
                    self.base_url, machine, machine_version_id
                ),
            )
            .json(&payload)
            .send()
            .await?;

        self.expect_success(response).await
    }
}
