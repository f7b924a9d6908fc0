use crate::call_models::{AnalyticsData, ApiEnvelope, Call, CallList, CreateCallRequest};
use crate::dashboard::DashboardSource;
use crate::error::ErrorBody;
use crate::models::{
    CreateUrlDocumentRequest, DeleteDocumentResponse, Document, UpdateDocumentRequest,
};
use crate::user_models::{CredentialsRequest, LoginResponse, UserProfile};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// HTTP client for the coaching API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<UserProfile> {
        let response = self
            .http
            .post(self.url("/auth/signup"))
            .json(&credentials(username, password))
            .send()
            .await?;
        decode(response, "Failed to sign up").await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&credentials(username, password))
            .send()
            .await?;
        decode(response, "Failed to log in").await
    }

    pub async fn logout(&self) -> Result<()> {
        let response = self
            .authorized(self.http.post(self.url("/auth/logout")))
            .send()
            .await?;
        decode::<serde_json::Value>(response, "Failed to log out").await?;
        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let response = self
            .authorized(self.http.get(self.url("/documents")))
            .send()
            .await?;
        decode(response, "Failed to fetch documents").await
    }

    pub async fn get_document(&self, id: &str) -> Result<Document> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/documents/{id}"))))
            .send()
            .await?;
        decode(response, "Failed to fetch document").await
    }

    pub async fn upload_document(
        &self,
        file: &Path,
        name: Option<String>,
        tags: &[String],
    ) -> Result<Document> {
        let data = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = mime_guess::from_path(file).first_or_octet_stream();

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime.essence_str())?;
        let mut form = Form::new().part("file", part);
        if let Some(name) = name {
            form = form.text("name", name);
        }
        if !tags.is_empty() {
            form = form.text("tags", tags.join(","));
        }

        let response = self
            .authorized(self.http.post(self.url("/documents/upload")))
            .multipart(form)
            .send()
            .await?;
        decode(response, "Failed to upload document").await
    }

    pub async fn create_url_document(&self, name: &str, url: &str, tags: Vec<String>) -> Result<Document> {
        let payload = CreateUrlDocumentRequest {
            name: Some(name.to_string()),
            url: Some(url.to_string()),
            tags,
        };
        let response = self
            .authorized(self.http.post(self.url("/documents/url")))
            .json(&payload)
            .send()
            .await?;
        decode(response, "Failed to create document").await
    }

    pub async fn update_document(&self, id: &str, update: &UpdateDocumentRequest) -> Result<Document> {
        let response = self
            .authorized(self.http.patch(self.url(&format!("/documents/{id}"))))
            .json(update)
            .send()
            .await?;
        decode(response, "Failed to update document").await
    }

    pub async fn delete_document(&self, id: &str) -> Result<DeleteDocumentResponse> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/documents/{id}"))))
            .send()
            .await?;
        decode(response, "Failed to delete document").await
    }

    pub async fn log_call(&self, call: &CreateCallRequest) -> Result<Call> {
        let response = self
            .authorized(self.http.post(self.url("/calls")))
            .json(call)
            .send()
            .await?;
        let envelope: ApiEnvelope<Call> = decode(response, "Failed to log call").await?;
        envelope.data.context("Server returned no call")
    }
}

#[async_trait]
impl DashboardSource for ApiClient {
    async fn analytics(&self) -> Result<ApiEnvelope<AnalyticsData>> {
        let response = self
            .authorized(self.http.get(self.url("/dashboard/analytics")))
            .send()
            .await?;
        decode(response, "Failed to fetch analytics").await
    }

    async fn recent_calls(&self, limit: usize) -> Result<ApiEnvelope<CallList>> {
        let response = self
            .authorized(self.http.get(self.url("/calls")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        decode(response, "Failed to fetch calls").await
    }
}

fn credentials(username: &str, password: &str) -> CredentialsRequest {
    CredentialsRequest {
        username: username.to_string(),
        password: password.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        bail!("{action}: {message} ({status})");
    }

    response
        .json()
        .await
        .with_context(|| format!("{action}: unexpected response body"))
}
