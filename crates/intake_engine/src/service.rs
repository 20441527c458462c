use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use url::Url;

use intake_core::{
    CreateInputRequest, FormTransform, InputPayload, LifecycleAction, ProjectStatus,
    SessionBootstrap, UploadResponse,
};
use intake_logging::{intake_debug, intake_info, intake_warn};

use crate::decode::{
    decode_interface_data, decode_project, decode_status, decode_stylesheet,
    decode_upload_xml, decode_uploader_envelope, DecodeError,
};
use crate::{FailureKind, ServiceError};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Root of the service, e.g. `http://localhost:8080/`.
    pub base_url: String,
    pub project: String,
    pub user: Option<String>,
    pub access_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            project: String::new(),
            user: None,
            access_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Remote operations of one project session.
#[async_trait::async_trait]
pub trait ProjectService: Send + Sync {
    /// Template list plus the project's current status and input files.
    async fn load_session(&self) -> Result<SessionBootstrap, ServiceError>;
    async fn load_transform(&self) -> Result<FormTransform, ServiceError>;
    async fn create_input(
        &self,
        request: &CreateInputRequest,
    ) -> Result<UploadResponse, ServiceError>;
    async fn delete_input(&self, filename: &str) -> Result<(), ServiceError>;
    async fn select_input_source(&self, source_id: &str) -> Result<(), ServiceError>;
    async fn poll_status(&self) -> Result<ProjectStatus, ServiceError>;
    async fn lifecycle(&self, action: &LifecycleAction) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ServiceError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// `segments` are appended to the base url; a filename may span several
    /// segments when it names a file in a subdirectory.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Result<Url, ServiceError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ServiceError::new(FailureKind::InvalidUrl, self.base.to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|part| !part.is_empty()));
            }
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    fn project_endpoint(&self, tail: &[&str], trailing_slash: bool) -> Result<Url, ServiceError> {
        let mut segments = vec![self.settings.project.as_str()];
        segments.extend_from_slice(tail);
        self.endpoint(&segments, trailing_slash)
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user) = &self.settings.user {
            pairs.push(("user", user.clone()));
        }
        if let Some(token) = &self.settings.access_token {
            pairs.push(("accesstoken", token.clone()));
        }
        pairs
    }

    fn with_credentials(&self, builder: RequestBuilder) -> RequestBuilder {
        let credentials = self.credentials();
        if credentials.is_empty() {
            builder
        } else {
            builder.query(&credentials)
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        self.with_credentials(builder)
            .send()
            .await
            .map_err(map_reqwest_error)
    }

    /// Sends a request whose body is only meaningful on success.
    async fn fetch_text(&self, builder: RequestBuilder) -> Result<String, ServiceError> {
        let response = self.send(builder).await?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ServiceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                body.trim(),
            ));
        }
        Ok(body)
    }

    /// Sends a request that needs no body back. A 2xx status is success even
    /// if reading the body fails afterwards.
    async fn expect_success(&self, builder: RequestBuilder) -> Result<(), ServiceError> {
        let response = self.send(builder).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::new(
            FailureKind::HttpStatus(status.as_u16()),
            body.trim(),
        ))
    }

    async fn upload_local_file(
        &self,
        request: &CreateInputRequest,
        path: &std::path::Path,
    ) -> Result<UploadResponse, ServiceError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ServiceError::new(FailureKind::Io, format!("{}: {err}", path.display()))
        })?;
        intake_debug!("Uploading {} ({} bytes)", path.display(), bytes.len());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(request.filename.clone()))
            .text("filename", request.filename.clone())
            .text("inputtemplate", request.template_id.clone());
        if let Some(converter) = &request.converter {
            form = form.text("converter", converter.clone());
        }
        for (key, value) in self.credentials() {
            form = form.text(key, value);
        }
        for (id, value) in &request.parameters {
            form = form.text(id.clone(), value.clone());
        }

        let url = self.project_endpoint(&["upload"], true)?;
        let response = self.send(self.client.post(url).multipart(form)).await?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        // Fatal errors may come back as a bare XML document.
        let decoded = if body.trim_start().starts_with('<') {
            decode_upload_xml(&body).map(UploadResponse::Files)
        } else {
            decode_uploader_envelope(&body)
        };
        decoded.map_err(|err| upload_error(status, err))
    }

    async fn create_remote_input(
        &self,
        request: &CreateInputRequest,
    ) -> Result<UploadResponse, ServiceError> {
        let mut fields: Vec<(String, String)> = Vec::new();
        match &request.payload {
            InputPayload::Url(url) => fields.push(("url".to_string(), url.clone())),
            InputPayload::Contents(contents) => {
                fields.push(("contents".to_string(), contents.clone()))
            }
            InputPayload::InputSource(source) => {
                fields.push(("inputsource".to_string(), source.clone()))
            }
            InputPayload::LocalFile(_) => {}
        }
        fields.push(("inputtemplate".to_string(), request.template_id.clone()));
        if let Some(converter) = &request.converter {
            fields.push(("converter".to_string(), converter.clone()));
        }
        fields.extend(request.parameters.iter().cloned());

        let url = self.project_endpoint(&["input", request.filename.as_str()], false)?;
        let response = self.send(self.client.post(url).form(&fields)).await?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        // Parameter and fatal errors carry a 403 with a result document.
        if body.contains("<clamupload") {
            return decode_upload_xml(&body)
                .map(UploadResponse::Files)
                .map_err(|err| upload_error(status, err));
        }
        if !status.is_success() {
            return Err(ServiceError::new(
                FailureKind::HttpStatus(status.as_u16()),
                body.trim(),
            ));
        }
        Err(ServiceError::new(
            FailureKind::Protocol,
            DecodeError::MissingElement("clamupload").to_string(),
        ))
    }
}

fn upload_error(status: reqwest::StatusCode, err: DecodeError) -> ServiceError {
    let kind = match &err {
        DecodeError::Rejected(_) if !status.is_success() => {
            FailureKind::HttpStatus(status.as_u16())
        }
        _ => FailureKind::Protocol,
    };
    ServiceError::new(kind, err.to_string())
}

fn protocol_error(err: DecodeError) -> ServiceError {
    ServiceError::new(FailureKind::Protocol, err.to_string())
}

#[async_trait::async_trait]
impl ProjectService for ReqwestService {
    async fn load_session(&self) -> Result<SessionBootstrap, ServiceError> {
        let script = self
            .fetch_text(self.client.get(self.endpoint(&["data.js"], false)?))
            .await?;
        let templates = decode_interface_data(&script).map_err(protocol_error)?;

        let page = self
            .fetch_text(self.client.get(self.project_endpoint(&[], true)?))
            .await?;
        let project = decode_project(&page).map_err(protocol_error)?;
        intake_info!(
            "Loaded project {}: {} template(s), {} input file(s)",
            self.settings.project,
            templates.len(),
            project.input_files.len()
        );
        Ok(SessionBootstrap { templates, project })
    }

    async fn load_transform(&self) -> Result<FormTransform, ServiceError> {
        let url = self.endpoint(&["static", "parameters.xsl"], false)?;
        let body = self.fetch_text(self.client.get(url)).await?;
        decode_stylesheet(&body).map_err(protocol_error)
    }

    async fn create_input(
        &self,
        request: &CreateInputRequest,
    ) -> Result<UploadResponse, ServiceError> {
        intake_info!(
            "Creating input {} ({}) on {:?}",
            request.filename,
            request.template_id,
            request.surface
        );
        match &request.payload {
            InputPayload::LocalFile(path) => self.upload_local_file(request, path).await,
            _ => self.create_remote_input(request).await,
        }
    }

    async fn delete_input(&self, filename: &str) -> Result<(), ServiceError> {
        let url = self.project_endpoint(&["input", filename], false)?;
        self.expect_success(self.client.delete(url)).await
    }

    async fn select_input_source(&self, source_id: &str) -> Result<(), ServiceError> {
        let url = self.project_endpoint(&["input"], true)?;
        let form = [("inputsource", source_id)];
        self.expect_success(self.client.post(url).form(&form)).await
    }

    async fn poll_status(&self) -> Result<ProjectStatus, ServiceError> {
        let url = self.project_endpoint(&["status"], true)?;
        let body = self.fetch_text(self.client.get(url)).await?;
        decode_status(&body).map_err(protocol_error)
    }

    async fn lifecycle(&self, action: &LifecycleAction) -> Result<(), ServiceError> {
        let builder = match action {
            LifecycleAction::Create { project } => {
                self.client.put(self.endpoint(&[project.as_str()], true)?)
            }
            LifecycleAction::Abort => self
                .client
                .delete(self.project_endpoint(&[], true)?)
                .query(&[("abortonly", "true")]),
            LifecycleAction::Delete => self.client.delete(self.project_endpoint(&[], true)?),
            LifecycleAction::Restart => self
                .client
                .delete(self.project_endpoint(&["output"], true)?),
        };
        let result = self.expect_success(builder).await;
        if let Err(err) = &result {
            intake_warn!("{:?} failed: {}", action, err);
        }
        result
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ServiceError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ServiceError::new(FailureKind::Network, err.to_string())
}
