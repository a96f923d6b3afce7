use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::env;
use thiserror::Error;

const MB: usize = 1024 * 1024;

/// Folder recipe and profile media lands in
pub const MEDIA_FOLDER: &str = "chilli";

#[derive(Debug, Error, PartialEq)]
pub enum UploadError {
    /// The client sent something we will not upload
    #[error("{0}")]
    Invalid(String),

    /// Cloudinary could not be reached or refused the upload
    #[error("{0}")]
    Upstream(String),
}

fn too_large(limit: usize) -> UploadError {
    UploadError::Invalid(format!("File too large. Maximum size: {} MB", limit / MB))
}

/// Append a chunk of an incoming file, refusing to grow past `limit` bytes.
pub fn push_chunk(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize) -> Result<(), UploadError> {
    if buffer.len() + chunk.len() > limit {
        return Err(too_large(limit));
    }
    buffer.extend_from_slice(chunk);
    Ok(())
}

/// Cloudinary configuration loaded from environment variables
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_preset: Option<String>,
}

impl CloudinaryConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .map_err(|_| "CLOUDINARY_CLOUD_NAME is required")?,
            api_key: env::var("CLOUDINARY_API_KEY")
                .map_err(|_| "CLOUDINARY_API_KEY is required")?,
            api_secret: env::var("CLOUDINARY_API_SECRET")
                .map_err(|_| "CLOUDINARY_API_SECRET is required")?,
            upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET").ok(),
        })
    }

    pub fn upload_url(&self, resource_type: ResourceType) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/upload",
            self.cloud_name,
            resource_type.as_str()
        )
    }

    /// Parameters must already be sorted by name and joined with `&`.
    pub fn generate_signature(&self, params: &str, timestamp: i64) -> String {
        let to_sign = if params.is_empty() {
            format!("timestamp={}{}", timestamp, self.api_secret)
        } else {
            format!("{}&timestamp={}{}", params, timestamp, self.api_secret)
        };
        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn signed_params(&self, folder: Option<&str>) -> String {
        let mut params = Vec::new();
        if let Some(folder) = folder {
            params.push(format!("folder={}", folder));
        }
        if let Some(preset) = &self.upload_preset {
            params.push(format!("upload_preset={}", preset));
        }
        params.join("&")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CloudinaryUploadResponse {
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub resource_type: String,
    pub bytes: u64,
    pub secure_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CloudinaryError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CloudinaryErrorResponse {
    pub error: CloudinaryError,
}

pub struct UploadService {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl UploadService {
    pub fn new() -> Result<Self, String> {
        let config = CloudinaryConfig::from_env()?;
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    async fn upload_file(
        &self,
        file: FileUpload,
        resource_type: ResourceType,
        folder: Option<&str>,
    ) -> Result<CloudinaryUploadResponse, UploadError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self
            .config
            .generate_signature(&self.config.signed_params(folder), timestamp);

        let mime = file
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_part = Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&mime)
            .map_err(|e| UploadError::Invalid(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature);

        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }
        if let Some(preset) = &self.config.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .client
            .post(self.config.upload_url(resource_type))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                UploadError::Upstream(format!("Failed to send upload request: {}", e))
            })?;

        if response.status().is_success() {
            response
                .json::<CloudinaryUploadResponse>()
                .await
                .map_err(|e| {
                    UploadError::Upstream(format!("Failed to parse upload response: {}", e))
                })
        } else {
            let status = response.status();
            let message = match response.json::<CloudinaryErrorResponse>().await {
                Ok(error_response) => {
                    format!("Cloudinary upload failed: {}", error_response.error.message)
                }
                Err(_) => format!("Cloudinary upload failed with status {}", status),
            };
            Err(UploadError::Upstream(message))
        }
    }

    /// Validate against the image or video rules and upload.
    pub async fn upload_media(
        &self,
        file: FileUpload,
        folder: Option<&str>,
    ) -> Result<CloudinaryUploadResponse, UploadError> {
        let validator = FileValidator::for_file(&file)?;
        validator.validate(&file)?;

        self.upload_file(file, validator.resource_type, folder).await
    }
}

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(file_name: String, data: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            file_name,
            data,
            content_type,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_name)
    }
}

/// Lowercased extension, `None` when the name has no dot
fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct FileValidator {
    pub allowed_extensions: Vec<&'static str>,
    pub max_file_size: usize,
    pub resource_type: ResourceType,
}

impl FileValidator {
    pub fn images() -> Self {
        Self {
            allowed_extensions: vec!["jpg", "jpeg", "png", "gif", "webp"],
            max_file_size: 10 * MB,
            resource_type: ResourceType::Image,
        }
    }

    pub fn videos() -> Self {
        Self {
            allowed_extensions: vec!["mp4", "mov", "webm"],
            max_file_size: 100 * MB,
            resource_type: ResourceType::Video,
        }
    }

    /// Picks the image or video rules from a file name's extension, so the
    /// size limit is known before the body is read.
    pub fn for_name(file_name: &str) -> Result<Self, UploadError> {
        let extension = extension_of(file_name)
            .ok_or_else(|| UploadError::Invalid("File has no extension".to_string()))?;

        [Self::images(), Self::videos()]
            .into_iter()
            .find(|validator| validator.allowed_extensions.contains(&extension.as_str()))
            .ok_or_else(|| {
                UploadError::Invalid(format!(
                    "Invalid file type '{}'. Only images and videos can be uploaded",
                    extension
                ))
            })
    }

    pub fn for_file(file: &FileUpload) -> Result<Self, UploadError> {
        Self::for_name(&file.file_name)
    }

    pub fn validate(&self, file: &FileUpload) -> Result<(), UploadError> {
        if file.data.is_empty() {
            return Err(UploadError::Invalid("File is empty".to_string()));
        }

        let extension = file
            .extension()
            .ok_or_else(|| UploadError::Invalid("File has no extension".to_string()))?;
        if !self.allowed_extensions.contains(&extension.as_str()) {
            return Err(UploadError::Invalid(format!(
                "Invalid file type '{}'. Allowed types: {}",
                extension,
                self.allowed_extensions.join(", ")
            )));
        }

        if file.size() > self.max_file_size {
            return Err(too_large(self.max_file_size));
        }

        Ok(())
    }
}
