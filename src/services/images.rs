//! Product image hosting on Cloudinary.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Image must be a base64 data URI")]
    InvalidDataUri,

    #[error("Image uploads are not configured")]
    Disabled,
}

/// What the image host reports back about a stored image.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
}

impl From<UploadResponse> for UploadedImage {
    fn from(r: UploadResponse) -> Self {
        Self { url: r.secure_url, public_id: r.public_id, width: r.width, height: r.height, format: r.format }
    }
}

impl From<ImageError> for crate::CommerceError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::InvalidDataUri => Self::Validation(e.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, data_uri: &str, folder: &str) -> Result<UploadedImage, ImageError>;
    async fn destroy(&self, public_id: &str) -> Result<(), ImageError>;
}

#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("cloud_name", &self.cloud_name)
            .field("api_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            client: Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String { format!("{CLOUDINARY_API_BASE}/{}/image/{action}", self.cloud_name) }

    async fn post_signed(&self, action: &str, mut params: Vec<(&'static str, String)>, file: Option<&str>) -> Result<reqwest::Response, ImageError> {
        params.push(("timestamp", chrono::Utc::now().timestamp().to_string()));
        let signature = sign_params(&params, self.api_secret.expose_secret());
        let mut form: Vec<(&str, String)> = params;
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));
        if let Some(file) = file {
            form.push(("file", file.to_string()));
        }

        let response = self.client.post(self.endpoint(action)).form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status, %message, action, "Cloudinary request failed");
            return Err(ImageError::Rejected { status, message });
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageStore for CloudinaryClient {
    #[tracing::instrument(skip(self, data_uri))]
    async fn upload(&self, data_uri: &str, folder: &str) -> Result<UploadedImage, ImageError> {
        check_data_uri(data_uri)?;
        let response = self.post_signed("upload", vec![("folder", folder.to_string())], Some(data_uri)).await?;
        let image = UploadedImage::from(response.json::<UploadResponse>().await?);
        tracing::info!(public_id = %image.public_id, "Image uploaded");
        Ok(image)
    }

    #[tracing::instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<(), ImageError> {
        self.post_signed("destroy", vec![("public_id", public_id.to_string())], None).await?;
        Ok(())
    }
}

/// Stand-in when Cloudinary credentials are absent.
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _data_uri: &str, _folder: &str) -> Result<UploadedImage, ImageError> { Err(ImageError::Disabled) }
    async fn destroy(&self, public_id: &str) -> Result<(), ImageError> {
        tracing::warn!(public_id, "Image store disabled, remote image left in place");
        Ok(())
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

fn check_data_uri(data_uri: &str) -> Result<(), ImageError> {
    match data_uri.strip_prefix("data:image/") {
        Some(rest) if rest.contains(";base64,") => Ok(()),
        _ => Err(ImageError::InvalidDataUri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_params_sorts_keys() {
        let a = sign_params(&[("timestamp", "1700000000".into()), ("folder", "products".into())], "secret");
        let b = sign_params(&[("folder", "products".into()), ("timestamp", "1700000000".into())], "secret");
        assert_eq!(a, b);
        let expected = hex::encode(Sha256::digest(b"folder=products&timestamp=1700000000secret"));
        assert_eq!(a, expected);
    }

    #[test]
    fn test_check_data_uri() {
        assert!(check_data_uri("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(check_data_uri("https://example.com/a.png").is_err());
        assert!(check_data_uri("data:text/plain;base64,aGk=").is_err());
    }

    #[test]
    fn test_uploaded_image_reads_secure_url() {
        let response: UploadResponse = serde_json::from_str(
            r#"{"url":"http://res.cloudinary.com/x/p.png","secure_url":"https://res.cloudinary.com/x/p.png","public_id":"products/p","width":800,"height":600,"format":"png","bytes":1234}"#,
        ).unwrap();
        let image = UploadedImage::from(response);
        assert_eq!(image.url, "https://res.cloudinary.com/x/p.png");
        assert_eq!(image.public_id, "products/p");
        assert_eq!(image.width, Some(800));
    }

    #[tokio::test]
    async fn test_disabled_store_refuses_uploads() {
        assert!(matches!(DisabledImageStore.upload("data:image/png;base64,AA==", "products").await, Err(ImageError::Disabled)));
    }
}
