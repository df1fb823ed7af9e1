//! Doctor directory client
//!
//! The directory is an external service; only `find_specialist` talks to it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Directory returned HTTP {0}")]
    Status(u16),
    #[error("Doctor directory is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// One page of directory results
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DirectoryPage {
    /// Total matches reported by the directory, which may exceed `items`
    pub count: usize,
    pub items: Vec<Doctor>,
}

#[derive(Deserialize)]
struct RawPage {
    count: Option<usize>,
    #[serde(default, alias = "doctors", alias = "results")]
    items: Vec<Doctor>,
}

impl From<RawPage> for DirectoryPage {
    fn from(raw: RawPage) -> Self {
        Self {
            count: raw.count.unwrap_or(raw.items.len()),
            items: raw.items,
        }
    }
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Search doctors, optionally filtered by specialty
    async fn query(&self, specialty: Option<&str>) -> Result<DirectoryPage, DirectoryError>;
}

/// HTTP directory at `<base>/doctors?specialty=...`
pub struct HttpDoctorDirectory {
    client: Client,
    base_url: String,
}

impl HttpDoctorDirectory {
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DoctorDirectory for HttpDoctorDirectory {
    async fn query(&self, specialty: Option<&str>) -> Result<DirectoryPage, DirectoryError> {
        let mut request = self.client.get(format!("{}/doctors", self.base_url));
        if let Some(specialty) = specialty {
            request = request.query(&[("specialty", specialty)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }
        let page: RawPage = response.json().await?;
        Ok(page.into())
    }
}

/// Stand-in when no directory is configured; every query fails
pub struct UnconfiguredDirectory;

#[async_trait]
impl DoctorDirectory for UnconfiguredDirectory {
    async fn query(&self, _specialty: Option<&str>) -> Result<DirectoryPage, DirectoryError> {
        Err(DirectoryError::NotConfigured)
    }
}
