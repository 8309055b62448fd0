//! Backend collaborator for feedback responses.
//!
//! Provides a `ResponseStore` trait with implementations for:
//! - **Supabase**: the hosted `voting_responses` table over its REST interface
//! - **Memory**: an append-only in-process table for tests and offline demos
//!
//! Every call is a single attempt. Failures are returned to the caller, which
//! decides whether the user should try again.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::{BackendConfig, EncuestaConfig};
use crate::error::EncuestaError;
use crate::models::{FeedbackResponse, NewFeedbackResponse};

// ============================================================================
// ResponseStore trait
// ============================================================================

/// Append-only access to the response table.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Persist one response. Returns the stored row including its backend id.
    async fn insert(&self, response: &NewFeedbackResponse) -> Result<FeedbackResponse, StoreError>;

    /// All stored responses, most recent `created_at` first.
    async fn select(&self) -> Result<Vec<FeedbackResponse>, StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Persistence failures on insert or select.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Insert returned no rows")]
    EmptyInsertResponse,

    #[error("Missing backend URL or access key")]
    MissingCredentials,
}

/// Create the store described by the configuration.
pub fn create_store(config: &EncuestaConfig) -> Result<Box<dyn ResponseStore>, EncuestaError> {
    config.validate_backend()?;
    Ok(Box::new(SupabaseStore::new(&config.backend)?))
}

// ============================================================================
// SupabaseStore
// ============================================================================

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

/// REST client for the hosted table.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    table_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: &BackendConfig) -> Result<Self, StoreError> {
        if config.url.trim().is_empty() || config.anon_key.trim().is_empty() {
            return Err(StoreError::MissingCredentials);
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            anon_key: config.anon_key.clone(),
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PostgrestError>(&error_body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Response table API error");

            return Err(StoreError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ResponseStore for SupabaseStore {
    async fn insert(&self, response: &NewFeedbackResponse) -> Result<FeedbackResponse, StoreError> {
        let http_response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=representation")
            .json(response)
            .send()
            .await?;

        let body = Self::read_body(http_response).await?;
        let rows: Vec<FeedbackResponse> = serde_json::from_str(&body)?;
        let stored = rows.into_iter().next().ok_or(StoreError::EmptyInsertResponse)?;

        tracing::info!(id = ?stored.id, "Stored feedback response");
        Ok(stored)
    }

    async fn select(&self) -> Result<Vec<FeedbackResponse>, StoreError> {
        let http_response = self
            .client
            .get(&self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        let body = Self::read_body(http_response).await?;
        let rows: Vec<FeedbackResponse> = serde_json::from_str(&body)?;

        tracing::debug!(count = rows.len(), "Loaded feedback responses");
        Ok(rows)
    }

    fn name(&self) -> &str {
        "supabase"
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<FeedbackResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with rows that are already stored.
    pub fn with_records(rows: Vec<FeedbackResponse>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn insert(&self, response: &NewFeedbackResponse) -> Result<FeedbackResponse, StoreError> {
        let stored = response.clone().into_stored(Uuid::new_v4().to_string());
        self.rows.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn select(&self) -> Result<Vec<FeedbackResponse>, StoreError> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// TESTS
// ============================================================================
