//! Admin RPC client (operator tooling → ordx admin listener).
//!
//! Trigger calls return as soon as the server has accepted the job. The job
//! id, when the server names one in the `Location` header, is returned so
//! callers can poll [`AdminClient::get_job`].

use reqwest::Client;
use reqwest::header::LOCATION;
use url::Url;
use uuid::Uuid;

use super::ClientError;
use crate::objects::admin::{
    IngestBlockResponse, JobResponse, RecountQuery, RepositionQuery, ScanBlocksQuery,
};
use crate::objects::blocks::BlockEvents;
use crate::objects::{CountCriteria, RepositionCriteria};

const ADMIN_PREFIX: &str = "/ordinals/admin";

/// Typed HTTP client for the ordx **admin RPC**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
}

impl AdminClient {
    /// Create a new `AdminClient` rooted at the admin listener's URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /brc-20/scan` – replay a block range through the ingestor.
    pub async fn scan_blocks(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> Result<Option<Uuid>, ClientError> {
        let url = self.endpoint("/brc-20/scan")?;
        let resp = self
            .http
            .post(url)
            .query(&ScanBlocksQuery {
                start_block,
                end_block,
            })
            .send()
            .await?;
        accepted_job_id(resp).await
    }

    /// `POST /inscriptions/reposition` – rebuild a location table.
    pub async fn reposition(
        &self,
        criteria: RepositionCriteria,
    ) -> Result<Option<Uuid>, ClientError> {
        let url = self.endpoint("/inscriptions/reposition")?;
        let resp = self
            .http
            .post(url)
            .query(&RepositionQuery { criteria })
            .send()
            .await?;
        accepted_job_id(resp).await
    }

    /// `POST /inscriptions/recount` – rebuild one count category.
    pub async fn recount(&self, criteria: CountCriteria) -> Result<Option<Uuid>, ClientError> {
        let url = self.endpoint("/inscriptions/recount")?;
        let resp = self
            .http
            .post(url)
            .query(&RecountQuery { criteria })
            .send()
            .await?;
        accepted_job_id(resp).await
    }

    /// `GET /jobs` – list known jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobResponse>, ClientError> {
        let url = self.endpoint("/jobs")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /jobs/{id}`
    pub async fn get_job(&self, id: Uuid) -> Result<JobResponse, ClientError> {
        let url = self.endpoint(&format!("/jobs/{id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /jobs/{id}/cancel` – request cooperative cancellation.
    pub async fn cancel_job(&self, id: Uuid) -> Result<JobResponse, ClientError> {
        let url = self.endpoint(&format!("/jobs/{id}/cancel"))?;
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /blocks` – push one block for synchronous ingestion.
    pub async fn push_block(&self, block: &BlockEvents) -> Result<IngestBlockResponse, ClientError> {
        let url = self.endpoint("/blocks")?;
        let resp = self.http.post(url).json(block).send().await?;
        parse_response(resp).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(&format!("{ADMIN_PREFIX}{path}"))?)
    }
}

async fn accepted_job_id(resp: reqwest::Response) -> Result<Option<Uuid>, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let job_id = resp
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| location.rsplit('/').next())
        .and_then(|id| Uuid::parse_str(id).ok());
    Ok(job_id)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
