//! Thin client for the native B2 REST API.
//!
//! Each method performs exactly one HTTP call and maps non-2xx answers to the
//! error variant of the pipeline that issued it. No method retries.

use crate::traits::{StorageError, StorageResult};
use bytes::Bytes;
use quire_core::constants::{B2_API_VERSION_PATH, B2_CONNECT_TIMEOUT_SECS};
use reqwest::{Client, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeAccountResponse {
    pub account_id: String,
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListBucketsRequest<'a> {
    account_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_id: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListBucketsResponse {
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlRequest<'a> {
    bucket_id: &'a str,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadUrlResponse {
    pub upload_url: String,
    pub authorization_token: String,
}

impl std::fmt::Debug for GetUploadUrlResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetUploadUrlResponse")
            .field("upload_url", &self.upload_url)
            .finish_non_exhaustive()
    }
}

/// Headers and body of a single file upload.
#[derive(Debug)]
pub struct UploadFile<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub sha1_hex: &'a str,
    pub author: &'a str,
    pub cache_control: &'a str,
    pub data: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFileNamesRequest<'a> {
    bucket_id: &'a str,
    prefix: &'a str,
    max_file_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFileNamesResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFileVersionRequest<'a> {
    file_name: &'a str,
    file_id: &'a str,
}

type StatusError = fn(&'static str, u16, String) -> StorageError;

fn auth_error(stage: &'static str, status: u16, body: String) -> StorageError {
    StorageError::Auth {
        stage,
        status,
        body,
    }
}

fn upload_error(stage: &'static str, status: u16, body: String) -> StorageError {
    StorageError::UploadProtocol {
        stage,
        status,
        body,
    }
}

fn deletion_error(stage: &'static str, status: u16, body: String) -> StorageError {
    StorageError::DeletionProtocol {
        stage,
        status,
        body,
    }
}

/// B2 REST client
#[derive(Clone)]
pub struct B2Api {
    http_client: Client,
    /// Base URL for `b2_authorize_account` only.
    auth_base_url: String,
}

impl std::fmt::Debug for B2Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2Api")
            .field("auth_base_url", &self.auth_base_url)
            .finish()
    }
}

impl B2Api {
    pub fn new(auth_base_url: impl Into<String>, request_timeout: Duration) -> StorageResult<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(B2_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            auth_base_url: auth_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(base_url: &str, operation: &str) -> String {
        format!(
            "{}{}/{}",
            base_url.trim_end_matches('/'),
            B2_API_VERSION_PATH,
            operation
        )
    }

    pub async fn authorize_account(
        &self,
        key_id: &str,
        application_key: &str,
    ) -> StorageResult<AuthorizeAccountResponse> {
        const STAGE: &str = "b2_authorize_account";

        let response = self
            .http_client
            .get(Self::endpoint(&self.auth_base_url, STAGE))
            .basic_auth(key_id, Some(application_key))
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json(response, STAGE, auth_error).await
    }

    pub async fn list_buckets(
        &self,
        api_url: &str,
        authorization_token: &str,
        account_id: &str,
    ) -> StorageResult<ListBucketsResponse> {
        const STAGE: &str = "b2_list_buckets";

        let response = self
            .http_client
            .post(Self::endpoint(api_url, STAGE))
            .header("Authorization", authorization_token)
            .json(&ListBucketsRequest { account_id })
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json(response, STAGE, auth_error).await
    }

    pub async fn get_upload_url(
        &self,
        api_url: &str,
        authorization_token: &str,
        bucket_id: &str,
    ) -> StorageResult<GetUploadUrlResponse> {
        const STAGE: &str = "b2_get_upload_url";

        let response = self
            .http_client
            .post(Self::endpoint(api_url, STAGE))
            .header("Authorization", authorization_token)
            .json(&GetUploadUrlRequest { bucket_id })
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json(response, STAGE, upload_error).await
    }

    pub async fn upload_file(
        &self,
        target: &GetUploadUrlResponse,
        file: UploadFile<'_>,
    ) -> StorageResult<UploadFileResponse> {
        const STAGE: &str = "b2_upload_file";

        let response = self
            .http_client
            .post(&target.upload_url)
            .header("Authorization", &target.authorization_token)
            .header("X-Bz-File-Name", urlencoding::encode(file.file_name).as_ref())
            .header("Content-Type", file.content_type)
            .header("X-Bz-Content-Sha1", file.sha1_hex)
            .header("X-Bz-Info-Author", urlencoding::encode(file.author).as_ref())
            .header(
                "X-Bz-Info-Cache-Control",
                urlencoding::encode(file.cache_control).as_ref(),
            )
            .body(file.data)
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json(response, STAGE, upload_error).await
    }

    pub async fn list_file_names(
        &self,
        api_url: &str,
        authorization_token: &str,
        bucket_id: &str,
        prefix: &str,
        max_file_count: u32,
    ) -> StorageResult<ListFileNamesResponse> {
        const STAGE: &str = "b2_list_file_names";

        let response = self
            .http_client
            .post(Self::endpoint(api_url, STAGE))
            .header("Authorization", authorization_token)
            .json(&ListFileNamesRequest {
                bucket_id,
                prefix,
                max_file_count,
            })
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json(response, STAGE, deletion_error).await
    }

    pub async fn delete_file_version(
        &self,
        api_url: &str,
        authorization_token: &str,
        file_name: &str,
        file_id: &str,
    ) -> StorageResult<()> {
        const STAGE: &str = "b2_delete_file_version";

        let response = self
            .http_client
            .post(Self::endpoint(api_url, STAGE))
            .header("Authorization", authorization_token)
            .json(&DeleteFileVersionRequest { file_name, file_id })
            .send()
            .await
            .map_err(|e| transport(STAGE, e))?;

        read_json::<IgnoredAny>(response, STAGE, deletion_error).await?;
        Ok(())
    }
}

fn transport(stage: &'static str, error: reqwest::Error) -> StorageError {
    StorageError::Transport {
        stage,
        message: error.to_string(),
    }
}

/// Check the status and decode the body, keeping the upstream body on failure.
async fn read_json<T: DeserializeOwned>(
    response: Response,
    stage: &'static str,
    on_status: StatusError,
) -> StorageResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(on_status(stage, status.as_u16(), body));
    }

    response.json::<T>().await.map_err(|e| StorageError::Decode {
        stage,
        message: e.to_string(),
    })
}
