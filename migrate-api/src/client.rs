use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::api::BinaryFileUpload;
use crate::api::ManagementApi;
use crate::error::Error;
use crate::error::PlatformErrorBody;
use crate::error::RATE_EXCEEDED_CODE;
use crate::error::Result;
use crate::retry::RetryConfig;
use crate::retry::backoff;
use crate::wire::AssetCreateWire;
use crate::wire::AssetFolderWire;
use crate::wire::AssetUpsertWire;
use crate::wire::AssetWire;
use crate::wire::CollectionWire;
use crate::wire::ContentItemCreateWire;
use crate::wire::ContentItemUpsertWire;
use crate::wire::ContentItemWire;
use crate::wire::FileReferenceWire;
use crate::wire::FlattenedContentTypeWire;
use crate::wire::LanguageVariantUpsertWire;
use crate::wire::LanguageVariantWire;
use crate::wire::LanguageWire;
use crate::wire::PaginatedListWire;
use crate::wire::ScheduleWire;
use crate::wire::TaxonomyGroupWire;
use crate::wire::WorkflowWire;

/// `ManagementApi` implementation backed by `reqwest`, talking to a single
/// environment of the content platform's management API.
#[derive(Clone)]
pub struct ReqwestManagementApi {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    retry: RetryConfig,
}

impl ReqwestManagementApi {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(Error::from)
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&self.api_key);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let res = builder.send().await;
            match res {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return serde_json::from_slice(b"null").map_err(Error::from);
                    }
                    return serde_json::from_slice(&bytes).map_err(Error::from);
                }
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Err(Error::NotFound {
                            codename_or_id: path.to_string(),
                        });
                    }
                    let body_text = resp.text().await.unwrap_or_default();
                    let platform: Option<PlatformErrorBody> =
                        serde_json::from_str(&body_text).ok();
                    if let Some(err) = classify_platform_error(status, path, platform.as_ref()) {
                        return Err(err);
                    }

                    let error_code = platform.as_ref().and_then(|b| b.error_code);
                    let retryable = error_code.is_none() || error_code == Some(RATE_EXCEEDED_CODE);
                    if !retryable || attempt >= self.retry.max_attempts {
                        if retryable {
                            return Err(Error::RetryLimitReached {
                                attempts: attempt,
                                status: Some(status),
                            });
                        }
                        return Err(Error::UnexpectedStatus {
                            status,
                            body: body_text,
                            error_code,
                        });
                    }
                    warn!(attempt, %status, path, "retrying management API call");
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(err.into());
                    }
                    debug!(attempt, path, error = %err, "transport error, retrying");
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
            }
        }
    }

    async fn request_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.request::<B, serde_json::Value>(method, path, body)
            .await
            .map(|_| ())
    }

    async fn fetch_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page_path = match &continuation {
                Some(token) => format!("{path}?continuationToken={token}"),
                None => path.to_string(),
            };
            let page: PaginatedListWire<T> = self
                .request::<(), PaginatedListWire<T>>(Method::GET, &page_path, None)
                .await?;
            items.extend(page.data);
            continuation = page.pagination.continuation_token;
            if continuation.is_none() {
                break;
            }
        }
        Ok(items)
    }
}

/// Detects the bad-publish shape: a 400 on a `/publish` call is a
/// server-side validation failure the workflow driver tolerates and logs
/// rather than treating as fatal (spec §4.11).
fn classify_platform_error(
    status: StatusCode,
    path: &str,
    body: Option<&PlatformErrorBody>,
) -> Option<Error> {
    if status == StatusCode::BAD_REQUEST && path.ends_with("/publish") {
        let message = body
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| "publish validation failed".to_string());
        return Some(Error::BadPublish { message });
    }
    None
}

/// The platform exposes distinct `{entity}/{id}` and
/// `{entity}/codename/{codename}` routes; callers may pass either a
/// codename or a raw id (e.g. §4.6's reference-closure fetch, which only
/// has ids), so every id-or-codename lookup picks the route by parsing.
fn entity_path(entity: &str, codename_or_id: &str) -> String {
    match Uuid::parse_str(codename_or_id) {
        Ok(id) => format!("{entity}/{id}"),
        Err(_) => format!("{entity}/codename/{codename_or_id}"),
    }
}

#[async_trait]
impl ManagementApi for ReqwestManagementApi {
    async fn view_content_item(&self, codename_or_id: &str) -> Result<ContentItemWire> {
        self.request(Method::GET, &entity_path("items", codename_or_id), None::<&()>)
            .await
    }

    async fn add_content_item(&self, data: ContentItemCreateWire) -> Result<ContentItemWire> {
        self.request(Method::POST, "items", Some(&data)).await
    }

    async fn upsert_content_item(
        &self,
        codename: &str,
        data: ContentItemUpsertWire,
    ) -> Result<ContentItemWire> {
        self.request(
            Method::PUT,
            &format!("items/codename/{codename}"),
            Some(&data),
        )
        .await
    }

    async fn view_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        published: bool,
    ) -> Result<LanguageVariantWire> {
        let suffix = if published { "/published" } else { "" };
        self.request(
            Method::GET,
            &format!("items/codename/{item_codename}/variants/codename/{language_codename}{suffix}"),
            None::<&()>,
        )
        .await
    }

    async fn upsert_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        data: LanguageVariantUpsertWire,
    ) -> Result<LanguageVariantWire> {
        self.request(
            Method::PUT,
            &format!("items/codename/{item_codename}/variants/codename/{language_codename}"),
            Some(&data),
        )
        .await
    }

    async fn create_new_version(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<LanguageVariantWire> {
        self.request(
            Method::PUT,
            &format!(
                "items/codename/{item_codename}/variants/codename/{language_codename}/new-version"
            ),
            None::<&()>,
        )
        .await
    }

    async fn change_workflow_of_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        workflow_codename: &str,
        step_codename: &str,
    ) -> Result<()> {
        self.request_unit::<()>(
            Method::PUT,
            &format!(
                "items/codename/{item_codename}/variants/codename/{language_codename}/workflow/{workflow_codename}/{step_codename}"
            ),
            None,
        )
        .await
    }

    async fn publish_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        schedule: Option<ScheduleWire>,
    ) -> Result<()> {
        self.request_unit(
            Method::PUT,
            &format!(
                "items/codename/{item_codename}/variants/codename/{language_codename}/publish"
            ),
            schedule.as_ref(),
        )
        .await
    }

    async fn unpublish_language_variant(
        &self,
        item_codename: &str,
        language_codename: &str,
        schedule: Option<ScheduleWire>,
    ) -> Result<()> {
        self.request_unit(
            Method::PUT,
            &format!(
                "items/codename/{item_codename}/variants/codename/{language_codename}/unpublish"
            ),
            schedule.as_ref(),
        )
        .await
    }

    async fn cancel_scheduled_publish(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<()> {
        match self
            .request_unit::<()>(
                Method::PUT,
                &format!(
                    "items/codename/{item_codename}/variants/codename/{language_codename}/publish/cancel-scheduled"
                ),
                None,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn cancel_scheduled_unpublish(
        &self,
        item_codename: &str,
        language_codename: &str,
    ) -> Result<()> {
        match self
            .request_unit::<()>(
                Method::PUT,
                &format!(
                    "items/codename/{item_codename}/variants/codename/{language_codename}/unpublish/cancel-scheduled"
                ),
                None,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn view_asset(&self, codename_or_id: &str) -> Result<AssetWire> {
        self.request(Method::GET, &entity_path("assets", codename_or_id), None::<&()>)
            .await
    }

    async fn add_asset(&self, data: AssetCreateWire) -> Result<AssetWire> {
        self.request(Method::POST, "assets", Some(&data)).await
    }

    async fn upsert_asset(&self, codename: &str, data: AssetUpsertWire) -> Result<AssetWire> {
        self.request(
            Method::PUT,
            &format!("assets/codename/{codename}"),
            Some(&data),
        )
        .await
    }

    async fn upload_binary_file(&self, upload: BinaryFileUpload) -> Result<FileReferenceWire> {
        let url = self.url("files")?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let part = reqwest::multipart::Part::bytes(upload.binary_data.clone())
                .file_name(upload.filename.clone())
                .mime_str(&upload.content_type)?;
            let form = reqwest::multipart::Form::new().part("file", part);
            let res = self
                .http
                .post(url.clone())
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await;
            match res {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.json::<FileReferenceWire>().await?);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if !retryable || attempt >= self.retry.max_attempts {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(Error::UnexpectedStatus { status, body, error_code: None });
                    }
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(err.into());
                    }
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
            }
        }
    }

    async fn download_binary(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let res = self.http.get(url).send().await;
            match res {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.bytes().await?.to_vec());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if !retryable || attempt >= self.retry.max_attempts {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(Error::UnexpectedStatus { status, body, error_code: None });
                    }
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(err.into());
                    }
                    sleep(backoff(attempt, self.retry.base_delay)).await;
                }
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<CollectionWire>> {
        self.fetch_all_pages("collections").await
    }

    async fn list_languages(&self) -> Result<Vec<LanguageWire>> {
        self.fetch_all_pages("languages").await
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowWire>> {
        self.request(Method::GET, "workflows", None::<&()>).await
    }

    async fn list_taxonomies(&self) -> Result<Vec<TaxonomyGroupWire>> {
        self.fetch_all_pages("taxonomies").await
    }

    async fn list_content_types(&self) -> Result<Vec<FlattenedContentTypeWire>> {
        self.fetch_all_pages("types?depth=flatten").await
    }

    async fn list_asset_folders(&self) -> Result<Vec<AssetFolderWire>> {
        self.request(Method::GET, "assets/folders", None::<&()>)
            .await
    }
}

/// Timeout guard used when constructing the shared `reqwest::Client`
/// (mirrors the teacher's `default_client::create_client` convention of
/// centralizing client construction rather than letting callers build ad
/// hoc clients).
pub fn default_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
}
