//! HTTP access to the MyBot management API.
//!
//! One method per backend operation, each issuing exactly one request. All of
//! them funnel through a single send path that attaches credentials, maps
//! transport failures and classifies error responses.

use std::path::Path;
use std::time::Duration;

use mybot_api_models::{
    CountdownCreateRequest, DailyStatsResponse, ErrorBody, FolderImagesResponse,
    FoodCatalogResponse, FoodList, FoodListResponse, HealthResponse, HourlyStatsResponse,
    ImageFolder, MessageResponse, OwnerMap, ReminderCreateRequest, SystemStatus,
    TodoCreateRequest, UploadResponse, UsageOverview, WeekdayStatsResponse,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::{AdminError, AdminResult};
use crate::model::{CountdownKey, FoodKey, ImageKey, ReminderKey, TodoKey};

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Largest image the backend accepts.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
/// Content types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// HTTP Basic credentials for the management API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Admin user name.
    pub username: String,
    /// Admin password, if any.
    pub password: Option<String>,
}

/// Everything needed to build a [`ResourceGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API origin; endpoints are appended below its path.
    pub base_url: Url,
    /// Credentials sent with every `/api` request.
    pub credentials: Option<BasicCredentials>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Value of the `x-request-id` header.
    pub trace_id: String,
}

impl GatewayConfig {
    /// Defaults for the given origin: no credentials, 10 s timeout, fresh trace id.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Attach credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Client for every resource kind the backend owns.
#[derive(Debug, Clone)]
pub struct ResourceGateway {
    client: Client,
    base_url: Url,
    credentials: Option<BasicCredentials>,
}

impl ResourceGateway {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// Fails when the base URL cannot carry path segments, the trace id is
    /// not a valid header value, or the TLS backend cannot initialise.
    pub fn new(config: GatewayConfig) -> AdminResult<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(AdminError::BaseUrl(format!(
                "'{}' cannot carry a path",
                config.base_url
            )));
        }

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(&config.trace_id).map_err(|_| {
            AdminError::validation("trace identifier contains invalid characters")
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|source| AdminError::Transport {
                endpoint: "client setup".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url,
            credentials: config.credentials,
        })
    }

    /// Origin the gateway talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> AdminResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AdminError::BaseUrl(format!("'{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> AdminResult<(RequestBuilder, String)> {
        let url = self.endpoint(segments)?;
        let label = format!("{method} {}", url.path());
        let builder = self.client.request(method, url);
        let builder = match &self.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, credentials.password.as_ref())
            }
            None => builder,
        };
        Ok((builder, label))
    }

    async fn execute(&self, builder: RequestBuilder, endpoint: String) -> AdminResult<Response> {
        debug!(%endpoint, "sending request");
        let response = builder
            .send()
            .await
            .map_err(|source| AdminError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        let status = response.status();
        debug!(%endpoint, status = status.as_u16(), "response received");
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_problem(response).await)
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        what: &'static str,
    ) -> AdminResult<T> {
        let (builder, endpoint) = self.request(Method::GET, segments)?;
        let response = self.execute(builder, endpoint).await?;
        decode(response, what).await
    }

    async fn acknowledge(
        &self,
        builder: RequestBuilder,
        endpoint: String,
    ) -> AdminResult<MessageResponse> {
        let response = self.execute(builder, endpoint).await?;
        decode(response, "acknowledgement").await
    }

    async fn remove(&self, segments: &[&str]) -> AdminResult<MessageResponse> {
        let (builder, endpoint) = self.request(Method::DELETE, segments)?;
        self.acknowledge(builder, endpoint).await
    }

    /// All reminders keyed by owner.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_reminders(&self) -> AdminResult<OwnerMap> {
        self.fetch(&["api", "reminders"], "reminder listing").await
    }

    /// One owner's reminders, still un-normalized.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn list_reminders_for(&self, owner: &str) -> AdminResult<Value> {
        let owner = segment(owner, "owner id")?;
        self.fetch(&["api", "reminders", owner], "reminder listing")
            .await
    }

    /// Create a reminder for `owner`.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn create_reminder(
        &self,
        owner: &str,
        request: &ReminderCreateRequest,
    ) -> AdminResult<MessageResponse> {
        let owner = segment(owner, "owner id")?;
        let (builder, endpoint) = self.request(Method::POST, &["api", "reminders", owner])?;
        self.acknowledge(builder.json(request), endpoint).await
    }

    /// Delete the reminder addressed by `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn delete_reminder(&self, key: &ReminderKey) -> AdminResult<MessageResponse> {
        self.remove(&["api", "reminders", key.owner.as_str(), key.job_id.as_str()])
            .await
    }

    /// All todos keyed by owner.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_todos(&self) -> AdminResult<OwnerMap> {
        self.fetch(&["api", "todos"], "todo listing").await
    }

    /// One owner's work/play buckets, still un-normalized.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn list_todos_for(&self, owner: &str) -> AdminResult<Value> {
        let owner = segment(owner, "owner id")?;
        self.fetch(&["api", "todos", owner], "todo listing").await
    }

    /// Append a todo to one of `owner`'s buckets.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn create_todo(
        &self,
        owner: &str,
        request: &TodoCreateRequest,
    ) -> AdminResult<MessageResponse> {
        let owner = segment(owner, "owner id")?;
        let (builder, endpoint) = self.request(Method::POST, &["api", "todos", owner])?;
        self.acknowledge(builder.json(request), endpoint).await
    }

    /// Set the done flag of the todo at `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn update_todo(&self, key: &TodoKey, done: bool) -> AdminResult<MessageResponse> {
        let index = key.index.to_string();
        let (builder, endpoint) = self.request(
            Method::PUT,
            &["api", "todos", key.owner.as_str(), key.category.as_str(), index.as_str()],
        )?;
        let builder = builder.query(&[("done", done)]);
        self.acknowledge(builder, endpoint).await
    }

    /// Delete the todo at `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn delete_todo(&self, key: &TodoKey) -> AdminResult<MessageResponse> {
        let index = key.index.to_string();
        self.remove(&["api", "todos", key.owner.as_str(), key.category.as_str(), index.as_str()])
            .await
    }

    /// All countdowns keyed by owner.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_countdowns(&self) -> AdminResult<OwnerMap> {
        self.fetch(&["api", "countdowns"], "countdown listing")
            .await
    }

    /// One owner's countdowns keyed by event name, still un-normalized.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn list_countdowns_for(&self, owner: &str) -> AdminResult<Value> {
        let owner = segment(owner, "owner id")?;
        self.fetch(&["api", "countdowns", owner], "countdown listing")
            .await
    }

    /// Create or replace `owner`'s countdown named in `request`.
    ///
    /// # Errors
    ///
    /// Validation of `owner`, then transport, status and decode failures.
    pub async fn create_countdown(
        &self,
        owner: &str,
        request: &CountdownCreateRequest,
    ) -> AdminResult<MessageResponse> {
        let owner = segment(owner, "owner id")?;
        let (builder, endpoint) = self.request(Method::POST, &["api", "countdowns", owner])?;
        self.acknowledge(builder.json(request), endpoint).await
    }

    /// Delete the countdown addressed by `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn delete_countdown(&self, key: &CountdownKey) -> AdminResult<MessageResponse> {
        self.remove(&["api", "countdowns", key.owner.as_str(), key.event_name.as_str()])
            .await
    }

    /// Both food lists.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_food(&self) -> AdminResult<FoodCatalogResponse> {
        self.fetch(&["api", "eat"], "food catalog").await
    }

    /// One food list.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_food_for(&self, list: FoodList) -> AdminResult<FoodListResponse> {
        self.fetch(&["api", "eat", list.as_str()], "food list").await
    }

    /// Add `food` to `list`.
    ///
    /// # Errors
    ///
    /// [`AdminError::DuplicateEntry`] when the food is already listed; otherwise
    /// validation, transport, status and decode failures.
    pub async fn add_food(&self, list: FoodList, food: &str) -> AdminResult<MessageResponse> {
        let food = segment(food, "food")?;
        let (builder, endpoint) = self.request(Method::POST, &["api", "eat", list.as_str()])?;
        let builder = builder.query(&[("food", food)]);
        match self.acknowledge(builder, endpoint).await {
            Err(AdminError::Status { status, message })
                if matches!(status, StatusCode::CONFLICT | StatusCode::BAD_REQUEST) =>
            {
                Err(AdminError::DuplicateEntry {
                    message: if message.is_empty() {
                        food.to_string()
                    } else {
                        message
                    },
                })
            }
            other => other,
        }
    }

    /// Remove the food addressed by `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn delete_food(&self, key: &FoodKey) -> AdminResult<MessageResponse> {
        self.remove(&["api", "eat", key.list.as_str(), key.food.as_str()])
            .await
    }

    /// Every folder's files keyed by folder name. A folder the server failed
    /// to read maps to `{"error": ...}`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_images(&self) -> AdminResult<OwnerMap> {
        self.fetch(&["api", "images"], "image catalog").await
    }

    /// Files in one folder.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list_images_in(&self, folder: ImageFolder) -> AdminResult<FolderImagesResponse> {
        self.fetch(&["api", "images", folder.as_str()], "image listing")
            .await
    }

    /// Upload a pre-checked image into `folder` as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn upload_image(
        &self,
        folder: ImageFolder,
        upload: &ImageUpload,
    ) -> AdminResult<UploadResponse> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|_| {
                AdminError::validation(format!(
                    "invalid content type '{}'",
                    upload.content_type
                ))
            })?;
        let form = Form::new().part("file", part);
        let (builder, endpoint) =
            self.request(Method::POST, &["api", "images", folder.as_str(), "upload"])?;
        let response = self.execute(builder.multipart(form), endpoint).await?;
        decode(response, "upload receipt").await
    }

    /// Raw bytes of the image addressed by `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn download_image(&self, key: &ImageKey) -> AdminResult<Vec<u8>> {
        let (builder, endpoint) = self.request(
            Method::GET,
            &["api", "images", key.folder.as_str(), key.filename.as_str()],
        )?;
        let response = self.execute(builder, endpoint).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| AdminError::Decode {
                what: "image body",
                source,
            })?;
        Ok(bytes.to_vec())
    }

    /// Delete the image addressed by `key`.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn delete_image(&self, key: &ImageKey) -> AdminResult<MessageResponse> {
        self.remove(&["api", "images", key.folder.as_str(), key.filename.as_str()])
            .await
    }

    /// Message totals.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn usage_overview(&self) -> AdminResult<UsageOverview> {
        self.fetch(&["api", "usage", "overview"], "usage overview")
            .await
    }

    /// Messages per hour of day.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn usage_hourly(&self) -> AdminResult<HourlyStatsResponse> {
        self.fetch(&["api", "usage", "hourly"], "hourly usage")
            .await
    }

    /// Messages per weekday.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn usage_weekday(&self) -> AdminResult<WeekdayStatsResponse> {
        self.fetch(&["api", "usage", "weekday"], "weekday usage")
            .await
    }

    /// Messages per calendar day.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn usage_daily(&self) -> AdminResult<DailyStatsResponse> {
        self.fetch(&["api", "usage", "daily"], "daily usage").await
    }

    /// Host CPU, memory and disk sample.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn system_status(&self) -> AdminResult<SystemStatus> {
        self.fetch(&["api", "status"], "host status").await
    }

    /// Liveness probe.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn health(&self) -> AdminResult<HealthResponse> {
        self.fetch(&["health"], "health probe").await
    }
}

/// A file that passed the upload pre-checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size of in-memory content.
    ///
    /// # Errors
    ///
    /// [`AdminError::Validation`] for an empty name, a type outside
    /// [`ALLOWED_IMAGE_TYPES`] or content over [`MAX_UPLOAD_BYTES`].
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> AdminResult<Self> {
        let file_name = file_name.into();
        let content_type = check_image_name(&file_name)?;
        check_image_size(&file_name, u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Read and check a file from disk. Type and size are checked before the
    /// content is read.
    ///
    /// # Errors
    ///
    /// Same as [`ImageUpload::new`], plus [`AdminError::LocalFile`] when the
    /// file cannot be read.
    pub async fn from_path(path: &Path) -> AdminResult<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AdminError::validation(format!("'{}' has no usable file name", path.display()))
            })?;
        let content_type = check_image_name(&file_name)?;

        let local_error = |source: std::io::Error| AdminError::LocalFile {
            path: path.display().to_string(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(local_error)?;
        check_image_size(&file_name, metadata.len())?;
        let bytes = tokio::fs::read(path).await.map_err(local_error)?;
        check_image_size(&file_name, u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// File name sent in the multipart part.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Content type derived from the file extension.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn check_image_name(file_name: &str) -> AdminResult<String> {
    if file_name.trim().is_empty() {
        return Err(AdminError::validation("file name must not be empty"));
    }
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    let content_type = mime.essence_str();
    if ALLOWED_IMAGE_TYPES.contains(&content_type) {
        Ok(content_type.to_string())
    } else {
        Err(AdminError::validation(format!(
            "unsupported image type {content_type} for '{file_name}' (allowed: {})",
            ALLOWED_IMAGE_TYPES.join(", ")
        )))
    }
}

fn check_image_size(file_name: &str, size: u64) -> AdminResult<()> {
    if size > MAX_UPLOAD_BYTES {
        Err(AdminError::validation(format!(
            "'{file_name}' is {size} bytes; the limit is {MAX_UPLOAD_BYTES} bytes"
        )))
    } else {
        Ok(())
    }
}

fn segment<'a>(value: &'a str, field: &str) -> AdminResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AdminError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &'static str) -> AdminResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| AdminError::Decode { what, source })
}

/// Turn a non-success response into [`AdminError::Status`], preferring the
/// backend's `detail` text.
pub(crate) async fn classify_problem(response: Response) -> AdminError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();

    let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => body.message().unwrap_or_default(),
        Err(_) => body_text,
    };

    AdminError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use mybot_api_models::TodoCategory;
    use serde_json::json;

    fn gateway(server: &MockServer) -> Result<ResourceGateway> {
        let base_url: Url = server.base_url().parse()?;
        let config = GatewayConfig::new(base_url).with_credentials(BasicCredentials {
            username: "admin".into(),
            password: Some("secret".into()),
        });
        Ok(ResourceGateway::new(config)?)
    }

    #[test]
    fn endpoint_segments_are_percent_encoded() -> Result<()> {
        let gateway = ResourceGateway::new(GatewayConfig::new("http://bot.local/admin/".parse()?))?;
        let url = gateway.endpoint(&["api", "eat", "android", "fried rice/egg"])?;
        assert_eq!(
            url.as_str(),
            "http://bot.local/admin/api/eat/android/fried%20rice%2Fegg"
        );
        Ok(())
    }

    #[tokio::test]
    async fn list_reminders_sends_basic_auth_and_trace_id() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/reminders")
                .header("authorization", "Basic YWRtaW46c2VjcmV0")
                .header_exists(HEADER_REQUEST_ID);
            then.status(200)
                .json_body(json!({"42": [{"job_id": "j1", "event": "stretch"}]}));
        });

        let listing = gateway(&server)?.list_reminders().await?;
        mock.assert();
        assert!(listing.contains_key("42"));
        Ok(())
    }

    #[tokio::test]
    async fn error_detail_becomes_status_message() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/reminders/42/j9");
            then.status(404).json_body(json!({"detail": "reminder not found"}));
        });

        let key = ReminderKey {
            owner: "42".into(),
            job_id: "j9".into(),
        };
        let err = gateway(&server)?
            .delete_reminder(&key)
            .await
            .expect_err("missing reminder should fail");
        mock.assert();
        match err {
            AdminError::Status { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "reminder not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn update_todo_passes_done_as_query() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/todos/7/play/2")
                .query_param("done", "true");
            then.status(200).json_body(json!({"message": "updated"}));
        });

        let key = TodoKey {
            owner: "7".into(),
            category: TodoCategory::Play,
            index: 2,
        };
        let ack = gateway(&server)?.update_todo(&key, true).await?;
        mock.assert();
        assert_eq!(ack.message, "updated");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_food_is_reclassified() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/eat/apple")
                .query_param("food", "noodles");
            then.status(400).json_body(json!({"detail": "food already listed"}));
        });

        let err = gateway(&server)?
            .add_food(FoodList::Apple, "noodles")
            .await
            .expect_err("duplicate should fail");
        mock.assert();
        assert!(matches!(err, AdminError::DuplicateEntry { .. }));
        assert_eq!(err.notice_text(), "already exists: food already listed");
        Ok(())
    }

    #[tokio::test]
    async fn conflicting_food_is_reclassified() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/eat/android")
                .query_param("food", "rice");
            then.status(409).json_body(json!({"detail": "rice is already on the list"}));
        });

        let err = gateway(&server)?
            .add_food(FoodList::Android, "rice")
            .await
            .expect_err("conflict should fail");
        mock.assert();
        assert!(matches!(err, AdminError::DuplicateEntry { .. }));
        assert_eq!(err.notice_text(), "already exists: rice is already on the list");
        Ok(())
    }

    #[tokio::test]
    async fn other_food_add_failures_keep_their_status() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/eat/apple");
            then.status(404).json_body(json!({"detail": "list not found"}));
        });

        let err = gateway(&server)?
            .add_food(FoodList::Apple, "rice")
            .await
            .expect_err("missing list should fail");
        match err {
            AdminError::Status { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "list not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() -> Result<()> {
        let gateway = ResourceGateway::new(GatewayConfig::new("http://127.0.0.1:1".parse()?))?;
        let err = gateway
            .health()
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(err, AdminError::Transport { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_success_body_is_a_decode_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/status");
            then.status(200).body("not json");
        });

        let err = gateway(&server)?
            .system_status()
            .await
            .expect_err("body is not JSON");
        assert!(matches!(err, AdminError::Decode { .. }));
        Ok(())
    }

    #[test]
    fn upload_prechecks_reject_bad_type_and_size() -> Result<()> {
        let wrong_type = ImageUpload::new("notes.txt", b"hello".to_vec());
        assert!(matches!(wrong_type, Err(AdminError::Validation(_))));

        let oversized = usize::try_from(MAX_UPLOAD_BYTES)? + 1;
        let too_big = ImageUpload::new("huge.png", vec![0; oversized]);
        assert!(matches!(too_big, Err(AdminError::Validation(_))));

        let at_limit = ImageUpload::new("edge.webp", vec![0; oversized - 1])?;
        assert_eq!(at_limit.content_type(), "image/webp");
        Ok(())
    }

    #[tokio::test]
    async fn upload_sends_multipart_and_decodes_receipt() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/images/food_images/upload")
                .header_exists("content-type");
            then.status(201).json_body(json!({
                "message": "uploaded",
                "file": {
                    "name": "cake_1.jpg",
                    "size": 4,
                    "modified": "2025-03-01T10:00:00",
                    "url": "/api/images/food_images/cake_1.jpg"
                }
            }));
        });

        let upload = ImageUpload::new("cake.jpg", vec![1, 2, 3, 4])?;
        assert_eq!(upload.content_type(), "image/jpeg");
        let receipt = gateway(&server)?
            .upload_image(ImageFolder::FoodImages, &upload)
            .await?;
        mock.assert();
        assert_eq!(receipt.file.name, "cake_1.jpg");
        Ok(())
    }

    #[tokio::test]
    async fn telemetry_endpoints_decode() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/usage/overview");
            then.status(200).json_body(json!({
                "total_calls": 120,
                "recent_7days": 31,
                "total_records": 120
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(json!({"status": "healthy", "timestamp": "2025-03-01T10:00:00"}));
        });

        let gateway = gateway(&server)?;
        assert_eq!(gateway.usage_overview().await?.recent_7days, 31);
        assert_eq!(gateway.health().await?.status, "healthy");
        Ok(())
    }
}
