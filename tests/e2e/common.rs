//! Common E2E Test Infrastructure
//!
//! Provides shared utilities for E2E tests:
//! - Test server management (bound on port 0)
//! - Fake probe and recording object store
//! - JWT token generation
//! - Multipart upload helpers

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tubely_ingest::auth::jwt::JwtAuthenticator;
use tubely_ingest::db::{InMemoryRecordStore, VideoRecord};
use tubely_ingest::probe::{AspectRatioProbe, ProbeError};
use tubely_ingest::s3::{ObjectStore, ObjectStoreError};
use tubely_ingest::server::{AppState, Server, UploadLimits};
use tubely_ingest::storage::local::url_prefix;
use tubely_ingest::storage::{InlineAssetEncoder, LocalAssetStore, ThumbnailStrategy};
use tubely_ingest::upload::{PipelineSettings, UploadPipeline};
use uuid::Uuid;

/// JWT secret for test tokens
pub const JWT_SECRET: &str = "e2e-test-secret-key-for-jwt-tokens";

/// Bucket and region baked into video URLs
pub const TEST_BUCKET: &str = "tubely-videos";
pub const TEST_REGION: &str = "us-east-2";

/// Host and port advertised in local asset URLs
pub const PUBLIC_BASE_URL: &str = "http://localhost:8091";

/// What the fake probe reports
#[derive(Debug, Clone, Copy)]
pub enum ProbeBehavior {
    Ratio(&'static str),
    Fail,
}

/// Probe that returns a fixed answer and remembers the paths it saw
pub struct FakeProbe {
    behavior: ProbeBehavior,
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeProbe {
    pub fn new(behavior: ProbeBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AspectRatioProbe for FakeProbe {
    async fn aspect_ratio(&self, path: &Path) -> Result<String, ProbeError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        match self.behavior {
            ProbeBehavior::Ratio(ratio) => Ok(ratio.to_string()),
            ProbeBehavior::Fail => Err(ProbeError::Exited {
                status: "exit status: 1".into(),
                stderr: "Invalid data found when processing input".into(),
            }),
        }
    }
}

/// One recorded put
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Object store that keeps every put in memory
#[derive(Default)]
pub struct RecordingObjectStore {
    puts: Mutex<Vec<StoredObject>>,
}

impl RecordingObjectStore {
    pub fn puts(&self) -> Vec<StoredObject> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: tokio::fs::File,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let mut data = Vec::new();
        body.read_to_end(&mut data)
            .await
            .map_err(|e| ObjectStoreError::PutFailed(e.to_string()))?;

        self.puts.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: data,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

/// Test environment options
pub struct EnvOptions {
    pub inline_thumbnails: bool,
    pub probe: ProbeBehavior,
    pub object_store: Option<Arc<dyn ObjectStore>>,
    pub limits: UploadLimits,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            inline_thumbnails: false,
            probe: ProbeBehavior::Ratio("16:9"),
            object_store: None,
            limits: UploadLimits {
                max_video_bytes: 1 << 30,
                max_thumbnail_bytes: 10 << 20,
            },
        }
    }
}

/// E2E Test Environment
///
/// Runs the real server on an ephemeral port with in-memory collaborators.
pub struct E2ETestEnv {
    pub base_url: String,
    pub client: reqwest::Client,
    pub records: InMemoryRecordStore,
    pub objects: Arc<RecordingObjectStore>,
    pub probe: Arc<FakeProbe>,
    pub assets_root: PathBuf,
    pub temp_dir: PathBuf,
    _dirs: tempfile::TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl E2ETestEnv {
    /// Disk thumbnails, probe reports 16:9
    pub async fn new() -> Self {
        Self::with_options(EnvOptions::default()).await
    }

    pub async fn with_options(options: EnvOptions) -> Self {
        let dirs = tempfile::tempdir().expect("Failed to create temp dir");
        let assets_root = dirs.path().join("assets");
        let temp_dir = dirs.path().join("tmp");
        std::fs::create_dir_all(&temp_dir).expect("Failed to create scratch dir");

        let thumbnails = if options.inline_thumbnails {
            ThumbnailStrategy::Inline(InlineAssetEncoder)
        } else {
            let store = LocalAssetStore::new(&assets_root, PUBLIC_BASE_URL);
            store.ensure_root().await.expect("Failed to create assets root");
            ThumbnailStrategy::Disk(store)
        };

        let records = InMemoryRecordStore::new();
        let objects = Arc::new(RecordingObjectStore::default());
        let probe = Arc::new(FakeProbe::new(options.probe));
        let object_store: Arc<dyn ObjectStore> = match options.object_store {
            Some(store) => store,
            None => objects.clone(),
        };

        let pipeline = UploadPipeline::new(
            Arc::new(records.clone()),
            object_store,
            probe.clone(),
            thumbnails,
            PipelineSettings {
                bucket: TEST_BUCKET.into(),
                region: TEST_REGION.into(),
                temp_dir: temp_dir.clone(),
            },
        );
        let state = AppState::new(
            pipeline,
            Arc::new(JwtAuthenticator::new_hs256(JWT_SECRET)),
            assets_root.clone(),
            options.limits,
        );

        let server = Server::bind("127.0.0.1:0", Arc::new(state))
            .await
            .expect("Failed to bind server");
        let base_url = format!("http://{}", server.local_addr());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = server
                .run_until(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build client");

        Self {
            base_url,
            client,
            records,
            objects,
            probe,
            assets_root,
            temp_dir,
            _dirs: dirs,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Insert a video owned by `owner`
    pub fn seed_video(&self, owner: Uuid) -> VideoRecord {
        let record = VideoRecord::new(owner, "Boot demo", "Walking in new boots");
        self.records.insert(record.clone());
        record
    }

    /// URL segment local assets are served under
    pub fn assets_prefix(&self) -> String {
        url_prefix(&self.assets_root)
    }

    /// Files currently in the scratch directory
    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.temp_dir)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    /// POST a single-file multipart form
    pub async fn upload(
        &self,
        path: &str,
        field: &str,
        content_type: &str,
        data: Vec<u8>,
        token: Option<&str>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name("upload.bin")
            .mime_str(content_type)
            .expect("Invalid content type");
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request.send().await.expect("Request failed")
    }

    /// Upload a thumbnail for `video_id`
    pub async fn upload_thumbnail(
        &self,
        video_id: Uuid,
        content_type: &str,
        data: Vec<u8>,
        token: Option<&str>,
    ) -> reqwest::Response {
        self.upload(
            &format!("/videos/{}/thumbnail", video_id),
            "thumbnail",
            content_type,
            data,
            token,
        )
        .await
    }

    /// Upload a video for `video_id`
    pub async fn upload_video(
        &self,
        video_id: Uuid,
        content_type: &str,
        data: Vec<u8>,
        token: Option<&str>,
    ) -> reqwest::Response {
        self.upload(
            &format!("/videos/{}/video", video_id),
            "video",
            content_type,
            data,
            token,
        )
        .await
    }

    /// Generate a random test payload
    pub fn random_payload(size: usize) -> Vec<u8> {
        use rand::Rng;
        let mut rng = rand::rng();
        (0..size).map(|_| rng.random()).collect()
    }

    /// Generate a valid JWT token for testing
    pub fn generate_test_jwt(user_id: Uuid, expires_in_secs: i64) -> String {
        Self::sign(user_id, expires_in_secs, JWT_SECRET)
    }

    /// Generate an expired JWT token for testing
    pub fn generate_expired_jwt(user_id: Uuid) -> String {
        Self::sign(user_id, -3600, JWT_SECRET)
    }

    /// Generate a token signed with the wrong secret
    pub fn generate_foreign_jwt(user_id: Uuid) -> String {
        Self::sign(user_id, 3600, "some-other-secret")
    }

    fn sign(user_id: Uuid, expires_in_secs: i64, secret: &str) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use tubely_ingest::auth::jwt::Claims;

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + expires_in_secs) as usize,
            iat: Some(now as usize),
            iss: Some("tubely-access".into()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to generate JWT")
    }
}

impl Drop for E2ETestEnv {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Minimal JPEG-looking payload (SOI marker + random bytes + EOI)
pub fn jpeg_bytes() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend(E2ETestEnv::random_payload(2048));
    data.extend([0xFF, 0xD9]);
    data
}

/// Payload standing in for an MP4 file; the probe is faked
pub fn mp4_bytes() -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x18ftypmp42".to_vec();
    data.extend(E2ETestEnv::random_payload(64 * 1024));
    data
}
