//! Upload pipeline
//!
//! Ownership check, classification, placement, and the final record update.
//! Thumbnails go to the configured [`ThumbnailStrategy`]; videos are spooled
//! to a temp file, probed for aspect ratio, and put to object storage under a
//! folder named after the classification.

use super::temp_file::TempUpload;
use super::{UploadError, UploadKind, UploadedAsset};
use crate::db::{RecordStore, RecordStoreError, VideoRecord};
use crate::media::{classify, THUMBNAIL_MEDIA_TYPES, VIDEO_MEDIA_TYPES};
use crate::metrics;
use crate::probe::{classify_aspect_ratio, AspectRatioProbe};
use crate::s3::{object_url, ObjectStore};
use crate::storage::{BodyStream, StorageKey, ThumbnailStrategy};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const TEMP_PREFIX: &str = "tubely-upload";

/// A record whose owner matched the authenticated user.
///
/// Only [`UploadPipeline::authorize`] creates one, so the store operations
/// cannot run for an unchecked record.
#[derive(Debug, Clone)]
pub struct OwnedRecord(VideoRecord);

impl OwnedRecord {
    pub fn record(&self) -> &VideoRecord {
        &self.0
    }

    pub fn into_inner(self) -> VideoRecord {
        self.0
    }
}

/// Object storage placement for videos
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub bucket: String,
    pub region: String,
    pub temp_dir: PathBuf,
}

/// Upload-and-placement pipeline
pub struct UploadPipeline {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    probe: Arc<dyn AspectRatioProbe>,
    thumbnails: ThumbnailStrategy,
    settings: PipelineSettings,
}

impl UploadPipeline {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        probe: Arc<dyn AspectRatioProbe>,
        thumbnails: ThumbnailStrategy,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            records,
            objects,
            probe,
            thumbnails,
            settings,
        }
    }

    pub fn thumbnail_strategy(&self) -> &ThumbnailStrategy {
        &self.thumbnails
    }

    /// Fetch the record and confirm `user_id` owns it
    #[tracing::instrument(name = "upload.authorize", skip(self), err)]
    pub async fn authorize(
        &self,
        video_id: Uuid,
        user_id: Uuid,
    ) -> Result<OwnedRecord, UploadError> {
        let record = self.records.get_video(video_id).await.map_err(|e| match e {
            RecordStoreError::NotFound(id) => UploadError::RecordNotFound(id),
            other => UploadError::LookupFailed(other),
        })?;

        if record.user_id != user_id {
            return Err(UploadError::Forbidden { user_id, video_id });
        }

        Ok(OwnedRecord(record))
    }

    /// Store a thumbnail and record its URL
    #[tracing::instrument(
        name = "upload.thumbnail",
        skip(self, owned, asset),
        fields(
            video.id = %owned.record().id,
            http.content_type = %asset.content_type,
            upload.strategy = self.thumbnails.name(),
            upload.bytes = tracing::field::Empty
        ),
        err
    )]
    pub async fn upload_thumbnail(
        &self,
        owned: OwnedRecord,
        asset: UploadedAsset<'_>,
    ) -> Result<VideoRecord, UploadError> {
        let start = Instant::now();
        let counter = Arc::new(AtomicU64::new(0));

        let result = async {
            let media = classify(&asset.content_type, THUMBNAIL_MEDIA_TYPES)?;
            let body = counted(asset.body, Arc::clone(&counter));
            let url = self.thumbnails.store(body, &media).await?;

            let mut record = owned.into_inner();
            record.thumbnail_url = Some(url);
            self.commit(record).await
        }
        .await;

        let bytes = counter.load(Ordering::Relaxed);
        tracing::Span::current().record("upload.bytes", bytes);
        self.finish(UploadKind::Thumbnail, self.thumbnails.name(), start, bytes, &result);
        result
    }

    /// Probe, classify and put a video, then record its URL
    #[tracing::instrument(
        name = "upload.video",
        skip(self, owned, asset),
        fields(
            video.id = %owned.record().id,
            http.content_type = %asset.content_type,
            s3.bucket = %self.settings.bucket,
            s3.key = tracing::field::Empty,
            upload.bytes = tracing::field::Empty
        ),
        err
    )]
    pub async fn upload_video(
        &self,
        owned: OwnedRecord,
        asset: UploadedAsset<'_>,
    ) -> Result<VideoRecord, UploadError> {
        let start = Instant::now();
        let mut bytes = 0;

        let result = async {
            let media = classify(&asset.content_type, VIDEO_MEDIA_TYPES)?;

            let mut temp = TempUpload::create(&self.settings.temp_dir, TEMP_PREFIX).await?;
            bytes = temp.write_stream(asset.body).await?;
            tracing::Span::current().record("upload.bytes", bytes);

            let ratio = self.probe.aspect_ratio(temp.path()).await?;
            let classification = classify_aspect_ratio(&ratio);
            metrics::record_aspect_classification(classification.folder());
            tracing::debug!(ratio = %ratio, folder = %classification, "Classified video");

            temp.rewind().await?;
            let key = StorageKey::generate(Some(classification.folder()), media.extension());
            tracing::Span::current().record("s3.key", key.as_str());

            self.objects
                .put_object(
                    &self.settings.bucket,
                    key.as_str(),
                    temp.reader().await?,
                    media.media_type(),
                )
                .await?;

            let mut record = owned.into_inner();
            record.video_url = Some(object_url(
                &self.settings.bucket,
                &self.settings.region,
                key.as_str(),
            ));
            self.commit(record).await
        }
        .await;

        self.finish(UploadKind::Video, "s3", start, bytes, &result);
        result
    }

    async fn commit(&self, mut record: VideoRecord) -> Result<VideoRecord, UploadError> {
        record.updated_at = Utc::now();
        self.records
            .update_video(&record)
            .await
            .map_err(UploadError::UpdateFailed)?;
        metrics::record_record_update();
        Ok(record)
    }

    fn finish(
        &self,
        kind: UploadKind,
        strategy: &str,
        start: Instant,
        bytes: u64,
        result: &Result<VideoRecord, UploadError>,
    ) {
        metrics::record_upload_duration(kind.as_str(), strategy, start.elapsed().as_secs_f64());
        match result {
            Ok(_) => metrics::record_upload_success(kind.as_str(), bytes),
            Err(e) => {
                metrics::record_upload_failure(kind.as_str());
                metrics::record_error(e.kind());
            }
        }
    }
}

fn counted(body: BodyStream<'_>, counter: Arc<AtomicU64>) -> BodyStream<'_> {
    Box::pin(body.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        }
    }))
}
