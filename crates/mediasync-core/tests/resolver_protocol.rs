#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mediasync_core::{
    Auth, CacheRecord, CacheStore, ConcurrencyConfig, DownloadRequest, Error, FileHandle,
    FileMaterializer, LivenessTracker, MediaContext, MemoryCache, Resolution, Result,
    RevisionMarker, download_media_files, resolve_and_attach,
};
use serde_json::{Value, json};

/// What the fake materializer answers for the next download.
enum Answer {
    Handle(&'static str),
    Nothing,
    Fail,
}

#[derive(Default)]
struct RecordingFiles {
    answers: Mutex<VecDeque<Answer>>,
    urls: Mutex<Vec<String>>,
}

impl RecordingFiles {
    fn answering(answers: impl IntoIterator<Item = Answer>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            urls: Mutex::default(),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileMaterializer for RecordingFiles {
    async fn download(&self, request: DownloadRequest<'_>) -> Result<Option<FileHandle>> {
        self.urls.lock().unwrap().push(request.url.to_string());
        let answer = self.answers.lock().unwrap().pop_front();
        match answer {
            Some(Answer::Handle(handle)) => Ok(Some(FileHandle::from(handle))),
            Some(Answer::Nothing) => Ok(None),
            Some(Answer::Fail) | None => Err(Error::Collaborator("download failed".into())),
        }
    }
}

#[derive(Default)]
struct RecordingLiveness {
    touched: Mutex<Vec<FileHandle>>,
}

#[async_trait]
impl LivenessTracker for RecordingLiveness {
    async fn touch(&self, handle: &FileHandle) -> Result<()> {
        self.touched.lock().unwrap().push(handle.clone());
        Ok(())
    }
}

struct Harness {
    cache: Arc<MemoryCache>,
    files: Arc<RecordingFiles>,
    liveness: Arc<RecordingLiveness>,
    ctx: MediaContext,
}

fn harness(cache: Arc<MemoryCache>, files: Arc<RecordingFiles>) -> Harness {
    harness_with(cache, files, ConcurrencyConfig::default())
}

fn harness_with(
    cache: Arc<MemoryCache>,
    files: Arc<RecordingFiles>,
    concurrency: ConcurrencyConfig,
) -> Harness {
    let liveness = Arc::new(RecordingLiveness::default());
    let ctx = MediaContext::builder("http://cms.test")
        .cache(cache.clone())
        .files(files.clone())
        .liveness(liveness.clone())
        .concurrency(concurrency)
        .build()
        .unwrap();
    Harness {
        cache,
        files,
        liveness,
        ctx,
    }
}

fn descriptor(marker: &str) -> Value {
    json!({
        "id": 5,
        "mime": "image/png",
        "url": "/uploads/a.png",
        "updatedAt": marker,
        "ext": ".png",
        "name": "a"
    })
}

fn expected_record(handle: &str, marker: &str) -> CacheRecord {
    CacheRecord {
        file_node_id: FileHandle::from(handle),
        updated_at: Some(RevisionMarker::from(marker)),
    }
}

#[tokio::test]
async fn test_empty_cache_downloads_and_records() {
    let h = harness(
        Arc::new(MemoryCache::new()),
        RecordingFiles::answering([Answer::Handle("file-123")]),
    );
    let mut image = descriptor("2020-01-01");

    let resolved = resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(resolved.resolution, Resolution::Downloaded(FileHandle::from("file-123")));
    assert_eq!(h.files.urls(), vec!["http://cms.test/uploads/a.png".to_string()]);
    assert_eq!(
        h.cache.get("strapi-media-5").await.unwrap(),
        Some(expected_record("file-123", "2020-01-01"))
    );
    assert_eq!(image["localFile___NODE"], json!("file-123"));
}

#[tokio::test]
async fn test_rerun_with_same_marker_touches_and_skips_download() {
    let cache = Arc::new(MemoryCache::new());
    cache
        .set("strapi-media-5", expected_record("file-123", "2020-01-01"))
        .await
        .unwrap();
    let h = harness(cache, RecordingFiles::answering([]));
    let mut image = descriptor("2020-01-01");

    let resolved = resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(resolved.resolution, Resolution::Reused(FileHandle::from("file-123")));
    assert!(h.files.urls().is_empty());
    assert_eq!(
        *h.liveness.touched.lock().unwrap(),
        vec![FileHandle::from("file-123")]
    );
    assert_eq!(image["localFile___NODE"], json!("file-123"));
}

#[tokio::test]
async fn test_changed_marker_downloads_once_and_overwrites() {
    let cache = Arc::new(MemoryCache::new());
    cache
        .set("strapi-media-5", expected_record("file-123", "2020-01-01"))
        .await
        .unwrap();
    let h = harness(cache, RecordingFiles::answering([Answer::Handle("file-456")]));
    let mut image = descriptor("2020-02-01");

    resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(h.files.urls().len(), 1);
    assert!(h.liveness.touched.lock().unwrap().is_empty());
    assert_eq!(
        h.cache.get("strapi-media-5").await.unwrap(),
        Some(expected_record("file-456", "2020-02-01"))
    );
    assert_eq!(image["localFile___NODE"], json!("file-456"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let cache = Arc::new(MemoryCache::new());
    let first = harness(cache.clone(), RecordingFiles::answering([Answer::Handle("file-123")]));
    let mut run_one = vec![json!({"cover": descriptor("2020-01-01")})];
    let report = download_media_files(&mut run_one, &first.ctx).await.unwrap();
    assert_eq!(report.downloaded, 1);

    let second = harness(cache, RecordingFiles::answering([]));
    let mut run_two = vec![json!({"cover": descriptor("2020-01-01")})];
    let report = download_media_files(&mut run_two, &second.ctx).await.unwrap();

    assert_eq!(report.downloaded, 0);
    assert_eq!(report.reused, 1);
    assert!(second.files.urls().is_empty());
    assert_eq!(run_one, run_two);
}

#[tokio::test]
async fn test_missing_marker_is_always_a_miss() {
    let h = harness(
        Arc::new(MemoryCache::new()),
        RecordingFiles::answering([Answer::Handle("file-1"), Answer::Handle("file-2")]),
    );

    for _ in 0..2 {
        let mut image = json!({"id": 7, "mime": "image/png", "url": "/uploads/b.png"});
        resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
            .await
            .unwrap();
    }

    assert_eq!(h.files.urls().len(), 2);
    assert!(h.liveness.touched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_snake_case_marker_is_honored() {
    let cache = Arc::new(MemoryCache::new());
    cache
        .set("strapi-media-5", expected_record("file-123", "2020-01-01"))
        .await
        .unwrap();
    let h = harness(cache, RecordingFiles::answering([]));
    let mut image = json!({"id": 5, "mime": "image/png", "url": "/a.png", "updated_at": "2020-01-01"});

    let resolved = resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(resolved.resolution, Resolution::Reused(FileHandle::from("file-123")));
}

#[tokio::test]
async fn test_record_without_handle_is_a_miss() {
    let cache = Arc::new(MemoryCache::new());
    cache
        .set("strapi-media-5", expected_record("", "2020-01-01"))
        .await
        .unwrap();
    let h = harness(cache, RecordingFiles::answering([Answer::Handle("file-123")]));
    let mut image = descriptor("2020-01-01");

    let resolved = resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(resolved.resolution, Resolution::Downloaded(FileHandle::from("file-123")));
    assert_eq!(h.files.urls().len(), 1);
    assert!(h.liveness.touched.lock().unwrap().is_empty());
    assert_eq!(image["localFile___NODE"], json!("file-123"));
    assert_eq!(
        h.cache.get("strapi-media-5").await.unwrap(),
        Some(expected_record("file-123", "2020-01-01"))
    );
}

#[tokio::test]
async fn test_unavailable_download_leaves_descriptor_untouched() {
    let h = harness(Arc::new(MemoryCache::new()), RecordingFiles::answering([Answer::Nothing]));
    let mut image = descriptor("2020-01-01");

    let resolved = resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(resolved.resolution, Resolution::Unavailable);
    assert!(image.get("localFile___NODE").is_none());
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn test_image_without_id_bypasses_cache() {
    let h = harness(Arc::new(MemoryCache::new()), RecordingFiles::answering([Answer::Handle("file-9")]));
    let mut image = json!({"mime": "image/png", "url": "https://cdn.test/x.png", "updatedAt": "1"});

    resolve_and_attach(image.as_object_mut().unwrap(), &h.ctx)
        .await
        .unwrap();

    assert_eq!(h.files.urls(), vec!["https://cdn.test/x.png".to_string()]);
    assert_eq!(image["localFile___NODE"], json!("file-9"));
    assert!(h.cache.is_empty().await);
}

#[tokio::test]
async fn test_failing_record_does_not_stop_the_others() {
    // Record 0 fails; record 1 must still be resolved before the error surfaces.
    let h = harness_with(
        Arc::new(MemoryCache::new()),
        RecordingFiles::answering([Answer::Fail, Answer::Handle("file-2")]),
        ConcurrencyConfig {
            records: 1,
            images_per_record: 1,
        },
    );
    let mut records = vec![
        json!({"cover": {"id": 1, "mime": "image/png", "url": "/1.png"}}),
        json!({"cover": {"id": 2, "mime": "image/png", "url": "/2.png"}}),
    ];

    let err = download_media_files(&mut records, &h.ctx).await.unwrap_err();

    assert!(matches!(err, Error::Collaborator(_)));
    assert_eq!(h.files.urls().len(), 2);
    assert_eq!(records[1]["cover"]["localFile___NODE"], json!("file-2"));
    assert!(records[0]["cover"].get("localFile___NODE").is_none());
}

#[tokio::test]
async fn test_concurrent_records_resolve_every_image() {
    let answers = (0..4).map(|_| Answer::Handle("file-x"));
    let h = harness_with(
        Arc::new(MemoryCache::new()),
        RecordingFiles::answering(answers),
        ConcurrencyConfig {
            records: 4,
            images_per_record: 2,
        },
    );
    let mut records = vec![
        json!({"gallery": [
            {"id": 1, "mime": "image/png", "url": "/1.png"},
            {"id": 2, "mime": "image/png", "url": "/2.png"}
        ]}),
        json!({"hero": {"id": 3, "mime": "image/png", "url": "/3.png"}}),
        json!({"blocks": [{"media": {"id": 4, "mime": "image/png", "url": "/4.png"}}]}),
        json!({"title": "no images"}),
    ];

    let report = download_media_files(&mut records, &h.ctx).await.unwrap();

    assert_eq!(report.records, 4);
    assert_eq!(report.images, 4);
    assert_eq!(report.downloaded, 4);
    assert_eq!(report.handles.len(), 4);
    assert!(report.handles.contains_key("strapi-media-3"));
    assert_eq!(records[2]["blocks"][0]["media"]["localFile___NODE"], json!("file-x"));
}

/// Cache store whose reads or writes fail.
struct BrokenCache {
    fail_get: bool,
    inner: MemoryCache,
}

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        if self.fail_get {
            return Err(Error::Storage("cache unreadable".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _record: CacheRecord) -> Result<()> {
        Err(Error::Storage("cache read-only".into()))
    }
}

struct DeadLiveness;

#[async_trait]
impl LivenessTracker for DeadLiveness {
    async fn touch(&self, _handle: &FileHandle) -> Result<()> {
        Err(Error::Collaborator("node store offline".into()))
    }
}

fn context_with(
    cache: Arc<dyn CacheStore>,
    files: Arc<RecordingFiles>,
    liveness: Arc<dyn LivenessTracker>,
) -> MediaContext {
    MediaContext::builder("http://cms.test")
        .cache(cache)
        .files(files)
        .liveness(liveness)
        .auth(Auth::default())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_cache_read_failure_fails_resolution() {
    let files = RecordingFiles::answering([Answer::Handle("file-123")]);
    let cache = Arc::new(BrokenCache {
        fail_get: true,
        inner: MemoryCache::new(),
    });
    let ctx = context_with(cache, files.clone(), Arc::new(RecordingLiveness::default()));
    let mut image = descriptor("2020-01-01");

    let err = resolve_and_attach(image.as_object_mut().unwrap(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert!(files.urls().is_empty());
    assert!(image.get("localFile___NODE").is_none());
}

#[tokio::test]
async fn test_cache_write_failure_fails_resolution() {
    let files = RecordingFiles::answering([Answer::Handle("file-123")]);
    let cache = Arc::new(BrokenCache {
        fail_get: false,
        inner: MemoryCache::new(),
    });
    let ctx = context_with(cache, files.clone(), Arc::new(RecordingLiveness::default()));
    let mut image = descriptor("2020-01-01");

    let err = resolve_and_attach(image.as_object_mut().unwrap(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(files.urls().len(), 1);
    assert!(image.get("localFile___NODE").is_none());
}

#[tokio::test]
async fn test_touch_failure_fails_resolution() {
    let inner = MemoryCache::new();
    inner
        .set("strapi-media-5", expected_record("file-123", "2020-01-01"))
        .await
        .unwrap();
    let cache = Arc::new(BrokenCache {
        fail_get: false,
        inner,
    });
    let files = RecordingFiles::answering([]);
    let ctx = context_with(cache, files.clone(), Arc::new(DeadLiveness));
    let mut records = vec![json!({"cover": descriptor("2020-01-01")})];

    let err = download_media_files(&mut records, &ctx).await.unwrap_err();

    assert!(matches!(err, Error::Collaborator(_)));
    assert!(files.urls().is_empty());
    assert!(records[0]["cover"].get("localFile___NODE").is_none());
}
