//! End-to-end verification pass scenarios against in-memory repositories.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use fronda::application::error::VerifyError;
use fronda::application::repos::{ContentRepo, FlagError, FlagProvider, RepoError};
use fronda::application::site_cache::{CachedView, SiteCache};
use fronda::cache::{CacheConfig, CacheKey};
use fronda::domain::entities::{FolderRecord, PageRecord, PluginData, SiteConfigRecord};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct MockRepo {
    page_fetches: AtomicUsize,
    folder_fetches: AtomicUsize,
    config_fetches: AtomicUsize,
    plugin_fetches: AtomicUsize,
    fail_site_config: AtomicBool,
    fetch_delay_ms: u64,
}

impl MockRepo {
    fn total_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
            + self.folder_fetches.load(Ordering::SeqCst)
            + self.config_fetches.load(Ordering::SeqCst)
            + self.plugin_fetches.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if self.fetch_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.fetch_delay_ms)).await;
        }
    }
}

fn sample_page(title: &str, folder: Option<Uuid>) -> PageRecord {
    PageRecord {
        id: Uuid::new_v4(),
        slug: title.to_lowercase(),
        title: title.to_string(),
        folder_id: folder,
        draft: false,
        published_at: Some(OffsetDateTime::UNIX_EPOCH),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[async_trait]
impl ContentRepo for MockRepo {
    async fn fetch_all_pages(&self, _include_drafts: bool) -> Result<Vec<PageRecord>, RepoError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(vec![
            sample_page("Home", None),
            sample_page("Guide", Some(Uuid::from_u128(2))),
        ])
    }

    async fn fetch_all_folders(&self) -> Result<Vec<FolderRecord>, RepoError> {
        self.folder_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let docs = Uuid::from_u128(1);
        Ok(vec![
            FolderRecord {
                id: docs,
                name: "docs".to_string(),
                parent_id: None,
            },
            FolderRecord {
                id: Uuid::from_u128(2),
                name: "guides".to_string(),
                parent_id: Some(docs),
            },
        ])
    }

    async fn fetch_site_config(&self) -> Result<SiteConfigRecord, RepoError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.fail_site_config.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("settings table offline".to_string()));
        }
        Ok(SiteConfigRecord {
            site_title: "Fronda".to_string(),
            base_url: "http://localhost".to_string(),
            meta_description: "test site".to_string(),
            timezone: chrono_tz::Tz::UTC,
            homepage_size: 10,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        })
    }

    async fn fetch_plugin_data(&self) -> Result<PluginData, RepoError> {
        self.plugin_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        let mut data = HashMap::new();
        data.insert("search".to_string(), serde_json::json!({"index": true}));
        Ok(data)
    }
}

struct StaticFlag(bool);

#[async_trait]
impl FlagProvider for StaticFlag {
    async fn is_caching_enabled(&self) -> Result<bool, FlagError> {
        Ok(self.0)
    }
}

struct BrokenFlag;

#[async_trait]
impl FlagProvider for BrokenFlag {
    async fn is_caching_enabled(&self) -> Result<bool, FlagError> {
        Err(FlagError("flag service unreachable".to_string()))
    }
}

fn site_cache(repo: Arc<MockRepo>, flag: impl FlagProvider + 'static) -> SiteCache {
    SiteCache::new(repo, Arc::new(flag), CacheConfig::default())
}

#[tokio::test]
async fn verify_populates_all_six_logical_caches() {
    init_tracing();
    let repo = Arc::new(MockRepo::default());
    let cache = site_cache(repo.clone(), StaticFlag(true));

    cache.verify_caches().await.expect("verification pass");

    for key in CacheKey::ALL {
        assert!(cache.is_populated(key), "{key} not populated");
    }
    assert!(cache.last_verified_at().is_some());

    // pages ×2 (pages + page tree), folders ×3 (list + both trees),
    // config ×1, plugins ×1.
    assert_eq!(repo.page_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(repo.folder_fetches.load(Ordering::SeqCst), 3);
    assert_eq!(repo.config_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(repo.plugin_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_verify_within_ttl_does_no_work() {
    let repo = Arc::new(MockRepo::default());
    let cache = site_cache(repo.clone(), StaticFlag(true));

    cache.verify_caches().await.expect("first pass");
    let fetches_after_first = repo.total_fetches();
    let marker_after_first = cache.last_verified_at();

    cache.verify_caches().await.expect("second pass");

    assert_eq!(repo.total_fetches(), fetches_after_first);
    assert_eq!(cache.last_verified_at(), marker_after_first);
}

#[tokio::test]
async fn disabled_flag_makes_verification_a_noop() {
    let repo = Arc::new(MockRepo::default());
    let cache = site_cache(repo.clone(), StaticFlag(false));

    cache.verify_caches().await.expect("disabled pass");

    assert_eq!(repo.total_fetches(), 0);
    assert!(cache.last_verified_at().is_none());
    for key in CacheKey::ALL {
        assert!(!cache.is_populated(key));
    }
}

#[tokio::test]
async fn flag_lookup_error_fails_open_to_disabled() {
    let repo = Arc::new(MockRepo::default());
    let cache = site_cache(repo.clone(), BrokenFlag);

    cache.verify_caches().await.expect("pass with broken flag");
    assert_eq!(repo.total_fetches(), 0);
}

#[tokio::test]
async fn partial_failure_is_reported_and_retried_next_pass() {
    init_tracing();
    let repo = Arc::new(MockRepo::default());
    repo.fail_site_config.store(true, Ordering::SeqCst);
    let cache = site_cache(repo.clone(), StaticFlag(true));

    let err = cache.verify_caches().await.expect_err("partial failure");
    match &err {
        VerifyError::Partial { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, CacheKey::SiteConfig);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.failed_caches(), vec![CacheKey::SiteConfig]);

    // Siblings completed despite the failure; the marker did not advance.
    assert!(cache.is_populated(CacheKey::Pages));
    assert!(cache.is_populated(CacheKey::FolderTree));
    assert!(!cache.is_populated(CacheKey::SiteConfig));
    assert!(cache.last_verified_at().is_none());

    // Backend recovers: the next pass refills what is missing.
    repo.fail_site_config.store(false, Ordering::SeqCst);
    cache.verify_caches().await.expect("retry pass");
    assert!(cache.is_populated(CacheKey::SiteConfig));
    assert!(cache.last_verified_at().is_some());
}

#[tokio::test]
async fn verify_repairs_invalidated_caches_within_ttl_window() {
    let repo = Arc::new(MockRepo::default());
    let cache = site_cache(repo.clone(), StaticFlag(true));

    cache.verify_caches().await.expect("first pass");
    let marker = cache.last_verified_at();

    cache.folder_changed();
    assert!(!cache.is_populated(CacheKey::FolderTree));

    cache.verify_caches().await.expect("repair pass");

    assert!(cache.is_populated(CacheKey::FolderTree));
    assert!(cache.is_populated(CacheKey::FolderList));
    assert!(cache.is_populated(CacheKey::PageFolderTree));
    // A gap-repair pass does not advance the global marker.
    assert_eq!(cache.last_verified_at(), marker);
}

#[tokio::test]
async fn slow_refill_times_out_as_population_error() {
    init_tracing();
    let repo = Arc::new(MockRepo {
        fetch_delay_ms: 300,
        ..Default::default()
    });
    let config = CacheConfig {
        refill_timeout: Duration::milliseconds(50),
        ..Default::default()
    };
    let cache = SiteCache::new(repo, Arc::new(StaticFlag(true)), config);

    let err = cache.verify_caches().await.expect_err("timeouts");
    match err {
        VerifyError::Partial { failures } => {
            assert_eq!(failures.len(), CacheKey::ALL.len());
            assert!(failures.iter().all(|(_, e)| e.message.contains("timed out")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_pass_exceeds_the_overall_deadline() {
    let repo = Arc::new(MockRepo {
        fetch_delay_ms: 300,
        ..Default::default()
    });
    // Per-refill budget generous, whole-pass budget tight: only the pass
    // deadline can fire here.
    let config = CacheConfig {
        refill_timeout: Duration::seconds(10),
        pass_deadline: Duration::milliseconds(50),
        ..Default::default()
    };
    let cache = SiteCache::new(repo, Arc::new(StaticFlag(true)), config);

    let err = cache.verify_caches().await.expect_err("deadline");
    assert!(matches!(err, VerifyError::Deadline));
    assert!(cache.last_verified_at().is_none());
}

#[tokio::test]
async fn concurrent_page_reads_populate_exactly_once() {
    let repo = Arc::new(MockRepo {
        fetch_delay_ms: 50,
        ..Default::default()
    });
    let cache = Arc::new(site_cache(repo.clone(), StaticFlag(true)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get_pages(false).await }));
    }
    for handle in handles {
        let pages = handle.await.expect("join").expect("pages");
        assert_eq!(pages.len(), 2);
    }

    assert_eq!(repo.page_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entry_is_still_reachable_as_last_known() {
    let repo = Arc::new(MockRepo::default());
    let config = CacheConfig {
        pages_ttl: Duration::milliseconds(30),
        ..Default::default()
    };
    let cache = SiteCache::new(repo, Arc::new(StaticFlag(true)), config);

    cache.get_pages(false).await.expect("pages");
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;

    // Logically absent for regular reads, explicitly available as fallback.
    assert!(cache.is_populated(CacheKey::Pages));
    match cache.last_known(CacheKey::Pages) {
        Some(CachedView::Pages(pages)) => assert_eq!(pages.len(), 2),
        other => panic!("unexpected cached view: {other:?}"),
    }
}
