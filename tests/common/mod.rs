//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary media
//! directory, a config pointing at it and a full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::fs::{self, File};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast::error::RecvError;

use tvshelf::config::Config;
use tvshelf::scanner::{MediaProbe, Scanner};
use tvshelf::server::{create_router, AppContext};
use tvshelf_common::{Error, Result, ScanId};
use tvshelf_db::models::{MediaDetails, ScanHistory};
use tvshelf_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};

/// Modification time given to every file the harness writes.
pub const BASE_MTIME: u64 = 1_700_000_000;

/// Probe double that counts calls and can be told to fail, hang or vanish.
#[derive(Default)]
pub struct TestProbe {
    pub calls: AtomicUsize,
    pub unavailable: bool,
    pub fail: bool,
    pub hang: bool,
    pub panic_on_check: bool,
}

impl TestProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProbe for TestProbe {
    fn name(&self) -> &str {
        "test-probe"
    }

    fn is_available(&self) -> bool {
        if self.panic_on_check {
            panic!("probe exploded");
        }
        !self.unavailable
    }

    async fn probe(&self, _path: &Path) -> Result<MediaDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(Error::tool("test-probe", "unreadable file"));
        }
        Ok(MediaDetails {
            container: Some("matroska".into()),
            video_codec: Some("h264".into()),
            audio_codec: Some("aac".into()),
            resolution_width: Some(1920),
            resolution_height: Some(1080),
            duration_secs: Some(1320.0),
        })
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub media: TempDir,
    pub probe: Arc<TestProbe>,
}

impl TestHarness {
    /// Harness with metadata probing disabled.
    pub fn new() -> Self {
        Self::build(|_| {}, TestProbe::default())
    }

    /// Harness with config tweaks applied on top of the defaults.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        Self::build(tweak, TestProbe::default())
    }

    pub fn build(tweak: impl FnOnce(&mut Config), probe: TestProbe) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        let db = init_memory_pool().expect("failed to create in-memory pool");

        let mut config = Config::default();
        config.library.media_paths = vec![media.path().to_path_buf()];
        config.scanner.skip_metadata = true;
        tweak(&mut config);
        let config = Arc::new(config);

        let probe = Arc::new(probe);
        let scanner = Scanner::with_probe(db.clone(), config.clone(), probe.clone());
        let ctx = AppContext::with_scanner(config, db.clone(), scanner);

        Self {
            ctx,
            db,
            media,
            probe,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn scanner(&self) -> &Scanner {
        &self.ctx.scanner
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.media.path().join(rel)
    }

    /// Write a file of `size` bytes under the media root.
    pub fn write(&self, rel: &str, size: usize) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![0u8; size]).unwrap();
        set_mtime(&path, BASE_MTIME);
        path
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).unwrap();
    }
}

pub fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Wait for a scan to reach its terminal phase and return its history.
pub async fn wait_for_scan(scanner: &Scanner, id: ScanId) -> ScanHistory {
    let wait = async {
        let Some(mut sub) = scanner.subscribe(id) else {
            return;
        };
        if sub.initial.phase.is_terminal() {
            return;
        }
        loop {
            match sub.updates.recv().await {
                Ok(p) if p.phase.is_terminal() => break,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(30), wait)
        .await
        .expect("scan did not finish in time");

    // The registry entry goes away right after the row is finalized.
    for _ in 0..100 {
        if scanner.get_scan_progress(id).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    scanner
        .get_scan_history(id)
        .expect("history query failed")
        .expect("scan history missing")
}
