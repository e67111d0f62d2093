//! Prerender service facade implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::ServiceError;
use crate::cache::TileStore;
use crate::config::ConfigFile;
use crate::coord::BoundingBox;
use crate::marker::{DirtyMarker, MarkSummary, MarkerConfig, MarkerDaemon};
use crate::registry::DirtyRegistry;
use crate::render::{CommandRenderer, CommandTemplate, TileRenderer};
use crate::scanner::{InitialScanner, ScanConfig, ScanSummary};
use crate::scheduler::{
    default_workers, PrerenderScheduler, RestartSignal, SchedulerConfig, ZoomPriority,
};

/// Composition root for dirty tracking and prerendering.
pub struct PrerenderService {
    /// Loaded configuration
    config: ConfigFile,
    /// Tile cache on disk
    store: TileStore,
    /// Dirty tiles shared by scanner, marker, scheduler and renderer
    registry: Arc<DirtyRegistry>,
    /// Marker → scheduler wake-up
    signal: Arc<RestartSignal>,
    /// Render collaborator, if one is configured
    renderer: Option<Arc<dyn TileRenderer>>,
}

impl PrerenderService {
    /// Create a service from configuration.
    ///
    /// Uses a [`CommandRenderer`] when `[render] command` is set. Without it
    /// the service can still scan and mark, but not run.
    pub fn from_config(config: ConfigFile) -> Result<Self, ServiceError> {
        let store = TileStore::new(&config.dirs.tiles);
        let registry = Arc::new(DirtyRegistry::new());

        let renderer = match config.render.command.as_deref() {
            Some(line) => {
                let template = CommandTemplate::parse(line).ok_or_else(|| {
                    ServiceError::ConfigError("render.command is empty".to_string())
                })?;
                let renderer: Arc<dyn TileRenderer> = Arc::new(CommandRenderer::new(
                    template,
                    store.clone(),
                    Arc::clone(&registry),
                ));
                Some(renderer)
            }
            None => None,
        };

        Ok(Self {
            config,
            store,
            registry,
            signal: Arc::new(RestartSignal::new()),
            renderer,
        })
    }

    /// Create a service around an existing registry and renderer.
    pub fn with_renderer(
        config: ConfigFile,
        registry: Arc<DirtyRegistry>,
        renderer: Arc<dyn TileRenderer>,
    ) -> Self {
        Self {
            store: TileStore::new(&config.dirs.tiles),
            config,
            registry,
            signal: Arc::new(RestartSignal::new()),
            renderer: Some(renderer),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Shared dirty registry.
    pub fn registry(&self) -> &Arc<DirtyRegistry> {
        &self.registry
    }

    /// Shared restart signal.
    pub fn signal(&self) -> &Arc<RestartSignal> {
        &self.signal
    }

    /// Startup scanner over the configured prerender box and zooms.
    pub fn scanner(&self) -> InitialScanner {
        let prerender = &self.config.prerender;
        InitialScanner::new(
            ScanConfig {
                bbox: BoundingBox::new(
                    prerender.min_lon,
                    prerender.max_lon,
                    prerender.min_lat,
                    prerender.max_lat,
                ),
                min_zoom: prerender.min_zoom,
                max_zoom: prerender.max_zoom,
                rerender_older_than_ms: self.config.render.rerender_older_than_ms,
            },
            self.store.clone(),
            Arc::clone(&self.registry),
        )
    }

    /// Marker wired to the shared registry and signal.
    pub fn marker(&self) -> DirtyMarker {
        DirtyMarker::new(
            MarkerConfig {
                expires_dir: self.config.dirs.expires.clone(),
                min_zoom: self.config.zoom.min,
                max_zoom: self.config.zoom.max,
                prerender_min_zoom: self.config.prerender.min_zoom,
                prerender_max_zoom: self.config.prerender.max_zoom,
            },
            self.store.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.signal),
        )
    }

    /// Prerender scheduler over the configured renderer.
    pub fn scheduler(&self) -> Result<PrerenderScheduler, ServiceError> {
        let renderer = self.renderer.clone().ok_or(ServiceError::NoRenderer)?;
        Ok(PrerenderScheduler::new(
            Arc::clone(&self.registry),
            renderer,
            Arc::clone(&self.signal),
            SchedulerConfig {
                workers: self.config.prerender.workers.unwrap_or_else(default_workers),
                zoom_priority: ZoomPriority::new(self.config.prerender.zoom_prio.clone()),
            },
        ))
    }

    /// Seed the registry from the tile cache.
    pub async fn scan(&self) -> Result<ScanSummary, ServiceError> {
        Ok(self.scanner().scan().await?)
    }

    /// Run a single marker pass.
    pub async fn mark(&self) -> Result<MarkSummary, ServiceError> {
        Ok(self.marker().run_pass().await?)
    }

    /// Scan, then prerender and consume notifications until `shutdown`.
    ///
    /// Returns `Ok(())` only after cancellation; a scheduler failure is
    /// returned as an error and stops the marker daemon too.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServiceError> {
        let scheduler = self.scheduler()?;

        let scanned = tokio::select! {
            biased;

            _ = shutdown.cancelled() => None,

            result = self.scan() => Some(result?),
        };
        if scanned.is_none() {
            info!("Shutdown requested during startup scan");
            return Ok(());
        }

        let daemon = MarkerDaemon::new(self.marker())
            .with_interval(Duration::from_secs(self.config.expires.interval_secs));
        let daemon_shutdown = shutdown.child_token();
        let daemon_handle = tokio::spawn(daemon.run(daemon_shutdown.clone()));

        let result = scheduler.run(shutdown).await;

        daemon_shutdown.cancel();
        if let Err(e) = daemon_handle.await {
            warn!(error = %e, "Marker daemon task failed");
        }

        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{tile_to_lat_lon, TileCoord};
    use crate::registry::DirtyRecord;
    use crate::render::RenderFuture;
    use tempfile::TempDir;
    use tokio::fs;

    struct ClearingRenderer {
        registry: Arc<DirtyRegistry>,
    }

    impl TileRenderer for ClearingRenderer {
        fn render<'a>(&'a self, record: &'a DirtyRecord, _prerender: bool) -> RenderFuture<'a> {
            Box::pin(async move {
                self.registry.remove_if_unchanged(record);
                Ok(())
            })
        }
    }

    /// Config whose scan box covers exactly `tile` at its zoom.
    fn config_for(temp: &TempDir, tile: &TileCoord) -> ConfigFile {
        let (north, west) = tile_to_lat_lon(tile);
        let (south, east) = tile_to_lat_lon(&TileCoord::new(tile.zoom, tile.x + 1, tile.y + 1));
        let mut config = ConfigFile::default();
        config.dirs.tiles = temp.path().join("tiles");
        config.dirs.expires = temp.path().join("expires");
        config.prerender.min_zoom = tile.zoom;
        config.prerender.max_zoom = tile.zoom;
        config.prerender.min_lon = west + (east - west) / 4.0;
        config.prerender.max_lon = east - (east - west) / 4.0;
        config.prerender.min_lat = south + (north - south) / 4.0;
        config.prerender.max_lat = north - (north - south) / 4.0;
        config.prerender.workers = Some(2);
        config
    }

    #[tokio::test]
    async fn test_scan_and_mark_without_renderer() {
        let temp = TempDir::new().unwrap();
        let tile = TileCoord::new(8, 10, 10);
        let service = PrerenderService::from_config(config_for(&temp, &tile)).unwrap();

        let scanned = service.scan().await.unwrap();
        let marked = service.mark().await.unwrap();

        assert_eq!(scanned.missing, 1);
        assert_eq!(marked, MarkSummary::default());
        assert!(service.registry().contains(&tile));
    }

    #[tokio::test]
    async fn test_run_requires_renderer() {
        let temp = TempDir::new().unwrap();
        let service =
            PrerenderService::from_config(config_for(&temp, &TileCoord::new(3, 1, 1))).unwrap();

        let err = service.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ServiceError::NoRenderer));
    }

    #[tokio::test]
    async fn test_from_config_builds_command_renderer() {
        let temp = TempDir::new().unwrap();
        let mut config = config_for(&temp, &TileCoord::new(3, 1, 1));
        config.render.command = Some("render-tile {zoom} {x} {y}".to_string());

        let service = PrerenderService::from_config(config).unwrap();

        assert!(service.scheduler().is_ok());
    }

    #[tokio::test]
    async fn test_run_renders_scanned_and_marked_tiles() {
        let temp = TempDir::new().unwrap();
        let tile = TileCoord::new(8, 10, 10);
        let mut config = config_for(&temp, &tile);
        config.zoom.min = 8;
        config.zoom.max = 8;
        config.prerender.min_zoom = 0;
        config.prerender.max_zoom = 8;
        config.expires.interval_secs = 1;

        // Image at a zoom outside the scan box, expired by a notification.
        let expired = TileCoord::new(8, 200, 200);
        let image = TileStore::new(&config.dirs.tiles).image_path(&expired);
        fs::create_dir_all(image.parent().unwrap()).await.unwrap();
        fs::write(&image, b"png").await.unwrap();
        let shard = config.dirs.expires.join("0");
        fs::create_dir_all(&shard).await.unwrap();
        fs::write(shard.join("1.txt"), "8/200/200\n").await.unwrap();

        let registry = Arc::new(DirtyRegistry::new());
        let renderer = Arc::new(ClearingRenderer {
            registry: Arc::clone(&registry),
        });
        let service = PrerenderService::with_renderer(config, Arc::clone(&registry), renderer);
        let signal = Arc::clone(service.signal());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(service.run(shutdown.clone()));

        tokio::time::timeout(Duration::from_secs(10), async {
            // Wait for the marker pass to fire and the registry to drain.
            while signal.fired_count() == 0 || !registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("scanned and marked tiles should be rendered");

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
