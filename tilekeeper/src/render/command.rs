//! Renderer that shells out to an external program per tile.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, trace};

use super::{RenderError, RenderFuture, TileRenderer};
use crate::cache::TileStore;
use crate::coord::TileCoord;
use crate::registry::{DirtyRecord, DirtyRegistry};

/// Program and argument template with `{zoom}`, `{x}`, `{y}` and `{path}`
/// placeholders.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use tilekeeper::coord::TileCoord;
/// use tilekeeper::render::CommandTemplate;
///
/// let template = CommandTemplate::parse("render-tile --out {path} {zoom} {x} {y}").unwrap();
/// let args = template.args_for(&TileCoord::new(14, 1, 2), Path::new("/t/14/1/2.png"));
/// assert_eq!(template.program(), "render-tile");
/// assert_eq!(args, vec!["--out", "/t/14/1/2.png", "14", "1", "2"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Split a whitespace-separated command line. Returns `None` if empty.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders substituted for one tile.
    pub fn args_for(&self, tile: &TileCoord, image: &Path) -> Vec<String> {
        let path = image.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{zoom}", &tile.zoom.to_string())
                    .replace("{x}", &tile.x.to_string())
                    .replace("{y}", &tile.y.to_string())
                    .replace("{path}", &path)
            })
            .collect()
    }
}

/// Renders tiles by running an external program once per tile.
///
/// A zero exit status means the image at `{path}` was written. For prerender
/// calls the tile's dirty state is then cleared.
pub struct CommandRenderer {
    template: CommandTemplate,
    store: TileStore,
    registry: Arc<DirtyRegistry>,
}

impl CommandRenderer {
    pub fn new(template: CommandTemplate, store: TileStore, registry: Arc<DirtyRegistry>) -> Self {
        Self {
            template,
            store,
            registry,
        }
    }

    async fn run(&self, record: &DirtyRecord, prerender: bool) -> Result<(), RenderError> {
        let tile = record.tile();
        let image = self.store.image_path(&tile);
        let args = self.template.args_for(&tile, &image);

        trace!(tile = %tile, program = %self.template.program, "Spawning renderer");

        let status = Command::new(&self.template.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.template.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RenderError::Exit { tile, status });
        }

        if prerender {
            let cleared = self
                .store
                .clear_rendered(&self.registry, record)
                .await
                .map_err(|source| RenderError::ClearMarker { tile, source })?;
            if !cleared {
                debug!(tile = %tile, "Tile dirtied again while rendering, keeping it queued");
            }
        }

        Ok(())
    }
}

impl TileRenderer for CommandRenderer {
    fn render<'a>(&'a self, record: &'a DirtyRecord, prerender: bool) -> RenderFuture<'a> {
        Box::pin(self.run(record, prerender))
    }
}
