//! Render collaborator interface.
//!
//! The scheduler does not paint tiles itself; it hands each dirty tile to a
//! [`TileRenderer`]. The renderer is shared by every worker, so it doubles as
//! the handle to whatever rendering pool backs it.
//!
//! ```text
//! ┌──────────────────────────┐
//! │   PrerenderScheduler     │  (depends on Arc<dyn TileRenderer>)
//! └────────────┬─────────────┘
//!              ▼
//! ┌──────────────────────────┐
//! │   TileRenderer trait     │  render(&DirtyRecord, prerender)
//! └────────────┬─────────────┘
//!       ┌──────┴───────┐
//!       ▼              ▼
//!  CommandRenderer   test doubles
//! ```
//!
//! On a successful prerender the renderer owns clearing the tile's dirty
//! state, typically via [`crate::cache::TileStore::clear_rendered`].

mod command;

pub use command::{CommandRenderer, CommandTemplate};

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::ExitStatus;

use thiserror::Error;

use crate::coord::TileCoord;
use crate::registry::DirtyRecord;

/// Boxed future returned by [`TileRenderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RenderError>> + Send + 'a>>;

/// Renders one tile into the cache.
pub trait TileRenderer: Send + Sync {
    /// Render the tile described by `record`.
    ///
    /// `prerender` is `true` when called by the prerender scheduler; the
    /// renderer then also clears the tile's dirty marker and registry entry
    /// after writing the image.
    fn render<'a>(&'a self, record: &'a DirtyRecord, prerender: bool) -> RenderFuture<'a>;
}

/// Failure to render a single tile.
///
/// Never fatal to the scheduler: the tile stays dirty and is retried when the
/// next pass starts.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The render program could not be started.
    #[error("Failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The render program ran but reported failure.
    #[error("Renderer exited with {status} for tile {tile}")]
    Exit { tile: TileCoord, status: ExitStatus },

    /// The tile rendered but its dirty state could not be cleared.
    #[error("Failed to clear dirty marker for tile {tile}: {source}")]
    ClearMarker {
        tile: TileCoord,
        #[source]
        source: io::Error,
    },

    /// Renderer-specific failure.
    #[error("Render failed for tile {tile}: {reason}")]
    Failed { tile: TileCoord, reason: String },
}
