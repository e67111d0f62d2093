//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let zoom_prio = config
        .prerender
        .zoom_prio
        .iter()
        .map(|z| z.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let workers = config.prerender.workers.unwrap_or(0);
    let rerender_older_than_ms = config.render.rerender_older_than_ms.unwrap_or(0);
    let command = config.render.command.as_deref().unwrap_or("");

    format!(
        r#"[zoom]
; Zoom range served by the tile server. An expired tile is expanded to every
; zoom in this range (ancestors and descendants).
min = {}
max = {}

[dirs]
; Tile cache root. Images live at <tiles>/<zoom>/<x>/<y>.png and dirty
; markers at <tiles>/<zoom>/<x>/<y>.dirty
tiles = {}
; Expiry notifications, one subdirectory per shard, one "z/x/y" per line
expires = {}

[prerender]
; Zoom range kept rendered. Expired images outside it are deleted instead.
min_zoom = {}
max_zoom = {}
; Zoom levels rendered first, in order (e.g. 12, 14, 10). Other zooms
; follow, coarsest first.
zoom_prio = {}
; Concurrent renders (0 = number of CPUs)
workers = {}
; Area scanned for missing and dirty tiles at startup
min_lon = {}
max_lon = {}
min_lat = {}
max_lat = {}

[render]
; Re-render images last modified before this time, in milliseconds since
; the Unix epoch (0 = disabled)
rerender_older_than_ms = {}
; Renderer command. Placeholders: {{zoom}} {{x}} {{y}} {{path}}
; Example: command = render-tile --out {{path}} {{zoom}} {{x}} {{y}}
command = {}

[expires]
; Seconds between expiry notification passes
interval_secs = {}

[logging]
; Log file location
file = {}
"#,
        config.zoom.min,
        config.zoom.max,
        path_to_string(&config.dirs.tiles),
        path_to_string(&config.dirs.expires),
        config.prerender.min_zoom,
        config.prerender.max_zoom,
        zoom_prio,
        workers,
        config.prerender.min_lon,
        config.prerender.max_lon,
        config.prerender.min_lat,
        config.prerender.max_lat,
        rerender_older_than_ms,
        command,
        config.expires.interval_secs,
        path_to_string(&config.logging.file),
    )
}

/// Display a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
