//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::{MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()`, overlays any values found in the INI,
/// then checks the ranges that span several keys.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [zoom] section
    if let Some(section) = ini.section(Some("zoom")) {
        if let Some(v) = section.get("min") {
            config.zoom.min = parse_zoom("zoom", "min", v)?;
        }
        if let Some(v) = section.get("max") {
            config.zoom.max = parse_zoom("zoom", "max", v)?;
        }
    }

    // [dirs] section
    if let Some(section) = ini.section(Some("dirs")) {
        if let Some(v) = non_empty(section.get("tiles")) {
            config.dirs.tiles = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("expires")) {
            config.dirs.expires = expand_tilde(v);
        }
    }

    // [prerender] section
    if let Some(section) = ini.section(Some("prerender")) {
        if let Some(v) = section.get("min_zoom") {
            config.prerender.min_zoom = parse_zoom("prerender", "min_zoom", v)?;
        }
        if let Some(v) = section.get("max_zoom") {
            config.prerender.max_zoom = parse_zoom("prerender", "max_zoom", v)?;
        }
        if let Some(v) = section.get("zoom_prio") {
            config.prerender.zoom_prio = parse_zoom_list("prerender", "zoom_prio", v)?;
        }
        if let Some(v) = section.get("workers") {
            let workers: usize =
                parse_value("prerender", "workers", v, "must be a non-negative integer")?;
            config.prerender.workers = (workers > 0).then_some(workers);
        }
        if let Some(v) = section.get("min_lon") {
            config.prerender.min_lon = parse_lon("min_lon", v)?;
        }
        if let Some(v) = section.get("max_lon") {
            config.prerender.max_lon = parse_lon("max_lon", v)?;
        }
        if let Some(v) = section.get("min_lat") {
            config.prerender.min_lat = parse_lat("min_lat", v)?;
        }
        if let Some(v) = section.get("max_lat") {
            config.prerender.max_lat = parse_lat("max_lat", v)?;
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        if let Some(v) = section.get("rerender_older_than_ms") {
            let cutoff: u64 = parse_value(
                "render",
                "rerender_older_than_ms",
                v,
                "must be a timestamp in milliseconds since the Unix epoch",
            )?;
            config.render.rerender_older_than_ms = (cutoff > 0).then_some(cutoff);
        }
        if let Some(v) = non_empty(section.get("command")) {
            config.render.command = Some(v.to_string());
        }
    }

    // [expires] section
    if let Some(section) = ini.section(Some("expires")) {
        if let Some(v) = section.get("interval_secs") {
            let secs: u64 = parse_value(
                "expires",
                "interval_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
            if secs == 0 {
                return Err(invalid(
                    "expires",
                    "interval_secs",
                    v,
                    "must be a positive integer (seconds)",
                ));
            }
            config.expires.interval_secs = secs;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Checks constraints between keys.
fn validate(config: &ConfigFile) -> Result<(), ConfigFileError> {
    if config.zoom.min > config.zoom.max {
        return Err(invalid(
            "zoom",
            "min",
            &config.zoom.min.to_string(),
            &format!("must not exceed zoom.max ({})", config.zoom.max),
        ));
    }

    let prerender = &config.prerender;
    if prerender.min_zoom > prerender.max_zoom {
        return Err(invalid(
            "prerender",
            "min_zoom",
            &prerender.min_zoom.to_string(),
            &format!("must not exceed prerender.max_zoom ({})", prerender.max_zoom),
        ));
    }
    if prerender.min_lon > prerender.max_lon {
        return Err(invalid(
            "prerender",
            "min_lon",
            &prerender.min_lon.to_string(),
            &format!("must not exceed prerender.max_lon ({})", prerender.max_lon),
        ));
    }
    if prerender.min_lat > prerender.max_lat {
        return Err(invalid(
            "prerender",
            "min_lat",
            &prerender.min_lat.to_string(),
            &format!("must not exceed prerender.max_lat ({})", prerender.max_lat),
        ));
    }
    Ok(())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_zoom(section: &str, key: &str, value: &str) -> Result<u8, ConfigFileError> {
    let reason = format!("must be a zoom level between 0 and {}", MAX_ZOOM);
    let zoom: u8 = parse_value(section, key, value, &reason)?;
    if zoom > MAX_ZOOM {
        return Err(invalid(section, key, value, &reason));
    }
    Ok(zoom)
}

/// Comma-separated zoom levels, e.g. `12, 14, 10`.
fn parse_zoom_list(section: &str, key: &str, value: &str) -> Result<Vec<u8>, ConfigFileError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            parse_zoom(section, key, part)
                .map_err(|_| invalid(section, key, value, "must be a comma-separated list of zoom levels"))
        })
        .collect()
}

fn parse_lon(key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let reason = format!("must be a longitude between {} and {}", MIN_LON, MAX_LON);
    let lon: f64 = parse_value("prerender", key, value, &reason)?;
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(invalid("prerender", key, value, &reason));
    }
    Ok(lon)
}

fn parse_lat(key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let reason = format!("must be a latitude between {} and {}", MIN_LAT, MAX_LAT);
    let lat: f64 = parse_value("prerender", key, value, &reason)?;
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(invalid("prerender", key, value, &reason));
    }
    Ok(lat)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~/` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        ConfigFile::from_ini_str(content)
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[zoom]
min = 2
max = 18

[dirs]
tiles = /srv/tiles
expires = /srv/expires

[prerender]
min_zoom = 6
max_zoom = 16
zoom_prio = 12, 14,10
workers = 3
min_lon = 16.8
max_lon = 22.6
min_lat = 47.7
max_lat = 49.6

[render]
rerender_older_than_ms = 1600000000000
command = render-tile {zoom} {x} {y}

[expires]
interval_secs = 15

[logging]
file = /var/log/tilekeeper.log
"#,
        )
        .unwrap();

        assert_eq!(config.zoom.min, 2);
        assert_eq!(config.zoom.max, 18);
        assert_eq!(config.dirs.tiles, PathBuf::from("/srv/tiles"));
        assert_eq!(config.dirs.expires, PathBuf::from("/srv/expires"));
        assert_eq!(config.prerender.min_zoom, 6);
        assert_eq!(config.prerender.max_zoom, 16);
        assert_eq!(config.prerender.zoom_prio, vec![12, 14, 10]);
        assert_eq!(config.prerender.workers, Some(3));
        assert_eq!(config.prerender.min_lon, 16.8);
        assert_eq!(config.prerender.max_lat, 49.6);
        assert_eq!(config.render.rerender_older_than_ms, Some(1_600_000_000_000));
        assert_eq!(
            config.render.command.as_deref(),
            Some("render-tile {zoom} {x} {y}")
        );
        assert_eq!(config.expires.interval_secs, 15);
        assert_eq!(config.logging.file, PathBuf::from("/var/log/tilekeeper.log"));
    }

    #[test]
    fn test_partial_config() {
        let config = parse(
            r#"
[prerender]
max_zoom = 14
"#,
        )
        .unwrap();

        assert_eq!(config.prerender.max_zoom, 14);
        assert_eq!(config.prerender.min_zoom, DEFAULT_PRERENDER_MIN_ZOOM);
        assert_eq!(config.zoom.max, DEFAULT_MAX_ZOOM);
        assert_eq!(config.expires.interval_secs, DEFAULT_EXPIRES_INTERVAL_SECS);
    }

    #[test]
    fn test_zero_means_unset() {
        let config = parse(
            r#"
[prerender]
workers = 0

[render]
rerender_older_than_ms = 0
"#,
        )
        .unwrap();

        assert!(config.prerender.workers.is_none());
        assert!(config.render.rerender_older_than_ms.is_none());
    }

    #[test]
    fn test_invalid_zoom() {
        let err = parse("[zoom]\nmax = 40\n").unwrap_err();
        assert!(err.to_string().contains("zoom.max"));
        assert!(err.to_string().contains("between 0 and 29"));
    }

    #[test]
    fn test_inverted_zoom_range() {
        let err = parse("[zoom]\nmin = 15\nmax = 10\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "min"
        ));
    }

    #[test]
    fn test_invalid_zoom_prio_entry() {
        let err = parse("[prerender]\nzoom_prio = 12, high\n").unwrap_err();
        assert!(err.to_string().contains("prerender.zoom_prio"));
        assert!(err.to_string().contains("12, high"));
    }

    #[test]
    fn test_latitude_outside_mercator() {
        let err = parse("[prerender]\nmax_lat = 89\n").unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_longitude_out_of_range() {
        let err = parse("[prerender]\nmin_lon = -181\n").unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_inverted_bbox() {
        let err = parse("[prerender]\nmin_lon = 20\nmax_lon = 10\n").unwrap_err();
        assert!(err.to_string().contains("prerender.min_lon"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(parse("[expires]\ninterval_secs = 0\n").is_err());
    }

    #[test]
    fn test_empty_command_ignored() {
        let config = parse("[render]\ncommand =   \n").unwrap();
        assert!(config.render.command.is_none());
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/tiles");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("tiles"));
        }
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
