//! Engine-wide defaults. Keeping them in a single place makes it easier to
//! point the library at a different engine build or style server.

/// Stylesheet the engine needs on the page before a map can render.
pub const DEFAULT_CSS_FILE: &str = "//api.tiles.mapbox.com/mapbox-gl-js/v1.6.1/mapbox-gl.css";

/// Fixed identifier the shared stylesheet is registered under. One
/// stylesheet per identifier per process, reused by every map handle.
pub const STYLESHEET_ID: &str = "MAPBOX_GL_CSS_LINK";

/// Style used when the options do not name one.
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/outdoors-v11";

/// Initial center (lng, lat).
pub const DEFAULT_CENTER: (f64, f64) = (-68.2954881, 44.3420759);

/// Initial zoom level.
pub const DEFAULT_ZOOM: f64 = 9.0;

/// Layout property toggled by the visibility sync.
pub const VISIBILITY_PROPERTY: &str = "visibility";

/// Layout property naming the image a symbol layer draws.
pub const ICON_IMAGE_PROPERTY: &str = "icon-image";
