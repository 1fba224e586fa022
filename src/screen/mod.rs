//! Screen geometry module
//!
//! Supplies the origin, size and pointer position reported to the primary
//! in reply to a screen info query.

use thiserror::Error;

/// Errors querying the local display
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("No display available: {0}")]
    Unavailable(String),
}

/// Geometry of the secondary screen as reported in `DInfo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    /// Leftmost pixel
    pub x: i32,
    /// Topmost pixel
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Current pointer position
    pub cursor_x: i32,
    pub cursor_y: i32,
}

impl ScreenGeometry {
    /// Geometry with the pointer at the centre of the screen
    pub fn centered(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            cursor_x: x.saturating_add(width / 2),
            cursor_y: y.saturating_add(height / 2),
        }
    }
}

/// Source of display geometry
pub trait DisplayGeometry: Send + Sync {
    fn geometry(&self) -> Result<ScreenGeometry, DisplayError>;
}

/// Fixed geometry, from configuration or the platform default
#[derive(Debug, Clone)]
pub struct StaticDisplay {
    geometry: ScreenGeometry,
}

impl StaticDisplay {
    pub fn new(geometry: ScreenGeometry) -> Self {
        Self { geometry }
    }

    /// Platform default dimensions with any configured overrides applied
    pub fn from_overrides(
        x: Option<i32>,
        y: Option<i32>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        let (default_width, default_height) = get_screen_dimensions();
        let width = width.unwrap_or(default_width);
        let height = height.unwrap_or(default_height);
        Self::new(ScreenGeometry::centered(
            x.unwrap_or(0),
            y.unwrap_or(0),
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        ))
    }
}

impl DisplayGeometry for StaticDisplay {
    fn geometry(&self) -> Result<ScreenGeometry, DisplayError> {
        Ok(self.geometry)
    }
}

/// Get the screen dimensions for the current platform
#[cfg(target_os = "macos")]
pub fn get_screen_dimensions() -> (u32, u32) {
    (2560, 1600)
}

#[cfg(target_os = "windows")]
pub fn get_screen_dimensions() -> (u32, u32) {
    (1920, 1080)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn get_screen_dimensions() -> (u32, u32) {
    (1920, 1080)
}
