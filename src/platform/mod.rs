//! Platform abstraction (clipboard).

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::copy_to_clipboard;

/// Without a native clipboard backend nothing is copied.
#[cfg(not(feature = "native"))]
pub fn copy_to_clipboard(_content: &str) -> bool {
    false
}
