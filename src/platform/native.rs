//! Native clipboard via copypasta.

use copypasta::{ClipboardContext, ClipboardProvider};

/// Copy text to the system clipboard. Returns false when no clipboard is
/// reachable (headless session, missing X/Wayland server).
pub fn copy_to_clipboard(content: &str) -> bool {
    match ClipboardContext::new() {
        Ok(mut ctx) => match ctx.set_contents(content.to_string()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[clipboard] set failed: {e}");
                false
            }
        },
        Err(e) => {
            log::warn!("[clipboard] unavailable: {e}");
            false
        }
    }
}
