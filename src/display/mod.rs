//! Display subsystem: the two-line character display interface and the
//! interruptible transition renderer.

pub mod interface;
pub mod transition;
