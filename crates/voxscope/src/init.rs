//! Process-level setup.

use voxscope_core::{Options, VolumeSource};

use crate::Result;

/// Installs the logger. Honors `RUST_LOG`; calling it twice is harmless.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Opens the viewer window and blocks until it is closed.
///
/// Fails if no window or graphics context can be created. Problems with the
/// volume itself are logged and leave an empty viewer open.
pub fn show(options: Options, source: Option<VolumeSource>) -> Result<()> {
    init();
    crate::app::run_app(options.sanitized(), source)
}
