//! Contract with the external audio pipeline.
//!
//! The conversion core never touches audio itself. It resolves the music file
//! path and the preview window ([`crate::chart::model::PreviewWindow`]) from
//! the chart header and hands those numbers to an implementation of
//! [`AudioPipeline`] supplied by the packaging layer; the encoded results are
//! opaque blobs to this crate.

use std::path::Path;

use crate::chart::model::PreviewWindow;

/// The two encode operations the packaging layer must provide.
pub trait AudioPipeline {
    /// Error type of the underlying encoder.
    type Error;

    /// Transcodes the whole music file into the engine's audio format.
    ///
    /// # Errors
    ///
    /// Propagates whatever the underlying encoder reports.
    fn transcode(&self, source: &Path) -> Result<Vec<u8>, Self::Error>;

    /// Encodes the preview clip of `window` out of the music file.
    ///
    /// # Errors
    ///
    /// Propagates whatever the underlying encoder reports.
    fn encode_preview(&self, source: &Path, window: PreviewWindow)
    -> Result<Vec<u8>, Self::Error>;
}
