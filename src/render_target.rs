//! Render Target - the host capabilities the export pipeline needs
//!
//! The pipeline never touches a document directly. Everything host-specific
//! (element lookup, markup serialization, temporary URLs, image decode,
//! off-screen drawing, file download) goes through [`RenderTarget`].

use base64::Engine;
use std::future::Future;
use std::path::PathBuf;

use crate::export::ExportError;

pub const SVG_MIME: &str = "image/svg+xml;charset=utf-8";
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Binary payload handed to the host in exchange for a temporary URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: &'static str,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn svg(markup: String) -> Self {
        Self {
            mime: SVG_MIME,
            data: markup.into_bytes(),
        }
    }
}

/// A transient download link: created, activated once, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTrigger {
    pub href: String,
    pub filename: String,
}

impl DownloadTrigger {
    pub fn png(png: &[u8], filename: String) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        Self {
            href: format!("{}{}", PNG_DATA_URL_PREFIX, encoded),
            filename,
        }
    }

    /// Bytes behind a PNG data URL href.
    pub fn payload(&self) -> Result<Vec<u8>, ExportError> {
        let encoded = self
            .href
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| ExportError::Download(format!("unsupported href for {}", self.filename)))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ExportError::Download(e.to_string()))
    }
}

pub trait RenderTarget: Sync {
    /// A mounted vector element.
    type Element;
    /// A decoded image with a known intrinsic size.
    type Image: Send;
    /// An off-screen raster surface.
    type Surface;

    fn resolve_element(&self, anchor_id: &str) -> Option<Self::Element>;

    /// Self-contained markup with computed colours frozen in.
    fn serialize_subtree(&self, element: &Self::Element) -> Result<String, ExportError>;

    fn create_object_url(&self, blob: Blob) -> String;

    fn revoke_object_url(&self, url: &str);

    fn decode_image(&self, url: &str) -> impl Future<Output = Result<Self::Image, ExportError>> + Send;

    fn intrinsic_size(&self, image: &Self::Image) -> (u32, u32);

    fn create_surface(&self, width: u32, height: u32) -> Result<Self::Surface, ExportError>;

    /// Draw `image` unscaled with its top-left corner at (0, 0).
    fn draw_image(&self, surface: &mut Self::Surface, image: &Self::Image);

    fn encode_png(&self, surface: &Self::Surface) -> Result<Vec<u8>, ExportError>;

    /// Activate the trigger. Returns where the file ended up, if the host knows.
    fn trigger_download(&self, trigger: DownloadTrigger) -> Result<Option<PathBuf>, ExportError>;
}

/// Revokes its temporary URL when dropped, on success and failure alike.
pub struct ObjectUrlGuard<'a, T: RenderTarget> {
    target: &'a T,
    url: String,
}

impl<'a, T: RenderTarget> ObjectUrlGuard<'a, T> {
    pub fn create(target: &'a T, blob: Blob) -> Self {
        let url = target.create_object_url(blob);
        Self { target, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<T: RenderTarget> Drop for ObjectUrlGuard<'_, T> {
    fn drop(&mut self) {
        self.target.revoke_object_url(&self.url);
    }
}
