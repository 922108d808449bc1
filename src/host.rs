//! Native Host - an in-process stand-in for the browser document
//!
//! Codes are mounted by anchor id, temporary URLs map to in-memory blobs,
//! SVG is decoded with usvg, drawn with resvg onto a tiny-skia pixmap, and
//! downloads land as files in the configured output directory.

use resvg::{tiny_skia, usvg};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

use crate::codes::{CodeMount, VectorCode};
use crate::config::ExportSettings;
use crate::export::ExportError;
use crate::render_target::{Blob, DownloadTrigger, RenderTarget};

/// A code as mounted in the document, with the colour it currently inherits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedCode {
    pub markup: String,
    pub color: String,
}

pub struct NativeHost {
    settings: ExportSettings,
    elements: RwLock<HashMap<String, MountedCode>>,
    blobs: Mutex<HashMap<String, Blob>>,
    next_url: AtomicU64,
    downloads: Mutex<Vec<PathBuf>>,
}

impl NativeHost {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            elements: RwLock::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            next_url: AtomicU64::new(1),
            downloads: Mutex::new(vec![]),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Temporary URLs created and not yet revoked.
    pub fn live_object_urls(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn freeze_colors(&self, code: &MountedCode) -> String {
        let background = self.settings.background.as_deref().unwrap_or("none");
        code.markup
            .replace("currentColor", &code.color)
            .replace("\"transparent\"", &format!("\"{}\"", background))
    }
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new(ExportSettings::default())
    }
}

impl CodeMount for NativeHost {
    fn mount(&self, anchor_id: &str, code: VectorCode) {
        let mounted = MountedCode {
            markup: code.markup,
            color: self.settings.foreground.clone(),
        };
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(anchor_id.to_string(), mounted);
    }

    fn unmount(&self, anchor_id: &str) -> bool {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(anchor_id)
            .is_some()
    }
}

impl RenderTarget for NativeHost {
    type Element = MountedCode;
    type Image = usvg::Tree;
    type Surface = tiny_skia::Pixmap;

    fn resolve_element(&self, anchor_id: &str) -> Option<MountedCode> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(anchor_id)
            .cloned()
    }

    fn serialize_subtree(&self, element: &MountedCode) -> Result<String, ExportError> {
        if !element.markup.contains("<svg") {
            return Err(ExportError::Serialization("mounted element holds no <svg>".into()));
        }
        Ok(self.freeze_colors(element))
    }

    fn create_object_url(&self, blob: Blob) -> String {
        let url = format!("blob:huntcraft/{}", self.next_url.fetch_add(1, Ordering::Relaxed));
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), blob);
        url
    }

    fn revoke_object_url(&self, url: &str) {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url);
    }

    async fn decode_image(&self, url: &str) -> Result<usvg::Tree, ExportError> {
        let data = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| ExportError::Rasterization(format!("unknown object url {}", url)))?;

        tokio::task::spawn_blocking(move || usvg::Tree::from_data(&data, &usvg::Options::default()))
            .await
            .map_err(|e| ExportError::Rasterization(e.to_string()))?
            .map_err(|e| ExportError::Rasterization(e.to_string()))
    }

    fn intrinsic_size(&self, image: &usvg::Tree) -> (u32, u32) {
        let size = image.size();
        (size.width().ceil() as u32, size.height().ceil() as u32)
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<tiny_skia::Pixmap, ExportError> {
        tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| ExportError::Rasterization(format!("cannot allocate {}x{} surface", width, height)))
    }

    fn draw_image(&self, surface: &mut tiny_skia::Pixmap, image: &usvg::Tree) {
        resvg::render(image, tiny_skia::Transform::identity(), &mut surface.as_mut());
    }

    fn encode_png(&self, surface: &tiny_skia::Pixmap) -> Result<Vec<u8>, ExportError> {
        surface.encode_png().map_err(|e| ExportError::Encode(e.to_string()))
    }

    fn trigger_download(&self, trigger: DownloadTrigger) -> Result<Option<PathBuf>, ExportError> {
        let bytes = trigger.payload()?;
        let dir = &self.settings.output_dir;
        fs::create_dir_all(dir).map_err(|e| ExportError::Download(format!("{}: {}", dir.display(), e)))?;

        let path = dir.join(&trigger.filename);
        fs::write(&path, bytes).map_err(|e| ExportError::Download(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "download written");

        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_freezes_current_color() {
        let settings = ExportSettings {
            foreground: "#123456".to_string(),
            ..ExportSettings::default()
        };
        let host = NativeHost::new(settings);
        host.mount(
            "qr-code-1-2",
            VectorCode {
                markup: r#"<svg xmlns="http://www.w3.org/2000/svg"><rect fill="transparent"/><path fill="currentColor"/></svg>"#.to_string(),
            },
        );

        let element = host.resolve_element("qr-code-1-2").unwrap();
        let markup = host.serialize_subtree(&element).unwrap();
        assert!(markup.contains(r##"fill="#123456""##));
        assert!(markup.contains(r#"fill="none""#));
        assert!(!markup.contains("currentColor"));
    }

    #[test]
    fn test_object_urls_are_tracked() {
        let host = NativeHost::default();
        let a = host.create_object_url(Blob::svg("<svg/>".into()));
        let b = host.create_object_url(Blob::svg("<svg/>".into()));
        assert_ne!(a, b);
        assert_eq!(host.live_object_urls(), 2);
        host.revoke_object_url(&a);
        assert_eq!(host.live_object_urls(), 1);
    }

    #[test]
    fn test_unmount() {
        let host = NativeHost::default();
        host.mount("a", VectorCode { markup: "<svg/>".into() });
        assert!(host.unmount("a"));
        assert!(host.resolve_element("a").is_none());
    }
}
