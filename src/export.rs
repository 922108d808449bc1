//! Asset Export Pipeline - vector location code to downloadable PNG
//!
//! Order of operations per export:
//! 1. Resolve the mounted code element (missing -> AssetNotFound)
//! 2. Serialize it with colours frozen
//! 3. Wrap the markup in an SVG blob behind a temporary URL
//! 4. Decode the URL into an image (the only await point)
//! 5-6. Draw it unscaled onto a surface of exactly its intrinsic size
//! 7. Encode the surface as a PNG data URL
//! 8. Fire a one-shot download trigger
//! 9. Revoke the temporary URL (guarded, runs on every exit path)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::codes::{CodeAsset, CodeError, CodeMatrixEncoder, CodeMount};
use crate::hashing::{compute_manifest_hash, sha256_hex};
use crate::model::{HuntBundle, Location, LocationId, ProjectId};
use crate::render_target::{Blob, DownloadTrigger, ObjectUrlGuard, RenderTarget};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Code element not found: {0}")]
    AssetNotFound(String),

    #[error("Could not serialize code element: {0}")]
    Serialization(String),

    #[error("Rasterization failed: {0}")]
    Rasterization(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Code generation failed: {0}")]
    Code(#[from] CodeError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub anchor_id: String,
    pub filename: String,
    pub size: [u32; 2],
    pub sha256: String,
    #[serde(default)]
    pub saved_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub location_id: LocationId,
    #[serde(flatten)]
    pub file: ExportedFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFailure {
    pub location_id: LocationId,
    pub error: String,
}

/// Record of one batch export over a whole project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub id: String,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub files: Vec<ManifestEntry>,
    pub failures: Vec<ExportFailure>,
    pub manifest_hash: String,
}

/// `"North Gate"` -> `"North_Gate.png"`
pub fn export_filename(file_base_name: &str) -> String {
    format!("{}.png", file_base_name.replace(' ', "_"))
}

/// Base name for a location's file; unnamed locations fall back to their id.
pub fn location_base_name(location: &Location) -> String {
    match location.name() {
        Some(name) => name.to_string(),
        None => format!("location-{}", location.id),
    }
}

pub struct AssetExportPipeline<T: RenderTarget> {
    target: T,
}

impl<T: RenderTarget> AssetExportPipeline<T> {
    pub fn new(target: T) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Export the code mounted at `anchor_id` as `<file_base_name>.png`.
    ///
    /// Concurrent calls share no state beyond the host; each gets its own
    /// temporary URL and surface.
    pub async fn export_as_raster(
        &self,
        anchor_id: &str,
        file_base_name: &str,
    ) -> Result<ExportedFile, ExportError> {
        let result = self.rasterize_and_download(anchor_id, file_base_name).await;
        match &result {
            Ok(file) => info!(anchor_id, filename = %file.filename, "code exported"),
            Err(e @ ExportError::AssetNotFound(_)) => warn!(anchor_id, "{}", e),
            Err(e) => error!(anchor_id, "{}", e),
        }
        result
    }

    async fn rasterize_and_download(
        &self,
        anchor_id: &str,
        file_base_name: &str,
    ) -> Result<ExportedFile, ExportError> {
        let element = self
            .target
            .resolve_element(anchor_id)
            .ok_or_else(|| ExportError::AssetNotFound(anchor_id.to_string()))?;

        let markup = self.target.serialize_subtree(&element)?;

        let url = ObjectUrlGuard::create(&self.target, Blob::svg(markup));
        let image = self.target.decode_image(url.url()).await?;

        let (width, height) = self.target.intrinsic_size(&image);
        let mut surface = self.target.create_surface(width, height)?;
        self.target.draw_image(&mut surface, &image);
        let png = self.target.encode_png(&surface)?;
        debug!(anchor_id, width, height, bytes = png.len(), "code rasterized");

        let filename = export_filename(file_base_name);
        let sha256 = sha256_hex(&png);
        let saved_to = self
            .target
            .trigger_download(DownloadTrigger::png(&png, filename.clone()))?;

        Ok(ExportedFile {
            anchor_id: anchor_id.to_string(),
            filename,
            size: [width, height],
            sha256,
            saved_to: saved_to.map(|p| p.display().to_string()),
        })
    }

    /// Export one location's code, looked up by its project-scoped anchor.
    pub async fn export_location(
        &self,
        project_id: ProjectId,
        location: &Location,
    ) -> Result<ExportedFile, ExportError> {
        let anchor_id = crate::codes::anchor_id(project_id, location.id);
        self.export_as_raster(&anchor_id, &location_base_name(location)).await
    }
}

impl<T: RenderTarget + CodeMount> AssetExportPipeline<T> {
    /// Render and export every location's code in project order. Rows that
    /// belong to another project are skipped.
    ///
    /// A failing location is recorded in the manifest and the batch moves on.
    pub async fn export_all<E: CodeMatrixEncoder>(
        &self,
        encoder: &E,
        hunt: &HuntBundle,
        code_size: u32,
    ) -> Result<ExportManifest, ExportError> {
        let project_id = hunt.project.id;
        let mut files = vec![];
        let mut failures = vec![];

        for location in hunt.owned_locations() {
            let asset = CodeAsset::for_location(project_id, location.id, code_size);
            let result = match encoder.encode_asset(&asset) {
                Ok(code) => {
                    self.target.mount(&asset.dom_anchor_id, code);
                    let exported = self.export_location(project_id, location).await;
                    self.target.unmount(&asset.dom_anchor_id);
                    exported
                }
                Err(e) => Err(ExportError::from(e)),
            };

            match result {
                Ok(file) => files.push(ManifestEntry {
                    location_id: location.id,
                    file,
                }),
                Err(e) => {
                    warn!(location_id = location.id, "skipping location: {}", e);
                    failures.push(ExportFailure {
                        location_id: location.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut manifest = ExportManifest {
            id: Uuid::new_v4().to_string(),
            project_id,
            created_at: Utc::now(),
            files,
            failures,
            manifest_hash: String::new(),
        };
        manifest.manifest_hash = compute_manifest_hash(&manifest)?;

        info!(
            project_id,
            exported = manifest.files.len(),
            failed = manifest.failures.len(),
            "batch export finished"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename_replaces_spaces() {
        assert_eq!(export_filename("North Gate  East"), "North_Gate__East.png");
        assert_eq!(export_filename("Gate"), "Gate.png");
    }

    #[test]
    fn test_unnamed_location_base_name() {
        let location: Location =
            serde_json::from_value(serde_json::json!({"id": 9, "project_id": 1})).unwrap();
        assert_eq!(location_base_name(&location), "location-9");
    }
}
