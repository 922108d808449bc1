//! Export Pipeline Contract Tests
//!
//! A recording render target checks step ordering and URL cleanup; the
//! native host checks the real SVG -> PNG path end to end.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::json;

use huntcraft_core::{
    codes::{CodeMatrixEncoder, CodeMount},
    render_target::{Blob, DownloadTrigger, RenderTarget},
    AssetExportPipeline, CodeAsset, ExportError, ExportSettings, HuntBundle, NativeHost, QrSvgEncoder,
};

#[derive(Default)]
struct RecordingTarget {
    mounted: Vec<String>,
    fail_decode: bool,
    created: AtomicUsize,
    revoked: AtomicUsize,
    downloads: Mutex<Vec<DownloadTrigger>>,
}

impl RecordingTarget {
    fn with_anchor(anchor: &str) -> Self {
        Self {
            mounted: vec![anchor.to_string()],
            ..Default::default()
        }
    }
}

impl RenderTarget for RecordingTarget {
    type Element = String;
    type Image = (u32, u32);
    type Surface = (u32, u32);

    fn resolve_element(&self, anchor_id: &str) -> Option<String> {
        self.mounted.iter().find(|a| *a == anchor_id).cloned()
    }

    fn serialize_subtree(&self, _element: &String) -> Result<String, ExportError> {
        Ok(r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="48"/>"#.to_string())
    }

    fn create_object_url(&self, blob: Blob) -> String {
        assert_eq!(blob.mime, "image/svg+xml;charset=utf-8");
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        format!("blob:test/{}", n)
    }

    fn revoke_object_url(&self, _url: &str) {
        self.revoked.fetch_add(1, Ordering::SeqCst);
    }

    async fn decode_image(&self, _url: &str) -> Result<(u32, u32), ExportError> {
        if self.fail_decode {
            return Err(ExportError::Rasterization("corrupt image".into()));
        }
        Ok((64, 48))
    }

    fn intrinsic_size(&self, image: &(u32, u32)) -> (u32, u32) {
        *image
    }

    fn create_surface(&self, width: u32, height: u32) -> Result<(u32, u32), ExportError> {
        Ok((width, height))
    }

    fn draw_image(&self, surface: &mut (u32, u32), image: &(u32, u32)) {
        assert_eq!(*surface, *image);
    }

    fn encode_png(&self, _surface: &(u32, u32)) -> Result<Vec<u8>, ExportError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn trigger_download(&self, trigger: DownloadTrigger) -> Result<Option<PathBuf>, ExportError> {
        self.downloads.lock().unwrap().push(trigger);
        Ok(None)
    }
}

#[tokio::test]
async fn missing_anchor_is_asset_not_found() {
    let pipeline = AssetExportPipeline::new(RecordingTarget::default());

    let result = pipeline.export_as_raster("qr-code-1-9", "Gate").await;

    assert!(matches!(result, Err(ExportError::AssetNotFound(ref id)) if id == "qr-code-1-9"));
    let target = pipeline.target();
    assert!(target.downloads.lock().unwrap().is_empty());
    assert_eq!(target.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_export_downloads_once_and_revokes_once() {
    let pipeline = AssetExportPipeline::new(RecordingTarget::with_anchor("qr-code-1-2"));

    let file = pipeline.export_as_raster("qr-code-1-2", "North Gate").await.unwrap();

    assert_eq!(file.filename, "North_Gate.png");
    assert_eq!(file.size, [64, 48]);
    let target = pipeline.target();
    assert_eq!(target.created.load(Ordering::SeqCst), 1);
    assert_eq!(target.revoked.load(Ordering::SeqCst), 1);

    let downloads = target.downloads.lock().unwrap();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].filename, "North_Gate.png");
    assert!(downloads[0].href.starts_with("data:image/png;base64,"));
    assert_eq!(downloads[0].payload().unwrap(), vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn decode_failure_revokes_url_and_produces_no_file() {
    let target = RecordingTarget {
        fail_decode: true,
        ..RecordingTarget::with_anchor("qr-code-1-2")
    };
    let pipeline = AssetExportPipeline::new(target);

    let result = pipeline.export_as_raster("qr-code-1-2", "Gate").await;

    assert!(matches!(result, Err(ExportError::Rasterization(_))));
    let target = pipeline.target();
    assert_eq!(target.created.load(Ordering::SeqCst), 1);
    assert_eq!(target.revoked.load(Ordering::SeqCst), 1);
    assert!(target.downloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_exports_each_get_their_own_url() {
    let pipeline = AssetExportPipeline::new(RecordingTarget::with_anchor("qr-code-1-2"));

    let (a, b) = tokio::join!(
        pipeline.export_as_raster("qr-code-1-2", "Gate"),
        pipeline.export_as_raster("qr-code-1-2", "Gate"),
    );

    assert!(a.is_ok() && b.is_ok());
    let target = pipeline.target();
    assert_eq!(target.created.load(Ordering::SeqCst), 2);
    assert_eq!(target.revoked.load(Ordering::SeqCst), 2);
    assert_eq!(target.downloads.lock().unwrap().len(), 2);
}

fn native_host(dir: &tempfile::TempDir) -> NativeHost {
    NativeHost::new(ExportSettings {
        code_size: 300,
        output_dir: dir.path().to_path_buf(),
        ..ExportSettings::default()
    })
}

#[tokio::test]
async fn native_export_writes_png_at_intrinsic_size() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = AssetExportPipeline::new(native_host(&dir));

    let asset = CodeAsset::for_location(4, 17, 300);
    let code = QrSvgEncoder.encode_asset(&asset).unwrap();
    pipeline.target().mount(&asset.dom_anchor_id, code);

    let file = pipeline
        .export_as_raster(&asset.dom_anchor_id, "Old Mill")
        .await
        .unwrap();

    assert_eq!(file.filename, "Old_Mill.png");
    assert_eq!(file.size, [300, 300]);

    let path = dir.path().join("Old_Mill.png");
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    assert_eq!(file.sha256, huntcraft_core::sha256_hex(&bytes));
    assert_eq!(pipeline.target().live_object_urls(), 0);
    assert_eq!(pipeline.target().downloads(), vec![path]);
}

#[tokio::test]
async fn native_decode_failure_leaks_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = AssetExportPipeline::new(native_host(&dir));
    pipeline.target().mount(
        "qr-code-1-1",
        huntcraft_core::VectorCode {
            markup: "<svg <<< not xml".to_string(),
        },
    );

    let result = pipeline.export_as_raster("qr-code-1-1", "Broken").await;

    assert!(matches!(result, Err(ExportError::Rasterization(_))));
    assert_eq!(pipeline.target().live_object_urls(), 0);
    assert!(pipeline.target().downloads().is_empty());
}

#[tokio::test]
async fn export_all_builds_manifest_in_project_order() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = AssetExportPipeline::new(native_host(&dir));
    let hunt: HuntBundle = serde_json::from_value(json!({
        "project": {"id": 8},
        "locations": [
            {"id": 2, "project_id": 8, "location_name": "Clock Tower"},
            {"id": 1, "project_id": 8, "location_name": "Boat Shed"}
        ]
    }))
    .unwrap();

    let manifest = pipeline.export_all(&QrSvgEncoder, &hunt, 200).await.unwrap();

    assert_eq!(manifest.project_id, 8);
    assert!(manifest.failures.is_empty());
    let names: Vec<_> = manifest.files.iter().map(|f| f.file.filename.as_str()).collect();
    assert_eq!(names, vec!["Clock_Tower.png", "Boat_Shed.png"]);
    assert_eq!(manifest.files[0].file.anchor_id, "qr-code-8-2");
    assert!(manifest.files.iter().all(|f| f.file.size == [200, 200]));
    assert_eq!(manifest.manifest_hash.len(), 64);
    assert!(dir.path().join("Boat_Shed.png").exists());
    assert_eq!(pipeline.target().live_object_urls(), 0);
}

#[tokio::test]
async fn export_all_skips_locations_from_other_projects() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = AssetExportPipeline::new(native_host(&dir));
    let hunt: HuntBundle = serde_json::from_value(json!({
        "project": {"id": 8},
        "locations": [
            {"id": 1, "project_id": 8, "location_name": "Boat Shed"},
            {"id": 5, "project_id": 3, "location_name": "Elsewhere"}
        ]
    }))
    .unwrap();

    let manifest = pipeline.export_all(&QrSvgEncoder, &hunt, 120).await.unwrap();

    let ids: Vec<_> = manifest.files.iter().map(|f| f.location_id).collect();
    assert_eq!(ids, vec![1]);
    assert!(manifest.failures.is_empty());
    assert!(!dir.path().join("Elsewhere.png").exists());
    assert!(hunt.owned_location(5).is_none());
}
