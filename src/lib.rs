//! Huntcraft Core - Scavenger Hunt Preview & Code Export
//!
//! Two subsystems live here:
//! 1. The preview player: location selection, visited set, running score
//! 2. The code export pipeline: vector location code in, PNG download out
//!
//! Everything around them (routing, CRUD forms, REST calls) is an external
//! collaborator that hands us already-fetched [`HuntBundle`]s.

pub mod model;
pub mod session;
pub mod scoring;
pub mod player;
pub mod codes;
pub mod render_target;
pub mod host;
pub mod export;
pub mod validation;
pub mod hashing;
pub mod config;

pub use model::{HomescreenDisplay, HuntBundle, Location, LocationId, LocationTrigger, ParticipantScoring, Project, ProjectId};
pub use session::PlayerSession;
pub use scoring::{apply_visit, max_score};
pub use player::{HomeContent, PlayerState, PreviewPlayer, Progress, Screen, SelectOutcome};
pub use codes::{CodeAsset, CodeMatrixEncoder, QrSvgEncoder, VectorCode};
pub use render_target::{Blob, DownloadTrigger, ObjectUrlGuard, RenderTarget};
pub use host::NativeHost;
pub use export::{AssetExportPipeline, ExportError, ExportManifest, ExportedFile};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use hashing::{canonical_json, compute_manifest_hash, sha256_hex};
pub use config::ExportSettings;

pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pixel size the operator view renders location codes at.
pub const DEFAULT_CODE_SIZE: u32 = 1200;
