//! Location Codes - what gets encoded and where it is mounted
//!
//! The matrix encoding itself is delegated to a [`CodeMatrixEncoder`]; this
//! module only decides the payload, the anchor id and the pixel size.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{LocationId, ProjectId};

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Code pixel size must be positive")]
    ZeroSize,

    #[error("Payload cannot be encoded: {0}")]
    Encoding(String),
}

/// One location's code, produced per render pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAsset {
    pub payload: String,
    pub pixel_size: u32,
    pub dom_anchor_id: String,
}

impl CodeAsset {
    pub fn for_location(project_id: ProjectId, location_id: LocationId, pixel_size: u32) -> Self {
        Self {
            payload: format!("{},{}", project_id, location_id),
            pixel_size,
            dom_anchor_id: anchor_id(project_id, location_id),
        }
    }
}

pub fn anchor_id(project_id: ProjectId, location_id: LocationId) -> String {
    format!("qr-code-{}-{}", project_id, location_id)
}

/// Scalable markup for a code. Colours may reference `currentColor`, which
/// the host resolves when the markup is serialized for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorCode {
    pub markup: String,
}

pub trait CodeMatrixEncoder {
    fn encode(&self, payload: &str, pixel_size: u32) -> Result<VectorCode, CodeError>;

    fn encode_asset(&self, asset: &CodeAsset) -> Result<VectorCode, CodeError> {
        self.encode(&asset.payload, asset.pixel_size)
    }
}

/// QR encoder with a transparent background and a `currentColor` foreground.
///
/// No quiet zone, and the root `<svg>` is exactly `pixel_size` square with
/// the module grid kept in its `viewBox`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrSvgEncoder;

impl CodeMatrixEncoder for QrSvgEncoder {
    fn encode(&self, payload: &str, pixel_size: u32) -> Result<VectorCode, CodeError> {
        use qrcode::render::svg;
        use qrcode::QrCode;

        if pixel_size == 0 {
            return Err(CodeError::ZeroSize);
        }

        let code = QrCode::new(payload.as_bytes()).map_err(|e| CodeError::Encoding(e.to_string()))?;
        let markup = code
            .render::<svg::Color>()
            .quiet_zone(false)
            .module_dimensions(1, 1)
            .dark_color(svg::Color("currentColor"))
            .light_color(svg::Color("transparent"))
            .build();

        Ok(VectorCode {
            markup: pin_root_size(&markup, pixel_size)?,
        })
    }
}

/// Set `width` and `height` on the root `<svg>` tag, leaving `viewBox` alone.
fn pin_root_size(markup: &str, pixel_size: u32) -> Result<String, CodeError> {
    let start = markup
        .find("<svg")
        .ok_or_else(|| CodeError::Encoding("encoder output has no <svg> root".into()))?;
    let end = markup[start..]
        .find('>')
        .map(|i| start + i)
        .ok_or_else(|| CodeError::Encoding("unterminated <svg> tag".into()))?;

    let size = pixel_size.to_string();
    let tag = set_attr(&markup[start..end], "width", &size);
    let tag = set_attr(&tag, "height", &size);
    Ok(format!("{}{}{}", &markup[..start], tag, &markup[end..]))
}

fn set_attr(tag: &str, name: &str, value: &str) -> String {
    let needle = format!(" {}=\"", name);
    match tag.find(&needle) {
        Some(at) => {
            let value_start = at + needle.len();
            let value_end = tag[value_start..]
                .find('"')
                .map_or(tag.len(), |i| value_start + i);
            format!("{}{}{}", &tag[..value_start], value, &tag[value_end..])
        }
        None => {
            let trimmed = tag.trim_end_matches('/');
            format!("{} {}=\"{}\"{}", trimmed, name, value, &tag[trimmed.len()..])
        }
    }
}

/// Mounting point for rendered codes, as provided by the view layer.
pub trait CodeMount {
    fn mount(&self, anchor_id: &str, code: VectorCode);
    fn unmount(&self, anchor_id: &str) -> bool;
}
