// ============================================================================
// PIXEL DATA I/O - wire codec, save/fetch contract, grid files
// ============================================================================

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canvas::{Cell, PixelGrid};
use crate::components::colors::hex_to_rgb;
use crate::error::{BoardError, Result};
use crate::{log_info, log_warn};

/// Decode pixel data as it arrives from storage or the fetch endpoint.
///
/// Accepts an already-parsed object or a string holding the JSON once more.
/// Never fails: anything unusable yields an empty grid, and individual
/// entries with a bad key or color are skipped.  Problems are logged.
pub fn decode_pixel_data(value: &Value) -> PixelGrid {
    match value {
        Value::Object(map) => decode_entries(map),
        Value::String(s) => decode_pixel_data_str(s),
        Value::Null => PixelGrid::new(),
        other => {
            log_warn!("Pixel data is not an object ({}); using empty grid", type_name(other));
            PixelGrid::new()
        }
    }
}

/// String form of [`decode_pixel_data`].
pub fn decode_pixel_data_str(s: &str) -> PixelGrid {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => decode_entries(&map),
        Ok(other) => {
            log_warn!("Pixel data is not an object ({}); using empty grid", type_name(&other));
            PixelGrid::new()
        }
        Err(e) => {
            log_warn!("Malformed pixel data JSON: {}; using empty grid", e);
            PixelGrid::new()
        }
    }
}

fn decode_entries(map: &serde_json::Map<String, Value>) -> PixelGrid {
    let mut skipped = 0usize;
    let grid: PixelGrid = map
        .iter()
        .filter_map(|(key, color)| {
            let entry = Cell::from_key(key)
                .zip(color.as_str().and_then(|s| hex_to_rgb(s).ok()));
            if entry.is_none() {
                skipped += 1;
            }
            entry
        })
        .collect();
    if skipped > 0 {
        log_warn!("Skipped {} malformed pixel entries", skipped);
    }
    grid
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serialize a grid to the `{"x,y": "#rrggbb"}` wire string.
pub fn encode_pixel_data(grid: &PixelGrid) -> Result<String> {
    Ok(serde_json::to_string(grid)?)
}

// ============================================================================
// SAVE / FETCH CONTRACT
// ============================================================================

/// A stored design as returned by the fetch endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    #[serde(default)]
    pub design_id: Option<u64>,
    #[serde(default)]
    pub title: String,
    /// Object or JSON string; see [`decode_pixel_data`].
    #[serde(default)]
    pub pixel_data: Value,
}

impl DesignRecord {
    pub fn grid(&self) -> PixelGrid {
        decode_pixel_data(&self.pixel_data)
    }
}

/// What gets sent to the save endpoint.  `pixel_data` is the stringified
/// grid, as in the multipart form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    /// New design owned by `owner_id`.
    Create {
        title: String,
        pixel_data: String,
        owner_id: String,
    },
    /// Overwrite image and title of an existing design.
    Update {
        design_id: u64,
        title: String,
        pixel_data: String,
    },
}

impl Submission {
    pub fn title(&self) -> &str {
        match self {
            Submission::Create { title, .. } | Submission::Update { title, .. } => title,
        }
    }

    pub fn pixel_data(&self) -> &str {
        match self {
            Submission::Create { pixel_data, .. } | Submission::Update { pixel_data, .. } => {
                pixel_data
            }
        }
    }
}

/// Backend reply to a submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(BoardError::Rejected(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

/// The networked collaborator that stores designs.  The transport (HTTP,
/// auth, multipart) lives behind this trait.
pub trait DesignBackend {
    fn submit(&mut self, submission: &Submission) -> SaveOutcome;
    fn fetch(&self, design_id: u64) -> Result<DesignRecord>;
}

// ============================================================================
// GRID FILES (CLI)
// ============================================================================

/// Read a grid JSON file.  Unlike [`decode_pixel_data`], I/O failures are
/// errors; malformed contents still degrade to an empty grid.
pub fn read_grid_file(path: &Path) -> Result<PixelGrid> {
    let text = fs::read_to_string(path)?;
    Ok(decode_pixel_data_str(&text))
}

pub fn write_grid_file(grid: &PixelGrid, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(grid)?)?;
    log_info!("Wrote {} cells to {}", grid.len(), path.display());
    Ok(())
}

pub fn write_png_file(img: &image::RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, crate::ops::render::encode_png(img)?)?;
    Ok(())
}
