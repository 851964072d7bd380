//! Input metadata: what each input file holds and which file serves which frame.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, FrameResult};
use crate::time::TimeRange;

/// Role tag for the magnitude child of a vector variable.
pub const ROLE_MAGNITUDE: &str = "magnitude";
/// Role tag for the direction child of a vector variable.
pub const ROLE_DIRECTION: &str = "direction";

/// Metadata for one variable of an input dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableMetadata {
    pub id: String,

    #[serde(default)]
    pub units: Option<String>,

    /// Heights (depths) of the vertical domain, empty for 2D variables.
    #[serde(default)]
    pub heights: Vec<f64>,

    /// Child variables keyed by role ("magnitude"/"mag", "direction"/"dir").
    #[serde(default)]
    pub children: BTreeMap<String, VariableMetadata>,
}

impl VariableMetadata {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Snap a target height to the nearest height of the vertical domain.
    ///
    /// Returns `None` for 2D variables or when no target is given. On a tie
    /// the first listed height wins.
    pub fn closest_height(&self, target: Option<f64>) -> Option<f64> {
        let target = target?;
        let mut best: Option<f64> = None;
        for &height in &self.heights {
            match best {
                Some(b) if (height - target).abs() >= (b - target).abs() => {}
                _ => best = Some(height),
            }
        }
        best
    }

    /// Find a child variable by role, accepting the short role aliases.
    pub fn child_with_role(&self, role: &str) -> Option<&VariableMetadata> {
        let alias = match role {
            ROLE_MAGNITUDE => "mag",
            ROLE_DIRECTION => "dir",
            other => other,
        };
        self.children
            .get(role)
            .or_else(|| self.children.get(alias))
    }
}

/// Metadata of one downloadable input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMetadata {
    /// Identifier of the data source definition the file belongs to.
    pub definition_id: String,

    /// Identifier of the file within its source.
    pub dataset_id: String,

    /// Where to download the file from.
    pub uri: String,

    pub last_modified: DateTime<Utc>,

    #[serde(default)]
    pub variables: HashMap<String, VariableMetadata>,
}

impl InputMetadata {
    /// File name used for the local copy.
    pub fn filename(&self) -> String {
        let tail = self
            .uri
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            safe_filename(&self.dataset_id)
        } else {
            safe_filename(tail)
        }
    }

    pub fn variable(&self, id: &str) -> Option<&VariableMetadata> {
        self.variables.get(id)
    }
}

/// One input entry of a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub metadata: InputMetadata,

    /// Timestamp of the frame inside the input file, when it differs from the frame start.
    #[serde(default)]
    pub frame_time: Option<DateTime<Utc>>,
}

/// Inputs for every layer of one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTimetable {
    #[serde(default)]
    pub layers: HashMap<String, Vec<InputFrame>>,
}

impl FrameTimetable {
    /// The input serving `layer_id`, if any.
    ///
    /// Several inputs may cover the same frame; the first one listed wins.
    pub fn input_for(&self, layer_id: &str) -> Option<&InputFrame> {
        self.layers.get(layer_id).and_then(|inputs| inputs.first())
    }

    /// Most recent modification time of any input of this frame.
    pub fn max_last_modified(&self) -> Option<DateTime<Utc>> {
        self.layers
            .values()
            .flatten()
            .map(|input| input.metadata.last_modified)
            .max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimetableEntry {
    range: TimeRange,
    #[serde(flatten)]
    timetable: FrameTimetable,
}

/// Time-ordered map from frame range to the inputs of that frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimetableMap {
    frames: BTreeMap<TimeRange, FrameTimetable>,
}

impl FrameTimetableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: TimeRange, timetable: FrameTimetable) {
        self.frames.insert(range, timetable);
    }

    pub fn get(&self, range: &TimeRange) -> Option<&FrameTimetable> {
        self.frames.get(range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimeRange, &FrameTimetable)> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load from a JSON document holding a list of
    /// `{ "range": {...}, "layers": {...} }` entries.
    pub fn from_json(json: &str) -> FrameResult<Self> {
        let entries: Vec<TimetableEntry> = serde_json::from_str(json)?;
        Ok(Self {
            frames: entries
                .into_iter()
                .map(|entry| (entry.range, entry.timetable))
                .collect(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> FrameResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FrameError::Config(format!("cannot read timetable {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> FrameResult<String> {
        let entries: Vec<TimetableEntry> = self
            .frames
            .iter()
            .map(|(range, timetable)| TimetableEntry {
                range: *range,
                timetable: timetable.clone(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

/// Replace characters that are unsafe in file and directory names.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
