//! Choosing which detection becomes the crop region.

use thiserror::Error;

use crate::postprocess::Detection;

/// Whether the user gets to pick the detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Always use the first detection; any submitted index is ignored.
    First,
    /// Offer the enumerated detections and honour the submitted index.
    #[default]
    UserChosen,
}

/// Why no detection could be chosen.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no objects were detected")]
    NoDetections,
    #[error("selection {index} is out of range; {len} object(s) were detected")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Pick the detection to crop.
///
/// `None` selects the first detection in the order the detector returned.
pub fn select_region(
    detections: &[Detection],
    selection: Option<usize>,
) -> Result<&Detection, SelectionError> {
    if detections.is_empty() {
        return Err(SelectionError::NoDetections);
    }
    let index = selection.unwrap_or(0);
    detections
        .get(index)
        .ok_or(SelectionError::IndexOutOfRange {
            index,
            len: detections.len(),
        })
}

/// Like [`select_region`], but applies `mode` to the submitted index first.
pub fn select_with_mode(
    detections: &[Detection],
    mode: SelectionMode,
    selection: Option<usize>,
) -> Result<&Detection, SelectionError> {
    match mode {
        SelectionMode::First => select_region(detections, None),
        SelectionMode::UserChosen => select_region(detections, selection),
    }
}

/// One line per detection, in detector order, for the choice list.
pub fn describe_choices(detections: &[Detection]) -> Vec<String> {
    detections
        .iter()
        .enumerate()
        .map(|(i, det)| {
            let base = format!(
                "Object {} (Class: {}, Confidence: {:.2})",
                i + 1,
                det.class_id,
                det.confidence
            );
            match det.label() {
                Some(label) => format!("{base} {label}"),
                None => base,
            }
        })
        .collect()
}
