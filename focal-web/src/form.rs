//! Multipart form parsing for the page and the API.
//!
//! A submission either carries a fresh `file` field or, when the user changes
//! a control on the result page, the previous upload as base64 in `source`
//! plus its `filename`. Both end up as the same [`Upload`]. A fresh file sent
//! from the result page replaces the carried one, and the selection made for
//! the old image is dropped with it.

use axum::extract::{Multipart, multipart::MultipartError};
use base64::{Engine, engine::general_purpose::STANDARD};
use focal_core::{RequestInput, UnknownPreset, Upload, preset_size};
use focal_utils::OutputFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Please choose a PNG or JPEG image to upload.")]
    MissingFile,
    #[error("The upload could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("The previous image could not be restored; please upload it again.")]
    InvalidSource,
    #[error("{field} must be a whole number (got '{value}').")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Unknown format '{0}'; choose PNG or JPG.")]
    InvalidFormat(String),
    #[error(transparent)]
    InvalidPreset(#[from] UnknownPreset),
}

/// Everything a form submission carried, with values still as text.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    pub upload: Option<Upload>,
    pub selection: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub format: Option<String>,
    /// Named size preset; overrides `width`/`height` unless it is `custom`.
    pub preset: Option<String>,
}

impl SubmittedForm {
    /// Parse the user choices. Blank fields count as not submitted.
    pub fn request_input(&self) -> Result<RequestInput, FormError> {
        let format = match non_blank(&self.format) {
            Some(value) => Some(
                value
                    .parse::<OutputFormat>()
                    .map_err(|_| FormError::InvalidFormat(value.to_string()))?,
            ),
            None => None,
        };
        let preset = match non_blank(&self.preset) {
            Some(name) => preset_size(name)?,
            None => None,
        };
        let (width, height) = match preset {
            Some(size) => (Some(size.width()), Some(size.height())),
            None => (
                parse_number(&self.width, "Width")?,
                parse_number(&self.height, "Height")?,
            ),
        };
        Ok(RequestInput {
            selection: parse_number(&self.selection, "Selection")?,
            width,
            height,
            format,
        })
    }
}

/// Drain a multipart body into a [`SubmittedForm`].
pub async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm, FormError> {
    let mut form = SubmittedForm::default();
    let mut source = None;
    let mut carried_name = None;
    let mut fresh_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    fresh_file = true;
                    form.upload = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "source" => source = Some(field.text().await?),
            "filename" => carried_name = Some(field.text().await?),
            "selection" => form.selection = Some(field.text().await?),
            "width" => form.width = Some(field.text().await?),
            "height" => form.height = Some(field.text().await?),
            "format" => form.format = Some(field.text().await?),
            "preset" => form.preset = Some(field.text().await?),
            other => log::debug!("Ignoring unexpected form field '{other}'"),
        }
    }

    let source = source.filter(|s| !s.trim().is_empty());
    if fresh_file && source.is_some() {
        // The index points into the previous image's detections.
        if let Some(stale) = form.selection.take() {
            log::debug!("Dropping selection '{stale}' made for the replaced image");
        }
    }

    if form.upload.is_none()
        && let Some(encoded) = source
    {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| FormError::InvalidSource)?;
        form.upload = Some(Upload {
            file_name: carried_name.unwrap_or_else(|| "upload".to_string()),
            bytes,
        });
    }

    Ok(form)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<T>, FormError> {
    non_blank(value)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| FormError::InvalidNumber {
                field,
                value: raw.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(selection: &str, width: &str, height: &str, format: &str) -> SubmittedForm {
        SubmittedForm {
            upload: None,
            selection: Some(selection.to_string()),
            width: Some(width.to_string()),
            height: Some(height.to_string()),
            format: Some(format.to_string()),
            preset: None,
        }
    }

    #[test]
    fn parses_submitted_values() {
        let input = form("2", " 640 ", "480", "jpg").request_input().unwrap();
        assert_eq!(
            input,
            RequestInput {
                selection: Some(2),
                width: Some(640),
                height: Some(480),
                format: Some(OutputFormat::Jpeg),
            }
        );
    }

    #[test]
    fn blank_fields_are_not_submitted() {
        let input = form("", "", " ", "").request_input().unwrap();
        assert_eq!(input, RequestInput::default());
    }

    #[test]
    fn zero_width_parses_and_is_left_to_the_pipeline() {
        let input = form("", "0", "10", "png").request_input().unwrap();
        assert_eq!(input.width, Some(0));
    }

    #[test]
    fn rejects_non_numeric_and_unknown_format() {
        let err = form("", "-5", "10", "png").request_input().unwrap_err();
        assert_eq!(err.to_string(), "Width must be a whole number (got '-5').");
        assert!(matches!(
            form("", "1", "1", "gif").request_input(),
            Err(FormError::InvalidFormat(_))
        ));
    }

    #[test]
    fn preset_replaces_typed_dimensions() {
        let mut submitted = form("", "640", "480", "png");
        submitted.preset = Some("Portrait".to_string());
        let input = submitted.request_input().unwrap();
        assert_eq!((input.width, input.height), (Some(1080), Some(1350)));

        submitted.preset = Some("custom".to_string());
        let input = submitted.request_input().unwrap();
        assert_eq!((input.width, input.height), (Some(640), Some(480)));

        submitted.preset = Some("poster".to_string());
        assert!(matches!(
            submitted.request_input(),
            Err(FormError::InvalidPreset(_))
        ));
    }
}
