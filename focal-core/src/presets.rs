//! Output size presets and the per-variant processing options.
//!
//! The three page variants differ only in what the user may change: which
//! detection is cropped, the output size, and the output format.
//! [`ProcessOptions`] captures those switches so a single pipeline serves all
//! of them.

use focal_utils::{OutputFormat, Variant, config::OutputSettings};
use log::warn;
use thiserror::Error;

use crate::selector::SelectionMode;
use crate::transform::{OutputSize, SizeError};

/// A named output size preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizePreset {
    /// Human-visible name for the size picker.
    pub name: &'static str,
    /// Output width in pixels (0 for custom).
    pub width: u32,
    /// Output height in pixels (0 for custom).
    pub height: u32,
    pub description: &'static str,
}

impl SizePreset {
    pub const fn new(
        name: &'static str,
        width: u32,
        height: u32,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            width,
            height,
            description,
        }
    }

    /// The preset as a validated size; `None` for `Custom`.
    pub fn output_size(&self) -> Option<OutputSize> {
        OutputSize::new(self.width, self.height).ok()
    }
}

static PRESETS: [SizePreset; 5] = [
    SizePreset::new("Square", 1080, 1080, "Square post (1080×1080)"),
    SizePreset::new("Portrait", 1080, 1350, "Portrait post (1080×1350)"),
    SizePreset::new("Landscape", 1080, 566, "Landscape post (1080×566)"),
    SizePreset::new("Story", 1080, 1920, "Full-screen story (1080×1920)"),
    SizePreset::new("Custom", 0, 0, "User-defined custom dimensions"),
];

pub fn standard_presets() -> &'static [SizePreset] {
    &PRESETS
}

/// Find a preset by name, ignoring case and spacing.
pub fn preset_by_name(name: &str) -> Option<SizePreset> {
    let lookup_key = normalize_name(name);
    standard_presets()
        .iter()
        .find(|p| normalize_name(p.name) == lookup_key)
        .cloned()
}

/// Size named by `preset`; `None` for `Custom` or a blank name.
pub fn preset_size(preset: &str) -> Result<Option<OutputSize>, UnknownPreset> {
    if preset.trim().is_empty() {
        return Ok(None);
    }
    preset_by_name(preset)
        .map(|p| p.output_size())
        .ok_or_else(|| UnknownPreset(preset.trim().to_string()))
}

/// A preset name that matches none of [`standard_presets`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown size preset '{0}'; expected square, portrait, landscape, story, or custom")]
pub struct UnknownPreset(pub String);

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// How the output size is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// Always this size; submitted width/height are ignored.
    Fixed(OutputSize),
    /// The user supplies width and height; `default` pre-fills the form.
    Custom { default: OutputSize },
}

/// How the output format is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Fixed(OutputFormat),
    /// PNG or JPEG, user's choice; `default` is pre-selected.
    Choice { default: OutputFormat },
}

/// What a request is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub selection_mode: SelectionMode,
    pub size: SizeMode,
    pub format: FormatMode,
}

impl ProcessOptions {
    /// First detection, 1080×1080, PNG.
    pub fn basic() -> Self {
        Self {
            selection_mode: SelectionMode::First,
            size: SizeMode::Fixed(OutputSize::SQUARE_1080),
            format: FormatMode::Fixed(OutputFormat::Png),
        }
    }

    /// User-chosen detection, 1080×1080, PNG.
    pub fn selectable() -> Self {
        Self {
            selection_mode: SelectionMode::UserChosen,
            ..Self::basic()
        }
    }

    /// User-chosen detection, size, and format.
    pub fn custom() -> Self {
        Self {
            selection_mode: SelectionMode::UserChosen,
            size: SizeMode::Custom {
                default: OutputSize::SQUARE_1080,
            },
            format: FormatMode::Choice {
                default: OutputFormat::Png,
            },
        }
    }

    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Basic => Self::basic(),
            Variant::Selectable => Self::selectable(),
            Variant::Custom => Self::custom(),
        }
    }

    /// Variant defaults with the configured size and format.
    ///
    /// A named `preset` wins over `width`/`height`; an unknown name is logged
    /// and the explicit dimensions are used.
    pub fn from_settings(settings: &OutputSettings) -> Result<Self, SizeError> {
        let preset = match preset_size(&settings.preset) {
            Ok(size) => size,
            Err(err) => {
                warn!("{err}; using {}x{}", settings.width, settings.height);
                None
            }
        };
        let size = match preset {
            Some(size) => size,
            None => OutputSize::new(settings.width, settings.height)?,
        };
        let mut options = Self::for_variant(settings.variant);
        options.size = match options.size {
            SizeMode::Fixed(_) => SizeMode::Fixed(size),
            SizeMode::Custom { .. } => SizeMode::Custom { default: size },
        };
        options.format = match options.format {
            FormatMode::Fixed(_) => FormatMode::Fixed(settings.format),
            FormatMode::Choice { .. } => FormatMode::Choice {
                default: settings.format,
            },
        };
        Ok(options)
    }

    pub fn allows_selection(&self) -> bool {
        self.selection_mode == SelectionMode::UserChosen
    }

    pub fn allows_custom_size(&self) -> bool {
        matches!(self.size, SizeMode::Custom { .. })
    }

    pub fn allows_format_choice(&self) -> bool {
        matches!(self.format, FormatMode::Choice { .. })
    }

    /// Size to show in the form before the user changes anything.
    pub fn default_size(&self) -> OutputSize {
        match self.size {
            SizeMode::Fixed(size) | SizeMode::Custom { default: size } => size,
        }
    }

    pub fn default_format(&self) -> OutputFormat {
        match self.format {
            FormatMode::Fixed(format) | FormatMode::Choice { default: format } => format,
        }
    }

    /// Resolve the size for a request. Submitted dimensions are validated only
    /// when the variant lets the user set them.
    pub fn resolve_size(
        &self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<OutputSize, SizeError> {
        match self.size {
            SizeMode::Fixed(size) => Ok(size),
            SizeMode::Custom { default } => OutputSize::new(
                width.unwrap_or(default.width()),
                height.unwrap_or(default.height()),
            ),
        }
    }

    pub fn resolve_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        match self.format {
            FormatMode::Fixed(format) => format,
            FormatMode::Choice { default } => requested.unwrap_or(default),
        }
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::custom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_lookup_ignores_spacing_and_case() {
        let p = preset_by_name(" portrait ").expect("portrait preset");
        assert_eq!((p.width, p.height), (1080, 1350));
        assert_eq!(preset_by_name("STORY").unwrap().name, "Story");
        assert!(preset_by_name("banner").is_none());
    }

    #[test]
    fn preset_size_resolves_names() {
        assert_eq!(preset_size("Landscape"), Ok(OutputSize::new(1080, 566).ok()));
        assert_eq!(preset_size("custom"), Ok(None));
        assert_eq!(preset_size(" "), Ok(None));
        assert_eq!(
            preset_size("banner"),
            Err(UnknownPreset("banner".to_string()))
        );
    }

    #[test]
    fn settings_preset_overrides_dimensions() {
        let settings = OutputSettings {
            variant: Variant::Basic,
            preset: "story".to_string(),
            width: 640,
            height: 480,
            ..Default::default()
        };
        let options = ProcessOptions::from_settings(&settings).unwrap();
        assert_eq!(options.default_size(), OutputSize::new(1080, 1920).unwrap());

        let unknown = OutputSettings {
            preset: "billboard".to_string(),
            ..settings
        };
        let options = ProcessOptions::from_settings(&unknown).unwrap();
        assert_eq!(options.default_size(), OutputSize::new(640, 480).unwrap());
    }

    #[test]
    fn only_custom_preset_lacks_a_size() {
        for p in standard_presets() {
            assert_eq!(p.output_size().is_none(), p.name == "Custom", "{}", p.name);
        }
    }

    #[test]
    fn variants_match_their_descriptions() {
        let basic = ProcessOptions::for_variant(Variant::Basic);
        assert!(!basic.allows_selection());
        assert!(!basic.allows_custom_size());
        assert!(!basic.allows_format_choice());

        let selectable = ProcessOptions::for_variant(Variant::Selectable);
        assert!(selectable.allows_selection());
        assert!(!selectable.allows_custom_size());

        let custom = ProcessOptions::default();
        assert!(custom.allows_selection());
        assert!(custom.allows_custom_size());
        assert!(custom.allows_format_choice());
        assert_eq!(custom.default_size(), OutputSize::SQUARE_1080);
    }

    #[test]
    fn fixed_size_ignores_submitted_dimensions() {
        let basic = ProcessOptions::basic();
        assert_eq!(
            basic.resolve_size(Some(0), Some(0)),
            Ok(OutputSize::SQUARE_1080)
        );
        assert_eq!(
            basic.resolve_format(Some(OutputFormat::Jpeg)),
            OutputFormat::Png
        );
    }

    #[test]
    fn custom_size_validates_user_input() {
        let custom = ProcessOptions::custom();
        assert!(custom.resolve_size(Some(0), Some(100)).is_err());
        assert_eq!(
            custom.resolve_size(Some(300), None),
            OutputSize::new(300, 1080)
        );
        assert_eq!(
            custom.resolve_format(Some(OutputFormat::Jpeg)),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn settings_override_variant_defaults() {
        let settings = OutputSettings {
            variant: Variant::Selectable,
            width: 640,
            height: 480,
            format: OutputFormat::Jpeg,
            ..Default::default()
        };
        let options = ProcessOptions::from_settings(&settings).unwrap();
        assert_eq!(options.default_size(), OutputSize::new(640, 480).unwrap());
        assert_eq!(options.resolve_format(None), OutputFormat::Jpeg);
        assert!(!options.allows_format_choice());
    }
}
