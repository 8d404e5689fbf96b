//! Splash settings stored as RON.
//!
//! ```ron
//! (
//!     message: "Starting up",
//!     title: "Acme",
//!     placement: "TC",
//!     font: "Segoe UI, 14, italic",
//!     background: "navy",
//!     foreground: (255, 255, 255),
//!     close_after: 4.5,
//!     progress: (max: 10.0, mode: determinate),
//! )
//! ```
//!
//! Every field is optional. Malformed colors, fonts and placement codes are
//! corrected when the splash opens, like any other caller input.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ron::{Options, extensions::Extensions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    appearance::{ColorSpec, FontSpec},
    screen::{Placement, Point},
    splash::{ProgressSpec, SplashConfig},
};

/// Errors produced while loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The text is not valid settings RON.
    #[error("invalid settings{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Parse {
        /// File the text came from, when known.
        path: Option<PathBuf>,
        /// Parser error with its location.
        source: ron::error::SpannedError,
    },
}

/// Where the splash goes, as written in a settings file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlacementSpec {
    /// A symbolic code such as `"BR"`.
    Code(String),
    /// Explicit top-left corner, `(x: 40, y: 40)`.
    At {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },
}

impl From<PlacementSpec> for Placement {
    fn from(spec: PlacementSpec) -> Self {
        match spec {
            PlacementSpec::Code(code) => Placement::code(&code),
            PlacementSpec::At { x, y } => Placement::At(Point::new(x, y)),
        }
    }
}

/// Serializable subset of [`SplashConfig`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplashSettings {
    /// Message text.
    pub message: Option<String>,
    /// Title above the message.
    pub title: Option<String>,
    /// Placement code or coordinate.
    pub placement: Option<PlacementSpec>,
    /// Font string or `(family, size, style)` tuple.
    pub font: Option<FontSpec>,
    /// Background color.
    pub background: Option<ColorSpec>,
    /// Text color.
    pub foreground: Option<ColorSpec>,
    /// Seconds until the splash closes itself.
    pub close_after: Option<f64>,
    /// Draw a close button.
    pub close_button: Option<bool>,
    /// Progress bar.
    pub progress: Option<ProgressSpec>,
    /// Whether a standalone `launch` blocks.
    pub standalone_blocking: Option<bool>,
}

fn options() -> Options {
    Options::default()
        .with_default_extension(Extensions::IMPLICIT_SOME)
        .with_default_extension(Extensions::UNWRAP_NEWTYPES)
}

impl SplashSettings {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        options()
            .from_str(&text)
            .map_err(|source| SettingsError::Parse {
                path: Some(path.to_path_buf()),
                source,
            })
    }

    /// Parse settings from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        options()
            .from_str(text)
            .map_err(|source| SettingsError::Parse { path: None, source })
    }

    /// Apply these settings on top of `config`; absent fields leave it as is.
    pub fn apply(self, mut config: SplashConfig) -> SplashConfig {
        if let Some(message) = self.message {
            config.message = message;
        }
        if let Some(title) = self.title {
            config = config.title(title);
        }
        if let Some(placement) = self.placement {
            config.placement = placement.into();
        }
        if let Some(font) = self.font {
            config.font = font;
        }
        if let Some(color) = self.background {
            config.background = color;
        }
        if let Some(color) = self.foreground {
            config.foreground = color;
        }
        if let Some(secs) = self.close_after {
            config = config.close_after_secs(secs);
        }
        if let Some(show) = self.close_button {
            config.close_button = show;
        }
        if let Some(progress) = self.progress {
            config.progress = Some(progress);
        }
        if let Some(blocking) = self.standalone_blocking {
            config.standalone_blocking = blocking;
        }
        config
    }

    /// A configuration built from these settings alone.
    pub fn into_config(self) -> SplashConfig {
        self.apply(SplashConfig::new(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        appearance::{Color, Font, FontStyle},
        screen::Anchor,
        splash::ProgressMode,
    };

    #[test]
    fn full_document() {
        let settings = SplashSettings::from_ron_str(
            r#"(
                message: "Starting up",
                title: "Acme",
                placement: "tc",
                font: "Segoe UI, 14, italic",
                background: "navy",
                foreground: (255, 255, 255),
                close_after: 4.5,
                close_button: true,
                progress: (max: 10.0, mode: indeterminate),
            )"#,
        )
        .unwrap();
        let config = settings.into_config();
        assert_eq!(config.message, "Starting up");
        assert_eq!(config.title.as_deref(), Some("Acme"));
        assert_eq!(config.placement, Placement::Anchor(Anchor::TopCenter));
        assert_eq!(
            config.font.resolve(),
            Font {
                family: "Segoe UI".into(),
                size: 14,
                style: FontStyle::Italic
            }
        );
        assert_eq!(
            config.background.resolve(Color::rgb(0, 0, 0)),
            Color::rgb(0, 0, 128)
        );
        assert_eq!(
            config.foreground.resolve(Color::rgb(0, 0, 0)),
            Color::rgb(255, 255, 255)
        );
        assert_eq!(config.close_after, Some(Duration::from_millis(4500)));
        assert!(config.close_button);
        assert_eq!(
            config.progress,
            Some(ProgressSpec {
                max: 10.0,
                mode: ProgressMode::Indeterminate
            })
        );
    }

    #[test]
    fn coordinate_placement_and_font_tuple() {
        let config = SplashSettings::from_ron_str(
            r#"(message: "x", placement: (x: 40, y: 60), font: ("Consolas", 11, "bold"))"#,
        )
        .unwrap()
        .into_config();
        assert_eq!(config.placement, Placement::at(40, 60));
        assert_eq!(config.font.resolve().family, "Consolas");
    }

    #[test]
    fn absent_fields_keep_config() {
        let base = SplashConfig::new("keep").placement_code("TL").close_after_secs(2.0);
        let config = SplashSettings::from_ron_str("()").unwrap().apply(base);
        assert_eq!(config.message, "keep");
        assert_eq!(config.placement, Placement::Anchor(Anchor::TopLeft));
        assert_eq!(config.close_after, Some(Duration::from_secs(2)));
    }

    #[test]
    fn bad_values_are_corrected_not_rejected() {
        let config = SplashSettings::from_ron_str(r#"(message: "x", placement: "ZZ", background: "nope")"#)
            .unwrap()
            .into_config();
        assert_eq!(config.placement, Placement::Anchor(Anchor::BottomRight));
        assert_eq!(config.background.resolve(Color::rgb(1, 2, 3)), Color::rgb(1, 2, 3));
    }

    #[test]
    fn syntax_and_unknown_fields_are_errors() {
        assert!(matches!(
            SplashSettings::from_ron_str("(message: "),
            Err(SettingsError::Parse { path: None, .. })
        ));
        assert!(SplashSettings::from_ron_str(r#"(colour: "red")"#).is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SplashSettings::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
        assert!(err.to_string().contains("here.ron"));
    }
}
