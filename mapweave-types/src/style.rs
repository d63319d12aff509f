//! Map style references and their resolution against the light/dark theme.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Carto "positron" style used when no light style is given.
pub const DEFAULT_LIGHT_STYLE: &str =
    "https://basemaps.cartocdn.com/gl/positron-gl-style/style.json";
/// Carto "dark matter" style used when no dark style is given.
pub const DEFAULT_DARK_STYLE: &str =
    "https://basemaps.cartocdn.com/gl/dark-matter-gl-style/style.json";

/// Style document given to the engine: either a URL or an inline style JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleRef {
    /// Style is downloaded by the engine from the URL.
    Url(String),
    /// Inline style document.
    Inline(serde_json::Value),
}

impl From<&str> for StyleRef {
    fn from(value: &str) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<String> for StyleRef {
    fn from(value: String) -> Self {
        Self::Url(value)
    }
}

impl Display for StyleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleRef::Url(url) => write!(f, "{url}"),
            StyleRef::Inline(_) => write!(f, "<inline style>"),
        }
    }
}

/// Light/dark indicator of the host application.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(TypesError::UnknownTheme(s.to_string())),
        }
    }
}

/// Pair of styles, one per theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStyles {
    /// Style used with [`Theme::Light`].
    pub light: StyleRef,
    /// Style used with [`Theme::Dark`].
    pub dark: StyleRef,
}

impl Default for MapStyles {
    fn default() -> Self {
        Self {
            light: DEFAULT_LIGHT_STYLE.into(),
            dark: DEFAULT_DARK_STYLE.into(),
        }
    }
}

impl MapStyles {
    /// Uses the same style for both themes.
    pub fn shared(style: impl Into<StyleRef>) -> Self {
        let style = style.into();
        Self {
            light: style.clone(),
            dark: style,
        }
    }

    /// Style to load for the given theme.
    pub fn resolve(&self, theme: Theme) -> &StyleRef {
        match theme {
            Theme::Light => &self.light,
            Theme::Dark => &self.dark,
        }
    }
}
