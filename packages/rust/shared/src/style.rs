//! Page geometry and layout options read by the synthesizer and the renderer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

/// Named page size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagePreset {
    /// Wide, short page suited to a quiz slide (21cm × 10cm).
    #[default]
    Default,
    /// ISO A4 (21cm × 29.7cm).
    A4,
    /// The user-supplied `custom_width` × `custom_height`.
    Custom,
}

impl fmt::Display for PagePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::A4 => write!(f, "a4"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for PagePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "a4" => Ok(Self::A4),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "unknown page preset '{other}': expected 'default', 'a4' or 'custom'"
            )),
        }
    }
}

/// Paper width and height as typesetting lengths (e.g. `21cm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: String,
    pub height: String,
}

impl PageSize {
    pub fn new(width: impl Into<String>, height: impl Into<String>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }
}

/// Four-sided text margins as typesetting lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default = "default_margin")]
    pub left: String,
    #[serde(default = "default_margin")]
    pub right: String,
    #[serde(default = "default_margin")]
    pub top: String,
    #[serde(default = "default_margin")]
    pub bottom: String,
}

impl Margins {
    /// The same length on all four sides.
    pub fn uniform(len: impl Into<String>) -> Self {
        let len = len.into();
        Self {
            left: len.clone(),
            right: len.clone(),
            top: len.clone(),
            bottom: len,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(default_margin())
    }
}

fn default_margin() -> String {
    "0.5cm".into()
}

// ---------------------------------------------------------------------------
// Choice layout
// ---------------------------------------------------------------------------

/// How the choice list is laid out in a synthesized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceLayout {
    /// One choice per line in an `enumerate` list.
    #[default]
    Enumerate,
    /// Two-column inline list (`tabbedenum`).
    Tabbed,
}

impl fmt::Display for ChoiceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumerate => write!(f, "enumerate"),
            Self::Tabbed => write!(f, "tabbed"),
        }
    }
}

impl FromStr for ChoiceLayout {
    type Err = String;

    /// Accepts the names as well as the numeric design selectors `0` and `1`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enumerate" | "plain" | "0" => Ok(Self::Enumerate),
            "tabbed" | "tabbedenum" | "1" => Ok(Self::Tabbed),
            other => Err(format!(
                "unknown layout '{other}': expected 'enumerate' (0) or 'tabbed' (1)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// StyleConfig
// ---------------------------------------------------------------------------

/// Everything the synthesizer and the renderer need to know about how a
/// question should look. Deserialized from the `[style]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Selected page preset.
    #[serde(default)]
    pub page: PagePreset,

    /// Width used when `page = "custom"`.
    #[serde(default = "default_page_width")]
    pub custom_width: String,

    /// Height used when `page = "custom"`.
    #[serde(default = "default_page_height")]
    pub custom_height: String,

    /// Text margins.
    #[serde(default)]
    pub margins: Margins,

    /// Choice list layout.
    #[serde(default)]
    pub layout: ChoiceLayout,

    /// Extra packages loaded after the base ones, in order.
    #[serde(default)]
    pub extra_packages: Vec<String>,

    /// Crop white margins off the intermediate document before rasterizing.
    #[serde(default)]
    pub crop: bool,

    /// Rasterization density (dots per inch).
    #[serde(default = "default_density")]
    pub density: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            page: PagePreset::default(),
            custom_width: default_page_width(),
            custom_height: default_page_height(),
            margins: Margins::default(),
            layout: ChoiceLayout::default(),
            extra_packages: Vec::new(),
            crop: false,
            density: default_density(),
        }
    }
}

fn default_page_width() -> String {
    "21cm".into()
}
fn default_page_height() -> String {
    "10cm".into()
}
fn default_density() -> u32 {
    600
}

impl StyleConfig {
    /// Paper size of the selected preset.
    pub fn page_size(&self) -> PageSize {
        match self.page {
            PagePreset::Default => PageSize::new("21cm", "10cm"),
            PagePreset::A4 => PageSize::new("21cm", "29.7cm"),
            PagePreset::Custom => PageSize::new(&self.custom_width, &self.custom_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve_to_sizes() {
        let mut style = StyleConfig::default();
        assert_eq!(style.page_size(), PageSize::new("21cm", "10cm"));

        style.page = PagePreset::A4;
        assert_eq!(style.page_size(), PageSize::new("21cm", "29.7cm"));

        style.page = PagePreset::Custom;
        style.custom_width = "12cm".into();
        style.custom_height = "8cm".into();
        assert_eq!(style.page_size(), PageSize::new("12cm", "8cm"));
    }

    #[test]
    fn layout_parses_design_numbers() {
        assert_eq!("0".parse::<ChoiceLayout>().unwrap(), ChoiceLayout::Enumerate);
        assert_eq!("1".parse::<ChoiceLayout>().unwrap(), ChoiceLayout::Tabbed);
        assert_eq!("Tabbed".parse::<ChoiceLayout>().unwrap(), ChoiceLayout::Tabbed);
        assert!("2".parse::<ChoiceLayout>().is_err());
    }

    #[test]
    fn preset_parse_is_case_insensitive() {
        assert_eq!("A4".parse::<PagePreset>().unwrap(), PagePreset::A4);
        assert!("letter".parse::<PagePreset>().is_err());
    }

    #[test]
    fn style_defaults_from_partial_toml() {
        let style: StyleConfig = toml::from_str(
            r#"
page = "a4"
layout = "tabbed"

[margins]
left = "1cm"
"#,
        )
        .expect("parse style");
        assert_eq!(style.page, PagePreset::A4);
        assert_eq!(style.layout, ChoiceLayout::Tabbed);
        assert_eq!(style.margins.left, "1cm");
        assert_eq!(style.margins.bottom, "0.5cm");
        assert_eq!(style.density, 600);
        assert!(!style.crop);
    }
}
