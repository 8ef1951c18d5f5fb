use crate::error::{ConverterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default slide width in inches (16:9)
pub const DEFAULT_SLIDE_WIDTH: f64 = 10.0;

/// Default slide height in inches (16:9)
pub const DEFAULT_SLIDE_HEIGHT: f64 = 5.625;

pub const DEFAULT_FILE_NAME: &str = "Slide.pptx";

/// Options handed verbatim to the page's `exportToPptx` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Name of the downloaded presentation file
    pub file_name: String,

    /// Slide width in inches
    pub slide_width: f64,

    /// Slide height in inches
    pub slide_height: f64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            slide_width: DEFAULT_SLIDE_WIDTH,
            slide_height: DEFAULT_SLIDE_HEIGHT,
        }
    }
}

/// One slide of HTML to convert, plus how to export it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub markup: String,

    #[serde(default)]
    pub options: ConversionOptions,
}

impl ConversionRequest {
    /// Request with default geometry and file name
    pub fn new(markup: impl Into<String>) -> Self {
        Self { markup: markup.into(), options: ConversionOptions::default() }
    }

    /// Read the markup from an HTML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.options.file_name = name.into();
        self
    }

    pub fn geometry(mut self, width: f64, height: f64) -> Self {
        self.options.slide_width = width;
        self.options.slide_height = height;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.markup.trim().is_empty()
    }

    /// Check everything the page cannot check for itself
    pub fn validate_options(&self) -> Result<()> {
        let name = &self.options.file_name;
        if name.trim().is_empty() {
            return Err(ConverterError::InvalidRequest("file name must not be empty".to_string()));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConverterError::InvalidRequest(format!("file name '{}' must not contain a path", name)));
        }

        for (label, value) in [("width", self.options.slide_width), ("height", self.options.slide_height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConverterError::InvalidRequest(format!("slide {} must be positive, got {}", label, value)));
            }
        }

        Ok(())
    }

    /// Full validation, including non-blank markup
    pub fn validate(&self) -> Result<()> {
        if self.is_blank() {
            return Err(ConverterError::InvalidRequest("markup must not be empty".to_string()));
        }
        self.validate_options()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
