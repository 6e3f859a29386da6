//! Library configuration.

use crate::error::{PdfiumError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Separator for `PDFIUM_FONT_PATHS`, matching `PATH` on the host.
#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// Settings applied when the library is initialised and documents are loaded.
///
/// # Example
///
/// ```
/// use pdfium_lifecycle::LibraryConfig;
///
/// let config = LibraryConfig::new()
///     .with_font_path("/usr/share/fonts/truetype")
///     .with_max_source_bytes(64 * 1024 * 1024);
/// assert_eq!(config.user_font_paths.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Extra font directories handed to `FPDF_InitLibraryWithConfig`.
    pub user_font_paths: Vec<PathBuf>,
    /// `FPDF_LIBRARY_CONFIG` version.
    pub config_version: i32,
    /// `FPDF_FORMFILLINFO` version used for form environments.
    pub form_fill_version: i32,
    /// Upper bound on bytes copied for memory and descriptor loads.
    pub max_source_bytes: Option<usize>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            user_font_paths: Vec::new(),
            config_version: 2,
            form_fill_version: 1,
            max_source_bytes: None,
        }
    }
}

impl LibraryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `PDFIUM_FONT_PATHS` and `PDFIUM_MAX_SOURCE_BYTES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(paths) = std::env::var("PDFIUM_FONT_PATHS") {
            config.user_font_paths = paths
                .split(PATH_SEPARATOR)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Ok(limit) = std::env::var("PDFIUM_MAX_SOURCE_BYTES") {
            let limit = limit.trim().parse().map_err(|_| {
                PdfiumError::InvalidArgument(format!(
                    "PDFIUM_MAX_SOURCE_BYTES must be a byte count, got {:?}",
                    limit
                ))
            })?;
            config.max_source_bytes = Some(limit);
        }
        Ok(config)
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_font_paths.push(path.into());
        self
    }

    pub fn with_max_source_bytes(mut self, limit: usize) -> Self {
        self.max_source_bytes = Some(limit);
        self
    }

    pub fn with_form_fill_version(mut self, version: i32) -> Self {
        self.form_fill_version = version;
        self
    }

    pub(crate) fn check_source_len(&self, len: usize) -> Result<()> {
        match self.max_source_bytes {
            Some(limit) if len > limit => Err(PdfiumError::AllocationFailed { bytes: len }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = LibraryConfig::default();
        assert!(config.user_font_paths.is_empty());
        assert_eq!(config.config_version, 2);
        assert_eq!(config.form_fill_version, 1);
        assert!(config.check_source_len(usize::MAX).is_ok());
    }

    #[test]
    fn test_source_limit() {
        let config = LibraryConfig::new().with_max_source_bytes(16);
        assert!(config.check_source_len(16).is_ok());
        assert!(matches!(
            config.check_source_len(17),
            Err(PdfiumError::AllocationFailed { bytes: 17 })
        ));
    }

    #[test]
    fn test_partial_json() {
        let config: LibraryConfig =
            serde_json::from_str(r#"{"user_font_paths": ["/fonts"], "form_fill_version": 2}"#)
                .unwrap();
        assert_eq!(config.user_font_paths, vec![PathBuf::from("/fonts")]);
        assert_eq!(config.form_fill_version, 2);
        assert_eq!(config.config_version, 2);
        assert_eq!(config.max_source_bytes, None);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("PDFIUM_FONT_PATHS", format!("/a{}/b", PATH_SEPARATOR));
        std::env::set_var("PDFIUM_MAX_SOURCE_BYTES", "1024");
        let config = LibraryConfig::from_env().unwrap();
        assert_eq!(config.user_font_paths.len(), 2);
        assert_eq!(config.max_source_bytes, Some(1024));

        std::env::set_var("PDFIUM_MAX_SOURCE_BYTES", "lots");
        assert!(LibraryConfig::from_env().is_err());

        std::env::remove_var("PDFIUM_FONT_PATHS");
        std::env::remove_var("PDFIUM_MAX_SOURCE_BYTES");
    }
}
