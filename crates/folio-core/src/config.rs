// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ConversionParameters;

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Parameters pre-filled into the options panel on launch.
    pub default_parameters: ConversionParameters,
    /// Open the containing folder after a successful conversion.
    pub open_folder_after_save: bool,
    /// Directory the save dialog starts in.
    pub last_output_dir: Option<PathBuf>,
    /// Longest edge of list thumbnails, in pixels.
    pub thumbnail_edge_px: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_parameters: ConversionParameters::default(),
            open_folder_after_save: false,
            last_output_dir: None,
            thumbnail_edge_px: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "open_folder_after_save": true }"#).expect("parse");
        assert!(config.open_folder_after_save);
        assert_eq!(config.thumbnail_edge_px, 120);
        assert_eq!(config.default_parameters.quality, 80);
    }
}
