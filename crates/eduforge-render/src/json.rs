//! JSON output of a finished run.
//!
//! # Example
//!
//! ```rust
//! use eduforge_pipeline::{ContentRequest, PipelineState};
//! use eduforge_render::json::JsonGenerator;
//!
//! let state = PipelineState::new(ContentRequest::new(4, "Types of angles").unwrap());
//! let generator = JsonGenerator::new(&state);
//!
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//!
//! let pretty = generator.generate_pretty().unwrap();
//! assert!(pretty.contains("\"topic\": \"Types of angles\""));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use eduforge_pipeline::PipelineState;

use crate::{RenderError, Result};

/// Serializes a [`PipelineState`] to JSON.
pub struct JsonGenerator<'a> {
    state: &'a PipelineState,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a generator for `state`.
    #[must_use]
    pub const fn new(state: &'a PipelineState) -> Self {
        Self { state }
    }

    /// Compact, single-line JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.state).map_err(RenderError::from)
    }

    /// Pretty-printed JSON with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialization`] if serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.state).map_err(RenderError::from)
    }

    /// Writes the JSON to `path`, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the file cannot be written.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
