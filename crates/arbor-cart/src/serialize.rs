//! Tree persistence via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::CartError;
use crate::tree::Tree;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for a serialized tree.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_nodes: usize,
    n_features: usize,
    n_classes: usize,
    tree: Tree,
}

impl Tree {
    /// Encode the tree into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CartError> {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_nodes: self.n_nodes(),
            n_features: self.schema.n_features(),
            n_classes: self.schema.n_classes(),
            tree: self.clone(),
        };
        bincode::serialize(&envelope).map_err(|e| CartError::SerializeModel { source: e })
    }

    /// Save the tree to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CartError::SerializeModel`] | bincode encoding failed |
    /// | [`CartError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CartError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, &bytes).map_err(|e| CartError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), n_nodes = self.n_nodes(), "model saved");
        Ok(())
    }

    /// Load a tree saved by [`Tree::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CartError::ReadModel`] | file read failed |
    /// | [`CartError::DeserializeModel`] | bincode decoding failed |
    /// | [`CartError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| CartError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| CartError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(CartError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_nodes = envelope.n_nodes,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );
        Ok(envelope.tree)
    }
}
