use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::features::{FrameFeatures, assemble_frame};
use crate::landmark::HandObservation;

/// Sortie du détecteur pour une frame : 0, 1 ou 2 mains.
///
/// Format d'échange (une ligne JSON par frame) :
///
/// ```text
/// {"hands":[{"side":"Left","landmarks":[{"x":0.5,"y":0.5,"z":0.0}, ...]}],
///  "image":"frames/000123.jpg","timestamp_ms":12300}
/// ```
///
/// # Example
/// ```
/// use isl_core::frame::FrameDetection;
/// let det = FrameDetection::from_json_line(r#"{"hands":[]}"#).unwrap();
/// assert!(det.hands.is_empty());
/// assert!(det.image.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FrameDetection {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
    /// Image source de la frame, si le détecteur l'a conservée.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl FrameDetection {
    /// Parse une ligne JSON.
    ///
    /// # Errors
    /// Returns an error if the line is not a valid detection object.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Assemble le vecteur de features de la frame.
    ///
    /// # Errors
    /// `CoreError::InvalidObservation` si une main est malformée.
    pub fn features(&self) -> Result<FrameFeatures, CoreError> {
        assemble_frame(&self.hands)
    }
}
