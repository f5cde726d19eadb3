//! Entraînement, export quantifié, évaluation et artefacts du classifieur.
//!
//! Le modèle est une régression softmax sur les 126 features standardisées.
//! L'export int8 est celui chargé par la reconnaissance en direct.

pub mod bundle;
pub mod error;
pub mod metrics;
pub mod quantized;
pub mod softmax;

pub use bundle::{ArtifactBundle, ArtifactPaths, ModelInfo};
pub use error::ModelError;
pub use metrics::{ClassMetrics, Evaluation, evaluate};
pub use quantized::QuantizedModel;
pub use softmax::{SoftmaxModel, SoftmaxTrainer};
