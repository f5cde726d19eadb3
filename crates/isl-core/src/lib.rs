//! Types partagés du pipeline ISL malayalam.
//!
//! Normalisation des landmarks, assemblage du vecteur de 126 features,
//! alphabet canonique, registre des labels, standardisation et driver de
//! classification. Aucune I/O de capture ici : les sources vivent dans
//! `isl-source`, le dataset dans `isl-dataset`, le modèle dans `isl-model`.

pub mod alphabet;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod features;
pub mod frame;
pub mod labels;
pub mod landmark;
pub mod scaler;
pub mod traits;

pub use alphabet::Alphabet;
pub use config::PipelineConfig;
pub use driver::{ClassificationDriver, Outcome, Prediction};
pub use error::CoreError;
pub use features::{FEATURE_LEN, FeatureVector, FrameFeatures};
pub use frame::FrameDetection;
pub use labels::LabelRegistry;
pub use landmark::{HandObservation, HandSide, Landmark};
pub use scaler::FeatureScaler;
