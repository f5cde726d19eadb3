//! Dataset de capture : format CSV, journal en ajout seul, nettoyage et
//! split stratifié.

pub mod clean;
pub mod error;
pub mod schema;
pub mod split;
pub mod store;

pub use clean::{CleanedDataset, CleaningReport, clean};
pub use error::DatasetError;
pub use schema::{LabeledSample, load_samples};
pub use split::{Split, stratified_split};
pub use store::{CaptureStatus, DatasetLog};
