//! Landmark sources (replayed JSON lines, external detector process) and the
//! capture image archive.

pub mod archive;
pub mod detector;
pub mod replay;

pub use archive::ImageArchive;
pub use detector::DetectorProcess;
pub use replay::ReplaySource;
