//! Exit-photon ingestion and time-step orchestration for speckle imaging.
//!
//! An upstream Monte-Carlo photon-transport simulation deposits one file of
//! detected "exit photon" records per simulated time step. This crate turns
//! that directory into a sequence of speckle images:
//!
//! 1. [`catalog`] snapshots the directory into a time-ordered file list,
//! 2. [`store`] lazily loads one time step at a time into a [`table::RecordTable`],
//! 3. [`compute`] packs a fixed-capacity transfer buffer and defines the
//!    compute-stage boundary,
//! 4. [`driver`] sweeps every time step and persists each returned image.
//!
//! The optical algorithm that forms the image is deliberately outside this
//! crate's contract; it sits behind [`compute::ComputeStage`].

pub mod catalog;
pub mod compute;
pub mod config;
pub mod driver;
pub mod error;
pub mod store;
pub mod table;
pub mod telemetry;

pub use catalog::{FileCatalog, FileEntry};
pub use compute::{ComputeStage, CpuSpeckleStage, PhotonRecord, SpeckleImage, TransferBuffer};
pub use config::{IoErrorPolicy, PipelineConfig};
pub use driver::{SweepPhase, SweepSummary, TimestepDriver};
pub use error::{PipelineError, PipelineResult};
pub use store::ExitDataStore;
pub use table::RecordTable;
