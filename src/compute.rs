//! The transfer-buffer contract with the external compute stage.
//!
//! The compute stage that turns detected photons into a speckle image is a
//! collaborator, not part of this pipeline: historically a GPU kernel fed by a
//! raw struct-of-arrays memory layout. This module replaces that duck-typed
//! hand-off with an explicit contract: a fixed field order per photon record, a
//! fixed buffer capacity with an explicit logical count, and the
//! [`ComputeStage`] trait as the dispatch boundary. Whatever representation a
//! stage uses internally is its own business.
//!
//! A simple CPU reference stage, [`CpuSpeckleStage`], ships with the crate so
//! the binary runs without special hardware. It is replaceable behind the
//! trait.

use crate::config::DetectorConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::table::RecordTable;

/// Column indices of the exit-data files, as agreed with the upstream
/// photon-transport writer. Positional: the files carry no header.
pub mod columns {
    /// Exit weight of the photon.
    pub const WEIGHT: usize = 0;
    /// Optical path length through displaced media.
    pub const PATH_DISPLACED: usize = 1;
    /// Optical path length attributed to refractive-index changes.
    pub const PATH_REFRACTION: usize = 2;
    /// Combined optical path length.
    pub const PATH_COMBINED: usize = 3;
    /// Exit x coordinate on the aperture plane.
    pub const EXIT_X: usize = 4;
    /// Exit y coordinate on the aperture plane.
    pub const EXIT_Y: usize = 5;
    /// Columns the positional mapping reads; files must be at least this wide.
    pub const REQUIRED: usize = 6;
}

/// One detected photon, in the field order the compute stage expects.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhotonRecord {
    /// Exit weight.
    pub weight: f64,
    /// Displaced optical path length.
    pub path_displaced: f64,
    /// Refraction optical path length.
    pub path_refraction: f64,
    /// Combined optical path length.
    pub path_combined: f64,
    /// Exit x coordinate.
    pub exit_x: f64,
    /// Exit y coordinate.
    pub exit_y: f64,
}

impl PhotonRecord {
    /// Map one table row onto the named fields.
    ///
    /// The caller guarantees `row.len() >= columns::REQUIRED`; the transfer
    /// checks that once per time step rather than per record.
    fn from_row(row: &[f64]) -> Self {
        Self {
            weight: row[columns::WEIGHT],
            path_displaced: row[columns::PATH_DISPLACED],
            path_refraction: row[columns::PATH_REFRACTION],
            path_combined: row[columns::PATH_COMBINED],
            exit_x: row[columns::EXIT_X],
            exit_y: row[columns::EXIT_Y],
        }
    }
}

/// Fixed-capacity photon buffer handed to the compute stage.
///
/// The logical `count` always equals the configured capacity: the compute
/// contract is "exactly `capacity` valid records", and a time step that cannot
/// supply that many is rejected before dispatch rather than padded or read out
/// of bounds. Storage is reused and fully overwritten each time step.
#[derive(Debug)]
pub struct TransferBuffer {
    records: Vec<PhotonRecord>,
    capacity: usize,
    count: usize,
}

impl TransferBuffer {
    /// Create a buffer of fixed `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![PhotonRecord::default(); capacity],
            capacity,
            count: 0,
        }
    }

    /// Overwrite the buffer with rows `[0, capacity)` of `table`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::CapacityShortfall`] if the table holds fewer than
    ///   `capacity` rows. Reading past the end of the table is rejected here,
    ///   never performed.
    /// - [`PipelineError::ColumnContract`] if the table is narrower than the
    ///   positional mapping.
    pub fn fill_from(&mut self, table: &RecordTable) -> PipelineResult<()> {
        if table.column_count() < columns::REQUIRED {
            return Err(PipelineError::ColumnContract {
                have: table.column_count(),
                need: columns::REQUIRED,
            });
        }
        if table.row_count() < self.capacity {
            return Err(PipelineError::CapacityShortfall {
                have: table.row_count(),
                need: self.capacity,
            });
        }
        for (record, row) in self.records.iter_mut().zip(table.rows()) {
            *record = PhotonRecord::from_row(row);
        }
        self.count = self.capacity;
        Ok(())
    }

    /// Configured capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Logical record count; equals the capacity after a successful fill.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The valid records, `count` long.
    pub fn records(&self) -> &[PhotonRecord] {
        &self.records[..self.count]
    }
}

/// Image buffer produced by the compute stage, sized to the detector grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeckleImage {
    x_pixels: usize,
    y_pixels: usize,
    data: Vec<f64>,
}

impl SpeckleImage {
    /// Create a zeroed image matching `detector`'s pixel grid.
    pub fn zeroed(detector: &DetectorConfig) -> Self {
        Self {
            x_pixels: detector.x_pixels,
            y_pixels: detector.y_pixels,
            data: vec![0.0; detector.x_pixels * detector.y_pixels],
        }
    }

    /// Pixel rows along x.
    pub fn x_pixels(&self) -> usize {
        self.x_pixels
    }

    /// Pixel columns along y.
    pub fn y_pixels(&self) -> usize {
        self.y_pixels
    }

    /// Intensity at pixel `(ix, iy)`.
    ///
    /// # Panics
    ///
    /// Panics if `ix >= x_pixels` or `iy >= y_pixels`. Pixel coordinates come
    /// from the detector grid the image was created with, so an out-of-range
    /// index is a programming error, not a data condition.
    pub fn at(&self, ix: usize, iy: usize) -> f64 {
        assert!(
            ix < self.x_pixels && iy < self.y_pixels,
            "pixel ({ix},{iy}) out of range for {}x{} image",
            self.x_pixels,
            self.y_pixels
        );
        self.data[ix * self.y_pixels + iy]
    }

    /// Mutable intensity at pixel `(ix, iy)`.
    ///
    /// # Panics
    ///
    /// Panics if `ix >= x_pixels` or `iy >= y_pixels`, like
    /// [`at`](Self::at).
    pub fn at_mut(&mut self, ix: usize, iy: usize) -> &mut f64 {
        assert!(
            ix < self.x_pixels && iy < self.y_pixels,
            "pixel ({ix},{iy}) out of range for {}x{} image",
            self.x_pixels,
            self.y_pixels
        );
        &mut self.data[ix * self.y_pixels + iy]
    }

    /// Iterate the image one x-row at a time, each `y_pixels` long.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.y_pixels)
    }
}

/// The external compute stage: transfer buffer + detector geometry in, image
/// out.
///
/// Implementations must be deterministic per call and must honor the buffer's
/// logical count. The pipeline issues calls strictly sequentially, never
/// concurrently, and blocks on each result.
pub trait ComputeStage {
    /// Form one time step's image from the buffered photons.
    fn form_image(
        &self,
        photons: &TransferBuffer,
        detector: &DetectorConfig,
    ) -> PipelineResult<SpeckleImage>;

    /// Human-readable stage name, for diagnostics.
    fn name(&self) -> &str {
        "compute"
    }
}

/// Reference CPU stage: coherent summation of photon contributions per pixel.
///
/// For every pixel, each photon contributes its weight at a phase set by the
/// combined optical path length plus the free-space path from its exit point
/// to that pixel; the pixel intensity is the squared magnitude of the sum.
#[derive(Debug, Clone)]
pub struct CpuSpeckleStage {
    /// Wavelength of the coherent source (meters).
    pub wavelength: f64,
}

impl Default for CpuSpeckleStage {
    fn default() -> Self {
        // 532 nm, the source used by the upstream simulation.
        Self { wavelength: 532e-9 }
    }
}

impl ComputeStage for CpuSpeckleStage {
    fn form_image(
        &self,
        photons: &TransferBuffer,
        detector: &DetectorConfig,
    ) -> PipelineResult<SpeckleImage> {
        if !(self.wavelength.is_finite() && self.wavelength > 0.0) {
            return Err(PipelineError::Compute(format!(
                "wavelength must be positive and finite, got {}",
                self.wavelength
            )));
        }
        let wavenumber = 2.0 * std::f64::consts::PI / self.wavelength;
        let mut image = SpeckleImage::zeroed(detector);

        let half_x = detector.x_pixels as f64 / 2.0;
        let half_y = detector.y_pixels as f64 / 2.0;
        for ix in 0..detector.x_pixels {
            let px = detector.x_center + (ix as f64 - half_x + 0.5) * detector.dx;
            for iy in 0..detector.y_pixels {
                let py = detector.y_center + (iy as f64 - half_y + 0.5) * detector.dy;
                let mut re = 0.0;
                let mut im = 0.0;
                for photon in photons.records() {
                    let rx = px - photon.exit_x;
                    let ry = py - photon.exit_y;
                    let free_path = (rx * rx + ry * ry + detector.z * detector.z).sqrt();
                    let phase = wavenumber * (photon.path_combined + free_path);
                    re += photon.weight * phase.cos();
                    im += photon.weight * phase.sin();
                }
                *image.at_mut(ix, iy) = re * re + im * im;
            }
        }
        Ok(image)
    }

    fn name(&self) -> &str {
        "cpu-coherent-sum"
    }
}
