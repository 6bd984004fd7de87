//! Configuration loading for the pipeline.
//!
//! Strongly-typed configuration built on `figment`. Values are merged from, in
//! increasing precedence:
//!
//! 1. Built-in defaults
//! 2. A TOML configuration file (if given)
//! 3. Environment variables prefixed with `SPECKLE_`
//!
//! CLI arguments override the merged result; that merge lives in the binary.
//!
//! # Example
//! ```no_run
//! use speckle_pipeline::config::PipelineConfig;
//!
//! # fn main() -> Result<(), speckle_pipeline::error::PipelineError> {
//! let config = PipelineConfig::load(None)?;
//! config.validate()?;
//! println!("Input directory: {}", config.input.dir.display());
//! # Ok(())
//! # }
//! ```

use crate::error::{PipelineError, PipelineResult};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filename of the upstream generator's seed file, never ingested as data.
pub const SEED_FILENAME: &str = "seeds_for_exit.dat";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input directory and file-eligibility settings.
    pub input: InputConfig,
    /// Output directory and serialization settings.
    pub output: OutputConfig,
    /// Transfer-buffer settings.
    pub transfer: TransferConfig,
    /// Detector geometry handed to the compute stage.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Input-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding one exit-data file per time step.
    pub dir: PathBuf,
    /// Literal filenames never treated as time-step data.
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
    /// What to do when a single time step's file fails to load.
    #[serde(default)]
    pub on_io_error: IoErrorPolicy,
}

/// Output-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the per-time-step images are written into. Must already
    /// exist; the pipeline never creates it.
    pub dir: PathBuf,
    /// Fractional digits kept per image value (scientific notation). Written
    /// values re-parse to within `10^-precision` of the originals.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

/// Transfer-buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Fixed capacity of the photon transfer buffer. Every time step must
    /// supply at least this many records.
    #[serde(default = "default_max_photons")]
    pub max_photons: usize,
}

/// Detector (CCD) geometry descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Detector center, x coordinate (meters).
    pub x_center: f64,
    /// Detector center, y coordinate (meters).
    pub y_center: f64,
    /// Distance from the exit aperture plane to the detector (meters).
    pub z: f64,
    /// Pixel pitch along x (meters).
    pub dx: f64,
    /// Pixel pitch along y (meters).
    pub dy: f64,
    /// Pixel count along x.
    pub x_pixels: usize,
    /// Pixel count along y.
    pub y_pixels: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            x_center: 0.5,
            y_center: 0.5,
            z: 100.0,
            dx: 6.0e-5,
            dy: 6.0e-5,
            x_pixels: 64,
            y_pixels: 64,
        }
    }
}

/// Policy applied when an individual time step's file fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoErrorPolicy {
    /// Abort the whole run (default). A read failure is never retried.
    #[default]
    Fail,
    /// Log a warning, skip the time step, and continue the sweep.
    Skip,
}

impl std::fmt::Display for IoErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoErrorPolicy::Fail => write!(f, "fail"),
            IoErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

fn default_excluded() -> Vec<String> {
    vec![SEED_FILENAME.to_string()]
}

fn default_precision() -> usize {
    6
}

fn default_max_photons() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                dir: PathBuf::from("data"),
                excluded: default_excluded(),
                on_io_error: IoErrorPolicy::default(),
            },
            output: OutputConfig {
                dir: PathBuf::from("data/speckles"),
                precision: default_precision(),
            },
            transfer: TransferConfig {
                max_photons: default_max_photons(),
            },
            detector: DetectorConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from defaults, an optional TOML file, and
    /// `SPECKLE_`-prefixed environment variables.
    ///
    /// Nested keys use `__` in the environment, e.g.
    /// `SPECKLE_TRANSFER__MAX_PHOTONS=5000`.
    pub fn load(file: Option<&Path>) -> PipelineResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed("SPECKLE_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate values that parse but are semantically invalid.
    ///
    /// Both directories must already exist: a missing input directory means
    /// there is nothing to process, and the pipeline never creates the output
    /// directory.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.input.dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "input directory '{}' does not exist or is not a directory",
                self.input.dir.display()
            )));
        }
        if !self.output.dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "output directory '{}' does not exist or is not a directory",
                self.output.dir.display()
            )));
        }
        if self.transfer.max_photons == 0 {
            return Err(PipelineError::Configuration(
                "transfer.max_photons must be at least 1".to_string(),
            ));
        }
        if self.output.precision == 0 || self.output.precision > 17 {
            return Err(PipelineError::Configuration(format!(
                "output.precision must be in 1..=17, got {}",
                self.output.precision
            )));
        }
        self.detector.validate()
    }
}

impl DetectorConfig {
    /// Validate pixel counts and pitches.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.x_pixels == 0 || self.y_pixels == 0 {
            return Err(PipelineError::Configuration(
                "detector pixel counts must be at least 1".to_string(),
            ));
        }
        for (name, value) in [("detector.dx", self.dx), ("detector.dy", self.dy)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::Configuration(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exclude_seed_file() {
        let config = PipelineConfig::default();
        assert_eq!(config.input.excluded, vec![SEED_FILENAME.to_string()]);
        assert_eq!(config.input.on_io_error, IoErrorPolicy::Fail);
    }

    #[test]
    fn zero_max_photons_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = PipelineConfig {
            input: InputConfig {
                dir: dir.path().to_path_buf(),
                excluded: default_excluded(),
                on_io_error: IoErrorPolicy::Fail,
            },
            output: OutputConfig {
                dir: dir.path().to_path_buf(),
                precision: 6,
            },
            ..PipelineConfig::default()
        };
        config.transfer.max_photons = 0;
        let err = config.validate().expect_err("must reject");
        assert!(err.to_string().contains("max_photons"));
    }

    #[test]
    fn missing_input_dir_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            input: InputConfig {
                dir: dir.path().join("does-not-exist"),
                excluded: default_excluded(),
                on_io_error: IoErrorPolicy::Fail,
            },
            output: OutputConfig {
                dir: dir.path().to_path_buf(),
                precision: 6,
            },
            ..PipelineConfig::default()
        };
        let err = config.validate().expect_err("must reject");
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("input directory"));
    }

    #[test]
    fn nonpositive_pixel_pitch_rejected() {
        let detector = DetectorConfig {
            dx: 0.0,
            ..DetectorConfig::default()
        };
        let err = detector.validate().expect_err("must reject");
        assert!(err.to_string().contains("detector.dx"));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            r#"
[input]
dir = "/tmp/exit-data"

[output]
dir = "/tmp/speckles"
precision = 8

[transfer]
max_photons = 250
"#,
        )
        .expect("write config");

        let config = PipelineConfig::load(Some(&path)).expect("load");
        assert_eq!(config.transfer.max_photons, 250);
        assert_eq!(config.output.precision, 8);
        // Untouched sections keep their defaults.
        assert_eq!(config.detector.x_pixels, 64);
        assert_eq!(config.input.excluded, vec![SEED_FILENAME.to_string()]);
    }
}
