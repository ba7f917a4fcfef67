use anyhow::{bail, Context, Result};
use parasitoid_core::integrator::Tolerances;
use parasitoid_core::tracer::RootSettings;
use parasitoid_core::RunSettings;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Numerical settings shared by every scenario.
///
/// Loaded from a TOML file; every section and key is optional and falls back
/// to the textbook defaults.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Error control of the vulnerable-period integrator.
    pub integrator: Tolerances,
    /// Root searches of the stability-region sweeps.
    pub roots: RootSettings,

    /// Number of `R` values per stability-region sweep.
    pub sweep_samples: usize,
    /// Number of sample times across one vulnerable period.
    pub grid_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        let settings = RunSettings::default();
        Self {
            integrator: settings.tolerances,
            roots: settings.roots,
            sweep_samples: settings.sweep_samples,
            grid_points: settings.grid_points,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            tolerances: self.integrator,
            roots: self.roots,
            sweep_samples: self.sweep_samples,
            grid_points: self.grid_points,
        }
    }

    fn validate(&self) -> Result<()> {
        check_num(self.integrator.relative, 0.0..1.0).context("invalid relative tolerance")?;
        check_num(self.integrator.absolute, 0.0..1.0).context("invalid absolute tolerance")?;
        check_num(self.integrator.max_steps, 1..=100_000_000).context("invalid step budget")?;
        if let Some(step) = self.integrator.initial_step {
            check_num(step, f64::MIN_POSITIVE..=1.0).context("invalid initial step")?;
        }

        check_num(self.roots.step_tolerance, f64::MIN_POSITIVE..1.0)
            .context("invalid root step tolerance")?;
        check_num(self.roots.residual_tolerance, f64::MIN_POSITIVE..1.0)
            .context("invalid root residual tolerance")?;
        check_num(self.roots.max_evaluations, 2..=100_000_000)
            .context("invalid root evaluation budget")?;

        check_num(self.sweep_samples, 1..=100_000).context("invalid number of sweep samples")?;
        check_num(self.grid_points, 2..=1_000_000).context("invalid number of grid points")?;

        self.run_settings().validate()
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
