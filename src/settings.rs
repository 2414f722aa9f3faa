// Copyright (C) 2022-2023 Richard Lincoln

use derive_builder::Builder;
use thiserror::Error;

/// Error type returned by settings validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// An error attributable to one of the fields
    #[error("Bad value for field \"{0}\"")]
    BadFieldValue(&'static str),
}

/// Tunables for the update engine.
///
/// ```
/// use etalu::FactorSettingsBuilder;
///
/// let settings = FactorSettingsBuilder::default()
///     .zero_tolerance(1e-12)
///     .maximum_pivots(50)
///     .build()
///     .unwrap();
/// assert_eq!(settings.maximum_pivots, 50);
/// ```
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct FactorSettings {
    /// Entries whose magnitude is less than or equal to `zero_tolerance` after
    /// elimination are dropped from solve results. Default: 1e-13
    #[builder(default = "1.0e-13")]
    pub zero_tolerance: f64,

    /// Multiplier applied to the pivot accuracy tolerance used by
    /// `replace_column`. Values above one accept less accurate pivots.
    /// Default: 1.0
    #[builder(default = "1.0")]
    pub relax_check: f64,

    /// Estimated nonzero count below which the sparse (depth first) solves
    /// are used. `None` derives the value from the number of rows, `Some(0)`
    /// disables the sparse and sparsish solves altogether. Default: None
    #[builder(default = "None")]
    pub sparse_threshold: Option<usize>,

    /// Estimated nonzero count below which the sparsish (bitmap) solves are
    /// used. Must not be smaller than `sparse_threshold`. Default: None
    #[builder(default = "None")]
    pub sparse_threshold2: Option<usize>,

    /// Number of column replacements allowed before a refactorization is
    /// required. Default: 200
    #[builder(default = "200")]
    pub maximum_pivots: usize,

    /// Sizes the U and R arenas relative to the nonzeros of the supplied
    /// factors when `u_area` or `r_area` are not given. Default: 4.0
    #[builder(default = "4.0")]
    pub area_factor: f64,

    /// Explicit length of the U arenas (row and column view).
    #[builder(default = "None")]
    pub u_area: Option<usize>,

    /// Explicit length of the eta file.
    #[builder(default = "None")]
    pub r_area: Option<usize>,

    /// When a U row cannot grow in place it is moved to the end of the arena
    /// and `pad + len * stretch` slots are left free behind it. Default: 4
    #[builder(default = "4")]
    pub pad: usize,
    /// Default: 0.3
    #[builder(default = "0.3")]
    pub stretch: f64,

    /// Accumulate per stage nonzero counts and timings. Default: false
    #[builder(default = "false")]
    pub collect_statistics: bool,
}

impl Default for FactorSettings {
    fn default() -> FactorSettings {
        FactorSettingsBuilder::default().build().unwrap()
    }
}

impl FactorSettings {
    /// Checks that the settings are valid.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_tolerance(self.zero_tolerance, "zero_tolerance")?;
        validate_tolerance(self.relax_check, "relax_check")?;
        validate_thresholds(self.sparse_threshold, self.sparse_threshold2)?;
        if self.maximum_pivots == 0 {
            return Err(SettingsError::BadFieldValue("maximum_pivots"));
        }
        if !(self.area_factor >= 1.0) {
            return Err(SettingsError::BadFieldValue("area_factor"));
        }
        if !(self.stretch >= 0.0) || !self.stretch.is_finite() {
            return Err(SettingsError::BadFieldValue("stretch"));
        }
        Ok(())
    }
}

// pre build checker (for auto-validation when using the builder)

impl From<SettingsError> for FactorSettingsBuilderError {
    fn from(e: SettingsError) -> Self {
        FactorSettingsBuilderError::ValidationError(e.to_string())
    }
}

impl FactorSettingsBuilder {
    /// check the fields that were set explicitly
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(tol) = self.zero_tolerance {
            validate_tolerance(tol, "zero_tolerance")?;
        }
        if let Some(relax) = self.relax_check {
            validate_tolerance(relax, "relax_check")?;
        }
        validate_thresholds(
            self.sparse_threshold.flatten(),
            self.sparse_threshold2.flatten(),
        )?;
        if self.maximum_pivots == Some(0) {
            return Err(SettingsError::BadFieldValue("maximum_pivots"));
        }
        if let Some(factor) = self.area_factor {
            if !(factor >= 1.0) {
                return Err(SettingsError::BadFieldValue("area_factor"));
            }
        }
        if let Some(stretch) = self.stretch {
            if !(stretch >= 0.0) || !stretch.is_finite() {
                return Err(SettingsError::BadFieldValue("stretch"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------
// individual validation functions go here
// ---------------------------------------------------------

fn validate_tolerance(value: f64, field: &'static str) -> Result<(), SettingsError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::BadFieldValue(field))
    }
}

fn validate_thresholds(
    threshold: Option<usize>,
    threshold2: Option<usize>,
) -> Result<(), SettingsError> {
    match (threshold, threshold2) {
        (Some(t1), Some(t2)) if t2 < t1 => {
            Err(SettingsError::BadFieldValue("sparse_threshold2"))
        }
        _ => Ok(()),
    }
}

#[test]
fn test_settings_validate() {
    // all standard settings
    FactorSettingsBuilder::default().build().unwrap();

    assert!(FactorSettingsBuilder::default()
        .zero_tolerance(0.0)
        .build()
        .is_err());
    assert!(FactorSettingsBuilder::default()
        .relax_check(f64::NAN)
        .build()
        .is_err());
    assert!(FactorSettingsBuilder::default()
        .sparse_threshold(Some(10))
        .sparse_threshold2(Some(5))
        .build()
        .is_err());
    assert!(FactorSettingsBuilder::default()
        .maximum_pivots(0)
        .build()
        .is_err());

    let mut settings = FactorSettings::default();
    assert!(settings.validate().is_ok());
    settings.area_factor = 0.5;
    assert_eq!(
        settings.validate(),
        Err(SettingsError::BadFieldValue("area_factor"))
    );
}
