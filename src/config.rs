//! Immutable, validated configuration for a planetary system and for the
//! forward-model evaluation settings.
//!
//! Everything here is fixed for a given target: it is built once at startup
//! and passed by reference into every forward-model evaluation. The free
//! parameters of the fit live in [`crate::forward::FreeParameters`] instead.

use crate::error::DataError;
use crate::transfer::BroadeningMethod;

use serde::{Deserialize, Serialize};

/// Fixed physical parameters of the planet–star system. SI units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Planetary radius [m].
    pub planet_radius: f64,
    /// Planetary mass [kg].
    pub planet_mass: f64,
    /// Stellar radius [m].
    pub stellar_radius: f64,
    /// Orbital semi-major axis [m].
    pub semi_major_axis: f64,
    /// Transit impact parameter [stellar radii].
    pub impact_parameter: f64,
    /// Hydrogen number fraction of the outflow.
    pub h_number_fraction: f64,
    /// Helium number fraction of the outflow.
    pub he_number_fraction: f64,
}

impl SystemConfig {
    pub fn new(
        planet_radius: f64,
        planet_mass: f64,
        stellar_radius: f64,
        semi_major_axis: f64,
        impact_parameter: f64,
        h_number_fraction: f64,
    ) -> Result<Self, DataError> {
        let config = Self {
            planet_radius,
            planet_mass,
            stellar_radius,
            semi_major_axis,
            impact_parameter,
            h_number_fraction,
            he_number_fraction: 1.0 - h_number_fraction,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DataError> {
        let invalid = |message: &str| Err(DataError::InvalidConfiguration(message.into()));
        if !(self.planet_radius > 0.0 && self.planet_mass > 0.0) {
            return invalid("planet radius and mass must be positive");
        }
        if !(self.stellar_radius > self.planet_radius) {
            return invalid("stellar radius must exceed the planetary radius");
        }
        if !(self.semi_major_axis > self.stellar_radius) {
            return invalid("semi-major axis must exceed the stellar radius");
        }
        if !(0.0..1.0).contains(&self.h_number_fraction) || self.h_number_fraction == 0.0 {
            return invalid("hydrogen number fraction must lie in (0, 1)");
        }
        if self.impact_parameter.abs() >= 1.0 + self.radius_ratio() {
            return invalid("impact parameter puts the planet permanently off-disk");
        }
        Ok(())
    }

    /// Planet-to-star radius ratio.
    pub fn radius_ratio(&self) -> f64 {
        self.planet_radius / self.stellar_radius
    }
}

/// Quality/cost and solver-behavior knobs of the forward model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForwardModelSettings {
    /// Orbital phases to sample across the transit, each in [-0.5, 0.5]
    /// (first to fourth contact). The prediction is their unweighted mean.
    pub phases: Vec<f64>,
    /// Side length of the square transit grid in pixels.
    pub grid_size: usize,
    /// Subpixel supersampling factor for disk anti-aliasing.
    pub supersampling: usize,
    /// Radial grid top, in planetary radii.
    pub radial_extent_rp: f64,
    /// Number of radial grid points.
    pub radial_points: usize,
    /// Re-solve ionization with the updated mean molecular weight until
    /// self-consistent.
    pub relax_solution: bool,
    /// Iteration cap of the relax fixed-point loop.
    pub relax_max_iterations: usize,
    /// Relative convergence tolerance on the mean molecular weight.
    pub relax_tolerance: f64,
    /// Use the exact photoionization cross-sections in the ion balance.
    pub exact_photoionization: bool,
    /// Wind line-profile treatment in the radiative transfer.
    pub broadening: BroadeningMethod,
    /// Initial guess for the ionization fraction profile.
    pub initial_ion_fraction: f64,
    /// Initial guess for the helium (singlet, triplet) population fractions.
    pub initial_helium_populations: (f64, f64),
}

impl ForwardModelSettings {
    pub fn default_relax_max_iterations() -> usize {
        20
    }

    pub fn default_relax_tolerance() -> f64 {
        1e-5
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let invalid = |message: String| Err(DataError::InvalidConfiguration(message));
        if self.phases.is_empty() {
            return invalid("at least one orbital phase is required".into());
        }
        if let Some(&phase) = self.phases.iter().find(|p| !(-0.5..=0.5).contains(*p)) {
            return invalid(format!("orbital phase {phase} outside [-0.5, 0.5]"));
        }
        if self.supersampling == 0 || self.grid_size < self.supersampling {
            return invalid(format!(
                "grid size {} must be at least the supersampling factor {}",
                self.grid_size, self.supersampling
            ));
        }
        if self.radial_points < 2 || !(self.radial_extent_rp > 1.0) {
            return invalid("radial grid needs at least 2 points above one planetary radius".into());
        }
        if self.relax_max_iterations == 0 || !(self.relax_tolerance > 0.0) {
            return invalid("relax loop needs a positive iteration cap and tolerance".into());
        }
        let (singlet, triplet) = self.initial_helium_populations;
        if !(0.0..=1.0).contains(&self.initial_ion_fraction)
            || !(0.0..=1.0).contains(&singlet)
            || !(0.0..=1.0).contains(&triplet)
            || singlet + triplet > 1.0
        {
            return invalid("initial fraction guesses must be valid fractions".into());
        }
        Ok(())
    }
}

impl Default for ForwardModelSettings {
    fn default() -> Self {
        Self {
            phases: vec![-0.25, 0.0, 0.25],
            grid_size: 101,
            supersampling: 10,
            radial_extent_rp: 10.0,
            radial_points: 100,
            relax_solution: true,
            relax_max_iterations: Self::default_relax_max_iterations(),
            relax_tolerance: Self::default_relax_tolerance(),
            exact_photoionization: false,
            broadening: BroadeningMethod::AverageVelocity,
            initial_ion_fraction: 0.0,
            initial_helium_populations: (1.0, 0.0),
        }
    }
}
