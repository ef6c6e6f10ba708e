//! Seam to the external ray-traced radiative-transfer evaluator.

use crate::constants::TripletLine;
use crate::error::ModelError;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Line-profile treatment of the wind velocity field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadeningMethod {
    /// Fast approximation using the flux-weighted average line-of-sight
    /// velocity.
    AverageVelocity,
    /// Exact per-ray velocity integration.
    PerRay,
}

/// Everything the radiative-transfer evaluator needs for one orbital phase.
pub struct RadiativeTransferRequest<'a> {
    /// Occulted stellar flux map (sums to `1 - continuum_depth`).
    pub flux_map: &'a Array2<f64>,
    /// Column-density basis: per-pixel projected ray radius [m].
    pub ray_radii: &'a Array2<f64>,
    /// Radial grid [m].
    pub radius_m: &'a Array1<f64>,
    /// Absorber (helium 2³S) number density [m⁻³].
    pub number_density: &'a Array1<f64>,
    /// Radial outflow velocity [m/s].
    pub velocity: &'a Array1<f64>,
    /// Spectroscopic constants of the absorbing lines.
    pub lines: &'a [TripletLine],
    /// Transition probability shared by the lines [1/s].
    pub einstein_a: f64,
    /// Target wavelength grid [m].
    pub wavelength_m: &'a Array1<f64>,
    /// Gas temperature [K].
    pub temperature: f64,
    /// Absorber atomic mass [kg].
    pub atomic_mass: f64,
    /// Bulk line-of-sight wind velocity offset [m/s].
    pub line_of_sight_velocity: f64,
    pub broadening: BroadeningMethod,
}

/// External ray-traced radiative transfer: turns an atmospheric state and
/// transit geometry into a normalized absorption spectrum aligned to the
/// target wavelength grid.
pub trait RadiativeTransferEvaluator {
    fn transmission(
        &self,
        request: &RadiativeTransferRequest<'_>,
    ) -> Result<Array1<f64>, ModelError>;
}
