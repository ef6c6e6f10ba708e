//! The cascading forward model: free parameters in, instrument-convolved
//! transmission spectrum out.
//!
//! One evaluation chains the atmospheric solve, the per-phase transit
//! geometry and radiative transfer, the continuum-depth reinstatement, the
//! phase average and the instrumental convolution. Every call is
//! referentially transparent: no state persists between evaluations.

use crate::atmosphere::{AtmosphereModel, AtmosphericStateSolver};
use crate::constants::{ANGSTROM, HELIUM_MASS, HELIUM_TRIPLET_EINSTEIN_A, HELIUM_TRIPLET_LINES};
use crate::error::{DataError, ModelError};
use crate::geometry::build_transit_geometry;
use crate::spectrum::InstrumentalKernel;
use crate::transfer::{RadiativeTransferEvaluator, RadiativeTransferRequest};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The fit vector θ. Proposed by the optimizer, consumed once per
/// forward-model evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreeParameters {
    /// log₁₀ of the atmospheric escape rate [g/s].
    pub log10_escape_rate: f64,
    /// log₁₀ of the isothermal outflow temperature [K].
    pub log10_temperature: f64,
    /// Bulk line-of-sight wind velocity [m/s].
    pub wind_velocity: f64,
}

impl FreeParameters {
    pub const NPARAMS: usize = 3;

    pub fn escape_rate(&self) -> f64 {
        10f64.powf(self.log10_escape_rate)
    }

    pub fn temperature(&self) -> f64 {
        10f64.powf(self.log10_temperature)
    }

    pub fn to_array(self) -> [f64; Self::NPARAMS] {
        [
            self.log10_escape_rate,
            self.log10_temperature,
            self.wind_velocity,
        ]
    }

    pub fn from_array(x: [f64; Self::NPARAMS]) -> Self {
        Self {
            log10_escape_rate: x[0],
            log10_temperature: x[1],
            wind_velocity: x[2],
        }
    }
}

/// The seam the likelihood evaluator consumes: anything that maps θ to a
/// predicted spectrum on a fixed wavelength grid.
pub trait TransmissionModel {
    fn predict(&self, parameters: &FreeParameters) -> Result<Array1<f64>, ModelError>;
}

/// Forward model for one target: fixed system configuration, phase
/// sampling, wavelength grid and instrumental kernel; pluggable external
/// solver and radiative-transfer evaluator.
pub struct ForwardModel<S, R> {
    atmosphere: AtmosphereModel<S>,
    transfer: R,
    kernel: InstrumentalKernel,
    /// Target wavelength grid [m], aligned to the observed spectrum.
    wavelength_m: Array1<f64>,
    /// Radial grid [m].
    radius_m: Array1<f64>,
}

impl<S, R> ForwardModel<S, R>
where
    S: AtmosphericStateSolver,
    R: RadiativeTransferEvaluator,
{
    /// `wavelength_air_angstrom` is the (strictly increasing) observed
    /// wavelength grid the prediction will be aligned to.
    pub fn new(
        atmosphere: AtmosphereModel<S>,
        transfer: R,
        kernel: InstrumentalKernel,
        wavelength_air_angstrom: &Array1<f64>,
    ) -> Result<Self, DataError> {
        if wavelength_air_angstrom.is_empty() {
            return Err(DataError::EmptyTable { skipped: 0 });
        }
        if let Some(index) = wavelength_air_angstrom
            .windows(2)
            .into_iter()
            .position(|w| w[0] >= w[1])
        {
            return Err(DataError::NonMonotonicWavelength { index: index + 1 });
        }
        let radius_m = atmosphere.radius_rp() * atmosphere.system().planet_radius;
        Ok(Self {
            atmosphere,
            transfer,
            kernel,
            wavelength_m: wavelength_air_angstrom * ANGSTROM,
            radius_m,
        })
    }

    pub fn wavelength_m(&self) -> &Array1<f64> {
        &self.wavelength_m
    }
}

impl<S, R> TransmissionModel for ForwardModel<S, R>
where
    S: AtmosphericStateSolver,
    R: RadiativeTransferEvaluator,
{
    fn predict(&self, parameters: &FreeParameters) -> Result<Array1<f64>, ModelError> {
        let profile = self
            .atmosphere
            .solve(parameters.escape_rate(), parameters.temperature())?;

        let system = self.atmosphere.system();
        let settings = self.atmosphere.settings();

        let mut accumulated = Array1::<f64>::zeros(self.wavelength_m.len());
        for &phase in &settings.phases {
            let geometry = build_transit_geometry(
                phase,
                system.radius_ratio(),
                system.impact_parameter,
                system.planet_radius,
                settings.grid_size,
                settings.supersampling,
            )?;
            let spectrum = self.transfer.transmission(&RadiativeTransferRequest {
                flux_map: &geometry.flux_map,
                ray_radii: &geometry.ray_radii,
                radius_m: &self.radius_m,
                number_density: &profile.n_he_triplet,
                velocity: &profile.velocity,
                lines: &HELIUM_TRIPLET_LINES,
                einstein_a: HELIUM_TRIPLET_EINSTEIN_A,
                wavelength_m: &self.wavelength_m,
                temperature: parameters.temperature(),
                atomic_mass: HELIUM_MASS,
                line_of_sight_velocity: parameters.wind_velocity,
                broadening: settings.broadening,
            })?;
            if spectrum.len() != self.wavelength_m.len() {
                return Err(ModelError::ProfileLengthMismatch {
                    name: "transmission spectrum",
                    actual: spectrum.len(),
                    expected: self.wavelength_m.len(),
                });
            }
            // ground-based differential spectroscopy loses the absolute
            // continuum level: reinstate the disk-blocking depth
            accumulated += &(spectrum + geometry.continuum_depth);
        }
        let averaged = accumulated / settings.phases.len() as f64;
        Ok(self.kernel.convolve(&averaged))
    }
}
