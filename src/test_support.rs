//! Shared fixtures: analytic stub implementations of the external solver
//! and radiative-transfer seams, plus small system configurations.

use crate::atmosphere::{
    AtmosphereModel, AtmosphericStateSolver, HeliumPopulationRequest, HeliumPopulations,
    IonBalance, IonBalanceRequest, WindStructure, WindStructureRequest,
};
use crate::config::{ForwardModelSettings, SystemConfig};
use crate::constants::{BOLTZMANN, HYDROGEN_MASS, SPEED_OF_LIGHT};
use crate::error::ModelError;
use crate::forward::ForwardModel;
use crate::spectrum::{InstrumentalKernel, ObservedSpectrum, ReferenceSpectrum};
use crate::transfer::{RadiativeTransferEvaluator, RadiativeTransferRequest};

use std::cell::Cell;
use std::f64::consts::PI;

use ndarray::Array1;

/// Roughly HD 209458 b, rounded.
pub(crate) fn test_system() -> SystemConfig {
    SystemConfig::new(9.4e7, 1.3e27, 8.3e8, 7.0e9, 0.5, 0.9).unwrap()
}

pub(crate) fn test_settings() -> ForwardModelSettings {
    ForwardModelSettings {
        phases: vec![-0.2, 0.0, 0.2],
        grid_size: 40,
        supersampling: 4,
        radial_extent_rp: 10.0,
        radial_points: 60,
        ..ForwardModelSettings::default()
    }
}

/// A flat stellar irradiation table; the stubs only need its presence.
pub(crate) fn flat_reference_spectrum() -> ReferenceSpectrum {
    ReferenceSpectrum::new(
        Array1::linspace(100.0, 1200.0, 12),
        Array1::from_elem(12, 1.0e3),
    )
    .unwrap()
}

pub(crate) fn stub_model<S: AtmosphericStateSolver>(solver: S) -> AtmosphereModel<S> {
    AtmosphereModel::new(solver, test_system(), test_settings(), flat_reference_spectrum())
        .unwrap()
}

/// Air wavelength grid [Å] bracketing the helium triplet.
pub(crate) fn test_wavelength_grid() -> Array1<f64> {
    Array1::linspace(10826.0, 10834.0, 41)
}

pub(crate) fn test_kernel() -> InstrumentalKernel {
    InstrumentalKernel::gaussian(7e3, 10830.0, 0.2, 11).unwrap()
}

/// Complete forward model over the stub radiative transfer.
pub(crate) fn stub_forward_model<S: AtmosphericStateSolver>(
    solver: S,
    phases: Vec<f64>,
) -> ForwardModel<S, StubTransfer> {
    let settings = ForwardModelSettings {
        phases,
        ..test_settings()
    };
    let atmosphere =
        AtmosphereModel::new(solver, test_system(), settings, flat_reference_spectrum()).unwrap();
    ForwardModel::new(atmosphere, StubTransfer, test_kernel(), &test_wavelength_grid()).unwrap()
}

/// Synthetic observation on [`test_wavelength_grid`] with constant flux and
/// uncertainty.
pub(crate) fn flat_observed_spectrum(n: usize, flux: f64, sigma: f64) -> ObservedSpectrum {
    ObservedSpectrum::new(
        Array1::linspace(10826.0, 10834.0, n),
        Array1::from_elem(n, flux),
        Array1::from_elem(n, sigma),
    )
    .unwrap()
}

/// Analytic placeholder for the external atmospheric solver: smooth
/// ionization rise, mass-conserving isothermal outflow, fixed helium
/// population shapes. Density scales linearly with the escape rate.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StubSolver;

impl AtmosphericStateSolver for StubSolver {
    fn ion_balance(&self, request: &IonBalanceRequest<'_>) -> Result<IonBalance, ModelError> {
        let ion_fraction = request.radius_rp.mapv(|r| 1.0 - (-(r - 1.0) / 2.0).exp());
        Ok(IonBalance {
            ion_fraction,
            mean_molecular_weight: None,
        })
    }

    fn wind_structure(
        &self,
        request: &WindStructureRequest<'_>,
    ) -> Result<WindStructure, ModelError> {
        let sound_speed =
            (BOLTZMANN * request.temperature / request.mean_molecular_weight).sqrt();
        let velocity = request.radius_rp.mapv(|r| sound_speed * (0.1 + (r - 1.0)));
        let escape_rate_kg = request.escape_rate * 1e-3;
        let density = ndarray::Zip::from(request.radius_rp)
            .and(&velocity)
            .map_collect(|&r, &v| {
                let radius = r * request.planet_radius;
                escape_rate_kg / (4.0 * PI * radius * radius * v)
            });
        Ok(WindStructure { velocity, density })
    }

    fn helium_populations(
        &self,
        request: &HeliumPopulationRequest<'_>,
    ) -> Result<HeliumPopulations, ModelError> {
        let singlet = request.radius_rp.mapv(|r| 0.6 * (-(r - 1.0) / 8.0).exp());
        let triplet = request.radius_rp.mapv(|r| 1e-6 * (-(r - 1.0) / 5.0).exp());
        Ok(HeliumPopulations { singlet, triplet })
    }
}

/// Solver whose reported mean molecular weight flips between two values on
/// every call, so the relax loop can never settle.
#[derive(Debug, Default)]
pub(crate) struct OscillatingSolver {
    calls: Cell<usize>,
}

impl AtmosphericStateSolver for OscillatingSolver {
    fn ion_balance(&self, request: &IonBalanceRequest<'_>) -> Result<IonBalance, ModelError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let scale = if call % 2 == 0 { 1.0 } else { 2.0 };
        Ok(IonBalance {
            ion_fraction: Array1::from_elem(request.radius_rp.len(), 0.5),
            mean_molecular_weight: Some(Array1::from_elem(
                request.radius_rp.len(),
                scale * HYDROGEN_MASS,
            )),
        })
    }

    fn wind_structure(
        &self,
        request: &WindStructureRequest<'_>,
    ) -> Result<WindStructure, ModelError> {
        StubSolver.wind_structure(request)
    }

    fn helium_populations(
        &self,
        request: &HeliumPopulationRequest<'_>,
    ) -> Result<HeliumPopulations, ModelError> {
        StubSolver.helium_populations(request)
    }
}

/// Solver stubbed to fail the way an ill-conditioned ionization solve does.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FailingSolver;

impl AtmosphericStateSolver for FailingSolver {
    fn ion_balance(&self, _request: &IonBalanceRequest<'_>) -> Result<IonBalance, ModelError> {
        Err(ModelError::instability("ionization balance diverged"))
    }

    fn wind_structure(
        &self,
        _request: &WindStructureRequest<'_>,
    ) -> Result<WindStructure, ModelError> {
        Err(ModelError::instability("ionization balance diverged"))
    }

    fn helium_populations(
        &self,
        _request: &HeliumPopulationRequest<'_>,
    ) -> Result<HeliumPopulations, ModelError> {
        Err(ModelError::instability("ionization balance diverged"))
    }
}

/// Analytic placeholder for the ray-traced radiative transfer: Gaussian
/// thermal line profiles with depth set by a crude triplet column density,
/// on top of the opaque-disk continuum from the flux map.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StubTransfer;

impl RadiativeTransferEvaluator for StubTransfer {
    fn transmission(
        &self,
        request: &RadiativeTransferRequest<'_>,
    ) -> Result<Array1<f64>, ModelError> {
        // crude column: mean triplet density times one scale height
        let scale = request.radius_m[request.radius_m.len() - 1] - request.radius_m[0];
        let column = request.number_density.mean().unwrap_or(0.0) * scale;
        // arbitrary cross-section scale keeping depths in the percent range
        // for escape rates around 1e10 g/s
        let depth_scale = (column * 1e-14).min(0.5);

        let thermal_sigma =
            (2.0 * BOLTZMANN * request.temperature / request.atomic_mass).sqrt();
        let doppler = 1.0 + request.line_of_sight_velocity / SPEED_OF_LIGHT;
        let continuum = request.flux_map.sum();

        let spectrum = request.wavelength_m.mapv(|wl| {
            let mut absorption = 0.0;
            for line in request.lines {
                let center = line.wavelength_m() * doppler;
                let sigma = center * thermal_sigma / SPEED_OF_LIGHT;
                let x = (wl - center) / sigma;
                absorption += line.oscillator_strength * (-0.5 * x * x).exp();
            }
            continuum - depth_scale * absorption
        });
        Ok(spectrum)
    }
}
