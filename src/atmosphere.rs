//! Seam to the external atmospheric state solver and the orchestration
//! that turns its raw outputs into a self-consistent [`AtmosphericProfile`].
//!
//! The ionization-balance ODE solve, the isothermal Parker-wind structure
//! and the helium level populations are consumed through
//! [`AtmosphericStateSolver`]; this module owns only the relax fixed-point
//! loop and the number-density bookkeeping.

use crate::config::{ForwardModelSettings, SystemConfig};
use crate::constants::{HELIUM_MASS, HYDROGEN_MASS};
use crate::error::{DataError, ModelError};
use crate::spectrum::ReferenceSpectrum;

use ndarray::Array1;

/// Inputs of the ionization-balance solve.
pub struct IonBalanceRequest<'a> {
    /// Radial grid [planetary radii].
    pub radius_rp: &'a Array1<f64>,
    /// Planetary radius [m].
    pub planet_radius: f64,
    /// Isothermal outflow temperature [K].
    pub temperature: f64,
    /// Hydrogen number fraction.
    pub h_number_fraction: f64,
    /// Atmospheric escape rate [g/s].
    pub escape_rate: f64,
    /// Planetary mass [kg].
    pub planet_mass: f64,
    /// Current estimate of the profile-mean ionization fraction.
    pub mean_ion_fraction: f64,
    /// Stellar irradiation received at the planet.
    pub spectrum_at_planet: &'a ReferenceSpectrum,
    /// Initial guess for the ionization fraction.
    pub initial_ion_fraction: f64,
    /// Use exact photoionization cross-sections.
    pub exact_photoionization: bool,
}

/// Outputs of the ionization-balance solve.
pub struct IonBalance {
    /// Hydrogen ionization fraction per radius.
    pub ion_fraction: Array1<f64>,
    /// Mean molecular weight per radius [kg], if the solver provides it.
    /// When `None`, the weight is derived from the ionization fraction.
    pub mean_molecular_weight: Option<Array1<f64>>,
}

/// Inputs of the hydrodynamic (Parker wind) structure solve.
pub struct WindStructureRequest<'a> {
    pub radius_rp: &'a Array1<f64>,
    pub planet_radius: f64,
    pub planet_mass: f64,
    pub temperature: f64,
    /// Atmospheric escape rate [g/s].
    pub escape_rate: f64,
    /// Profile-mean molecular weight [kg].
    pub mean_molecular_weight: f64,
}

/// Hydrodynamic outflow profiles.
pub struct WindStructure {
    /// Radial outflow velocity [m/s].
    pub velocity: Array1<f64>,
    /// Mass density [kg/m³].
    pub density: Array1<f64>,
}

/// Inputs of the helium level-population solve.
pub struct HeliumPopulationRequest<'a> {
    pub radius_rp: &'a Array1<f64>,
    pub wind: &'a WindStructure,
    pub ion_fraction: &'a Array1<f64>,
    pub temperature: f64,
    pub spectrum_at_planet: &'a ReferenceSpectrum,
    /// Initial guess for the (singlet, triplet) population fractions.
    pub initial_populations: (f64, f64),
}

/// Helium state population fractions per radius; the ionized fraction is
/// the complement `1 - singlet - triplet`.
pub struct HeliumPopulations {
    pub singlet: Array1<f64>,
    pub triplet: Array1<f64>,
}

/// External numerical service computing ionization balance, wind structure
/// and helium populations.
///
/// Implementations must raise [`ModelError::NumericalInstability`] when a
/// solve fails to converge or produces non-physical intermediates, and
/// nothing else for that condition: the likelihood evaluator recovers from
/// exactly that variant.
pub trait AtmosphericStateSolver {
    fn ion_balance(&self, request: &IonBalanceRequest<'_>) -> Result<IonBalance, ModelError>;

    fn wind_structure(
        &self,
        request: &WindStructureRequest<'_>,
    ) -> Result<WindStructure, ModelError>;

    fn helium_populations(
        &self,
        request: &HeliumPopulationRequest<'_>,
    ) -> Result<HeliumPopulations, ModelError>;
}

/// Self-consistent upper-atmosphere state on the radial grid. Produced
/// fresh by every [`AtmosphereModel::solve`] call and never mutated.
#[derive(Clone, Debug)]
pub struct AtmosphericProfile {
    /// Radial grid [planetary radii].
    pub radius_rp: Array1<f64>,
    pub ion_fraction: Array1<f64>,
    /// Mean molecular weight [kg].
    pub mean_molecular_weight: Array1<f64>,
    /// Outflow velocity [m/s].
    pub velocity: Array1<f64>,
    /// Mass density [kg/m³].
    pub density: Array1<f64>,
    /// Helium 1¹S number density [m⁻³].
    pub n_he_singlet: Array1<f64>,
    /// Helium 2³S number density [m⁻³].
    pub n_he_triplet: Array1<f64>,
    /// Ionized helium number density [m⁻³].
    pub n_he_ion: Array1<f64>,
}

/// Drives the external solver into a self-consistent atmospheric profile
/// for one (escape rate, temperature) pair.
pub struct AtmosphereModel<S> {
    solver: S,
    system: SystemConfig,
    settings: ForwardModelSettings,
    spectrum_at_planet: ReferenceSpectrum,
    radius_rp: Array1<f64>,
}

impl<S: AtmosphericStateSolver> AtmosphereModel<S> {
    pub fn new(
        solver: S,
        system: SystemConfig,
        settings: ForwardModelSettings,
        spectrum_at_planet: ReferenceSpectrum,
    ) -> Result<Self, DataError> {
        settings.validate()?;
        let radius_rp = Array1::linspace(1.0, settings.radial_extent_rp, settings.radial_points);
        Ok(Self {
            solver,
            system,
            settings,
            spectrum_at_planet,
            radius_rp,
        })
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    pub fn settings(&self) -> &ForwardModelSettings {
        &self.settings
    }

    /// Radial grid [planetary radii].
    pub fn radius_rp(&self) -> &Array1<f64> {
        &self.radius_rp
    }

    /// Mean mass per nucleus of the neutral outflow [kg].
    fn neutral_weight(&self) -> f64 {
        self.system.h_number_fraction * HYDROGEN_MASS
            + self.system.he_number_fraction * HELIUM_MASS
    }

    /// Solve the atmospheric state for one parameter pair.
    ///
    /// Runs the relax-solution fixed-point iteration: the ionization balance
    /// is re-solved with the updated profile-mean molecular weight until the
    /// mean moves by less than `relax_tolerance` (relative), up to
    /// `relax_max_iterations` passes. Exhausting the bound is a
    /// [`ModelError::NumericalInstability`].
    pub fn solve(
        &self,
        escape_rate_gs: f64,
        temperature_k: f64,
    ) -> Result<AtmosphericProfile, ModelError> {
        if !(escape_rate_gs > 0.0) || !escape_rate_gs.is_finite() {
            return Err(ModelError::instability(format!(
                "non-physical escape rate {escape_rate_gs} g/s"
            )));
        }
        if !(temperature_k > 0.0) || !temperature_k.is_finite() {
            return Err(ModelError::instability(format!(
                "non-physical temperature {temperature_k} K"
            )));
        }

        let n = self.radius_rp.len();
        let neutral_weight = self.neutral_weight();
        let max_passes = if self.settings.relax_solution {
            self.settings.relax_max_iterations
        } else {
            1
        };

        let mut mean_weight = neutral_weight;
        let mut mean_ion_fraction = self.settings.initial_ion_fraction;
        let mut converged_state: Option<(Array1<f64>, Array1<f64>)> = None;

        for pass in 0..max_passes {
            let balance = self.solver.ion_balance(&IonBalanceRequest {
                radius_rp: &self.radius_rp,
                planet_radius: self.system.planet_radius,
                temperature: temperature_k,
                h_number_fraction: self.system.h_number_fraction,
                escape_rate: escape_rate_gs,
                planet_mass: self.system.planet_mass,
                mean_ion_fraction,
                spectrum_at_planet: &self.spectrum_at_planet,
                initial_ion_fraction: self.settings.initial_ion_fraction,
                exact_photoionization: self.settings.exact_photoionization,
            })?;

            let ion_fraction = balance.ion_fraction;
            check_length("ion_fraction", &ion_fraction, n)?;
            if ion_fraction.iter().any(|f| !(-1e-6..=1.0 + 1e-6).contains(f)) {
                return Err(ModelError::instability(
                    "ionization fraction left the unit interval",
                ));
            }

            let weight = match balance.mean_molecular_weight {
                Some(weight) => {
                    check_length("mean_molecular_weight", &weight, n)?;
                    weight
                }
                // electrons from hydrogen ionization lighten the mixture
                None => ion_fraction
                    .mapv(|f| neutral_weight / (1.0 + self.system.h_number_fraction * f)),
            };

            let new_mean_weight = weight.mean().unwrap_or(f64::NAN);
            let new_mean_ion_fraction = ion_fraction.mean().unwrap_or(f64::NAN);
            if !new_mean_weight.is_finite() || !new_mean_ion_fraction.is_finite() {
                return Err(ModelError::instability(
                    "ionization balance produced non-finite profiles",
                ));
            }

            let settled =
                (new_mean_weight - mean_weight).abs() <= self.settings.relax_tolerance * mean_weight;
            mean_weight = new_mean_weight;
            mean_ion_fraction = new_mean_ion_fraction;
            if settled || !self.settings.relax_solution {
                converged_state = Some((ion_fraction, weight));
                break;
            }
            if pass + 1 == max_passes {
                return Err(ModelError::instability(format!(
                    "relax loop did not converge within {max_passes} iterations"
                )));
            }
        }
        // loop either breaks with a state or returns the instability above
        let (ion_fraction, mean_molecular_weight) = converged_state.unwrap();

        let wind = self.solver.wind_structure(&WindStructureRequest {
            radius_rp: &self.radius_rp,
            planet_radius: self.system.planet_radius,
            planet_mass: self.system.planet_mass,
            temperature: temperature_k,
            escape_rate: escape_rate_gs,
            mean_molecular_weight: mean_weight,
        })?;
        check_length("velocity", &wind.velocity, n)?;
        check_length("density", &wind.density, n)?;

        let populations = self.solver.helium_populations(&HeliumPopulationRequest {
            radius_rp: &self.radius_rp,
            wind: &wind,
            ion_fraction: &ion_fraction,
            temperature: temperature_k,
            spectrum_at_planet: &self.spectrum_at_planet,
            initial_populations: self.settings.initial_helium_populations,
        })?;
        check_length("singlet", &populations.singlet, n)?;
        check_length("triplet", &populations.triplet, n)?;

        self.assemble(ion_fraction, mean_molecular_weight, wind, populations)
    }

    /// Number-density bookkeeping: split the total helium nuclei density
    /// among the singlet, triplet and ionized states.
    fn assemble(
        &self,
        ion_fraction: Array1<f64>,
        mean_molecular_weight: Array1<f64>,
        wind: WindStructure,
        populations: HeliumPopulations,
    ) -> Result<AtmosphericProfile, ModelError> {
        let neutral_weight = self.neutral_weight();
        let n_helium = wind
            .density
            .mapv(|rho| rho / neutral_weight * self.system.he_number_fraction);

        let mut n_he_singlet = Array1::zeros(n_helium.len());
        let mut n_he_triplet = Array1::zeros(n_helium.len());
        let mut n_he_ion = Array1::zeros(n_helium.len());
        for (i, &n_he) in n_helium.iter().enumerate() {
            let singlet = populations.singlet[i];
            let triplet = populations.triplet[i];
            let ionized = 1.0 - singlet - triplet;
            let physical = (0.0..=1.0).contains(&singlet)
                && (0.0..=1.0).contains(&triplet)
                && ionized >= -1e-6
                && n_he.is_finite()
                && n_he >= 0.0;
            if !physical {
                return Err(ModelError::instability(
                    "helium populations left the physical range",
                ));
            }
            n_he_singlet[i] = singlet * n_he;
            n_he_triplet[i] = triplet * n_he;
            n_he_ion[i] = ionized.max(0.0) * n_he;
        }

        Ok(AtmosphericProfile {
            radius_rp: self.radius_rp.clone(),
            ion_fraction,
            mean_molecular_weight,
            velocity: wind.velocity,
            density: wind.density,
            n_he_singlet,
            n_he_triplet,
            n_he_ion,
        })
    }
}

fn check_length(name: &'static str, array: &Array1<f64>, expected: usize) -> Result<(), ModelError> {
    if array.len() != expected {
        return Err(ModelError::ProfileLengthMismatch {
            name,
            actual: array.len(),
            expected,
        });
    }
    Ok(())
}
