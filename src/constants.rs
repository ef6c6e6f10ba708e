//! Physical and spectroscopic constants used across the forward model.
//!
//! All values are SI unless the name says otherwise. Helium triplet line
//! data are the NIST values for the metastable 2³S → 2³P transitions near
//! 1.083 μm, quoted as air wavelengths to match the air-corrected observed
//! wavelength grid.

/// Speed of light [m/s].
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8;

/// Boltzmann constant [J/K].
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Atomic mass unit [kg].
pub const ATOMIC_MASS_UNIT: f64 = 1.66053906660e-27;

/// Mass of a hydrogen atom [kg].
pub const HYDROGEN_MASS: f64 = 1.00784 * ATOMIC_MASS_UNIT;

/// Mass of a helium atom [kg].
pub const HELIUM_MASS: f64 = 4.002602 * ATOMIC_MASS_UNIT;

/// One angstrom [m].
pub const ANGSTROM: f64 = 1e-10;

/// A single component of the helium 2³S triplet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TripletLine {
    /// Line center, air wavelength [Å].
    pub wavelength_air_angstrom: f64,
    /// Dimensionless oscillator strength.
    pub oscillator_strength: f64,
}

impl TripletLine {
    /// Line center, air wavelength [m].
    pub fn wavelength_m(&self) -> f64 {
        self.wavelength_air_angstrom * ANGSTROM
    }
}

/// The three helium-triplet components, ordered by wavelength.
pub const HELIUM_TRIPLET_LINES: [TripletLine; 3] = [
    TripletLine {
        wavelength_air_angstrom: 10829.0911,
        oscillator_strength: 5.9902e-2,
    },
    TripletLine {
        wavelength_air_angstrom: 10830.2501,
        oscillator_strength: 1.7974e-1,
    },
    TripletLine {
        wavelength_air_angstrom: 10830.3398,
        oscillator_strength: 2.9958e-1,
    },
];

/// Einstein A coefficient shared by the three triplet components [1/s].
pub const HELIUM_TRIPLET_EINSTEIN_A: f64 = 1.0216e7;
