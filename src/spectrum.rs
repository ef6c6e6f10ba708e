//! Observed-spectrum ingestion, air–vacuum wavelength correction and the
//! instrumental response kernel.
//!
//! Transmission-spectroscopy tables are published with vacuum wavelengths
//! while the helium-triplet line list used downstream is quoted in air, so
//! the loader converts the wavelength column on read. Both conversions are
//! pure functions of the input array.

use crate::constants::SPEED_OF_LIGHT;
use crate::error::DataError;

use itertools::Itertools;
use ndarray::Array1;

/// Refractive index of standard air at the given vacuum wavelength [Å],
/// from the Edlén-type dispersion formula.
fn air_refractive_index(wavelength_vacuum_angstrom: f64) -> f64 {
    // s is the vacuum wavenumber in inverse micrometers.
    let s = 1e4 / wavelength_vacuum_angstrom;
    let s2 = s * s;
    1.0 + 8.34254e-5 + 2.406147e-2 / (130.0 - s2) + 1.5998e-4 / (38.9 - s2)
}

/// Convert vacuum wavelengths [Å] to air wavelengths [Å].
///
/// The refractive index is evaluated once at the mean vacuum wavelength, so
/// the conversion is a single rescaling of the whole array.
pub fn vacuum_to_air(wavelength_vacuum_angstrom: &Array1<f64>) -> Array1<f64> {
    let mean = wavelength_vacuum_angstrom.mean().unwrap_or(f64::NAN);
    let n = air_refractive_index(mean);
    wavelength_vacuum_angstrom / n
}

/// Convert air wavelengths [Å] back to vacuum wavelengths [Å].
///
/// Approximate inverse of [`vacuum_to_air`]: the index is evaluated at the
/// mean *air* wavelength, which differs from the forward direction by a few
/// parts in 10⁹ at 1.083 μm.
pub fn air_to_vacuum(wavelength_air_angstrom: &Array1<f64>) -> Array1<f64> {
    let mean = wavelength_air_angstrom.mean().unwrap_or(f64::NAN);
    let n = air_refractive_index(mean);
    wavelength_air_angstrom * n
}

/// Parse a whitespace-delimited numeric table with exactly `N` columns per
/// row, skipping `skip_rows` leading rows. Blank lines are ignored; line
/// numbers in errors are 1-based over the raw text.
fn parse_table<const N: usize>(text: &str, skip_rows: usize) -> Result<Vec<[f64; N]>, DataError> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate().skip(skip_rows) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != N {
            return Err(DataError::ColumnCount {
                line: index + 1,
                expected: N,
                found: fields.len(),
            });
        }
        let mut row = [0.0; N];
        for (slot, field) in row.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|source| DataError::MalformedNumber {
                line: index + 1,
                source,
            })?;
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(DataError::EmptyTable { skipped: skip_rows });
    }
    Ok(rows)
}

fn check_strictly_increasing(wavelength: &Array1<f64>) -> Result<(), DataError> {
    if let Some((index, _)) = wavelength
        .iter()
        .tuple_windows()
        .enumerate()
        .find(|(_, (a, b))| a >= b)
    {
        return Err(DataError::NonMonotonicWavelength { index: index + 1 });
    }
    Ok(())
}

/// An observed transmission spectrum on an air-corrected wavelength grid.
///
/// `flux` is the normalized in-transit flux (1 means no excess absorption),
/// `sigma` its one-sigma uncertainty in the same fractional units.
#[derive(Clone, Debug)]
pub struct ObservedSpectrum {
    pub wavelength_air_angstrom: Array1<f64>,
    pub flux: Array1<f64>,
    pub sigma: Array1<f64>,
}

impl ObservedSpectrum {
    pub fn new(
        wavelength_air_angstrom: Array1<f64>,
        flux: Array1<f64>,
        sigma: Array1<f64>,
    ) -> Result<Self, DataError> {
        let n = wavelength_air_angstrom.len();
        if n == 0 {
            return Err(DataError::EmptyTable { skipped: 0 });
        }
        for (name, len) in [("flux", flux.len()), ("sigma", sigma.len())] {
            if len != n {
                return Err(DataError::LengthMismatch {
                    name,
                    actual: len,
                    expected: n,
                });
            }
        }
        check_strictly_increasing(&wavelength_air_angstrom)?;
        if sigma.iter().any(|&s| !(s > 0.0)) {
            return Err(DataError::InvalidConfiguration(
                "flux uncertainties must be positive".into(),
            ));
        }
        Ok(Self {
            wavelength_air_angstrom,
            flux,
            sigma,
        })
    }

    /// Read a three-column table: vacuum wavelength [Å], absorption depth
    /// [%] and its uncertainty [%]. Depths become normalized flux
    /// (`1 + depth/100`), wavelengths are converted to air.
    pub fn from_table_str(text: &str, skip_rows: usize) -> Result<Self, DataError> {
        let rows = parse_table::<3>(text, skip_rows)?;
        let wavelength_vacuum: Array1<f64> = rows.iter().map(|r| r[0]).collect();
        let flux: Array1<f64> = rows.iter().map(|r| 1.0 + r[1] / 100.0).collect();
        let sigma: Array1<f64> = rows.iter().map(|r| r[2] / 100.0).collect();
        Self::new(vacuum_to_air(&wavelength_vacuum), flux, sigma)
    }

    pub fn len(&self) -> usize {
        self.wavelength_air_angstrom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength_air_angstrom.is_empty()
    }

    pub fn mean_wavelength(&self) -> f64 {
        // new() rejects empty grids, so the mean always exists
        self.wavelength_air_angstrom.mean().unwrap()
    }

    /// Mean spacing of the wavelength grid [Å].
    pub fn mean_step(&self) -> f64 {
        let w = &self.wavelength_air_angstrom;
        (w[w.len() - 1] - w[0]) / (w.len() - 1) as f64
    }
}

/// Host-star (or reference) spectral energy distribution: wavelength [Å]
/// against flux density [erg/s/cm²/Å]. Fed to the atmospheric solver as the
/// "spectrum at planet" irradiation table.
#[derive(Clone, Debug)]
pub struct ReferenceSpectrum {
    pub wavelength_angstrom: Array1<f64>,
    pub flux_density: Array1<f64>,
}

impl ReferenceSpectrum {
    pub fn new(
        wavelength_angstrom: Array1<f64>,
        flux_density: Array1<f64>,
    ) -> Result<Self, DataError> {
        if wavelength_angstrom.is_empty() {
            return Err(DataError::EmptyTable { skipped: 0 });
        }
        if flux_density.len() != wavelength_angstrom.len() {
            return Err(DataError::LengthMismatch {
                name: "flux_density",
                actual: flux_density.len(),
                expected: wavelength_angstrom.len(),
            });
        }
        check_strictly_increasing(&wavelength_angstrom)?;
        Ok(Self {
            wavelength_angstrom,
            flux_density,
        })
    }

    /// Read a two-column table: wavelength [Å], flux density [erg/s/cm²/Å].
    pub fn from_table_str(text: &str, skip_rows: usize) -> Result<Self, DataError> {
        let rows = parse_table::<2>(text, skip_rows)?;
        Self::new(
            rows.iter().map(|r| r[0]).collect(),
            rows.iter().map(|r| r[1]).collect(),
        )
    }
}

/// Normalized Gaussian instrumental response sampled on the data's
/// wavelength grid spacing.
#[derive(Clone, Debug)]
pub struct InstrumentalKernel {
    weights: Array1<f64>,
}

impl InstrumentalKernel {
    /// Build a Gaussian kernel from a resolution element given as a FWHM in
    /// velocity units.
    ///
    /// The FWHM [m/s] is converted to a wavelength sigma via the mean
    /// wavelength and the speed of light. `n_samples` must be odd so the
    /// kernel stays symmetric around zero offset.
    pub fn gaussian(
        fwhm_velocity_ms: f64,
        mean_wavelength_angstrom: f64,
        step_angstrom: f64,
        n_samples: usize,
    ) -> Result<Self, DataError> {
        if n_samples < 3 || n_samples % 2 == 0 {
            return Err(DataError::InvalidConfiguration(format!(
                "kernel sample count must be odd and at least 3, got {n_samples}"
            )));
        }
        if !(fwhm_velocity_ms > 0.0) || !(step_angstrom > 0.0) || !(mean_wavelength_angstrom > 0.0)
        {
            return Err(DataError::InvalidConfiguration(
                "kernel FWHM, grid step and mean wavelength must be positive".into(),
            ));
        }
        let fwhm_wl = mean_wavelength_angstrom * fwhm_velocity_ms / SPEED_OF_LIGHT;
        let sigma_wl = fwhm_wl / (2.0 * (2.0 * f64::ln(2.0)).sqrt());
        let half = (n_samples / 2) as isize;
        let mut weights: Array1<f64> = (-half..=half)
            .map(|i| {
                let x = i as f64 * step_angstrom / sigma_wl;
                (-0.5 * x * x).exp()
            })
            .collect();
        weights /= weights.sum();
        Ok(Self { weights })
    }

    /// Kernel matched to an observed spectrum: mean wavelength and mean
    /// grid step taken from the data.
    pub fn matched_to(
        observed: &ObservedSpectrum,
        fwhm_velocity_ms: f64,
        n_samples: usize,
    ) -> Result<Self, DataError> {
        Self::gaussian(
            fwhm_velocity_ms,
            observed.mean_wavelength(),
            observed.mean_step(),
            n_samples,
        )
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Convolve a signal with the kernel, replicating edge values beyond
    /// the array bounds. Output length equals input length.
    pub fn convolve(&self, signal: &Array1<f64>) -> Array1<f64> {
        let n = signal.len() as isize;
        let half = (self.weights.len() / 2) as isize;
        Array1::from_shape_fn(signal.len(), |i| {
            self.weights
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let j = (i as isize + k as isize - half).clamp(0, n - 1);
                    w * signal[j as usize]
                })
                .sum()
        })
    }
}
