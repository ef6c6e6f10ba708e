//! Gaussian log-likelihood of an observed transmission spectrum under the
//! forward model, with explicit rejection of infeasible parameter vectors.

use crate::error::{DataError, ModelError};
use crate::forward::{FreeParameters, TransmissionModel};
use crate::spectrum::ObservedSpectrum;

use std::f64::consts::TAU;

use itertools::izip;
use ndarray::Array1;

/// Outcome of one likelihood evaluation.
///
/// `Rejected` marks θ as infeasible (the atmospheric solve blew up or the
/// prediction contains non-finite values); its numeric value is negative
/// infinity, which a derivative-free optimizer treats as a disallowed
/// region without aborting the search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LnLikelihood {
    Finite(f64),
    Rejected,
}

impl LnLikelihood {
    pub fn value(self) -> f64 {
        match self {
            Self::Finite(value) => value,
            Self::Rejected => f64::NEG_INFINITY,
        }
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Compares model predictions to an observed spectrum under an
/// independent-Gaussian-noise model:
///
/// `ln L = -0.5 Σ [(yₙ - mₙ)²/σₙ² + ln(2π σₙ²)]`
pub struct LikelihoodEvaluator<M> {
    model: M,
    flux: Array1<f64>,
    sigma: Array1<f64>,
}

impl<M: TransmissionModel> LikelihoodEvaluator<M> {
    pub fn new(model: M, observed: &ObservedSpectrum) -> Result<Self, DataError> {
        if observed.is_empty() {
            return Err(DataError::EmptyTable { skipped: 0 });
        }
        Ok(Self {
            model,
            flux: observed.flux.clone(),
            sigma: observed.sigma.clone(),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Evaluate the log-likelihood at θ.
    ///
    /// Exactly [`ModelError::NumericalInstability`] is recovered into
    /// `Ok(LnLikelihood::Rejected)`; every other failure kind indicates a
    /// defect and propagates.
    pub fn ln_likelihood(&self, parameters: &FreeParameters) -> Result<LnLikelihood, ModelError> {
        let predicted = match self.model.predict(parameters) {
            Ok(predicted) => predicted,
            Err(ModelError::NumericalInstability { .. }) => return Ok(LnLikelihood::Rejected),
            Err(error) => return Err(error),
        };
        if predicted.len() != self.flux.len() {
            return Err(ModelError::ProfileLengthMismatch {
                name: "predicted spectrum",
                actual: predicted.len(),
                expected: self.flux.len(),
            });
        }
        // NaN in the prediction must not leak into the objective surface
        if predicted.iter().any(|value| !value.is_finite()) {
            return Ok(LnLikelihood::Rejected);
        }

        let ln_likelihood: f64 = izip!(&self.flux, &self.sigma, &predicted)
            .map(|(&flux, &sigma, &model)| {
                let residual = (flux - model) / sigma;
                -0.5 * (residual * residual + (TAU * sigma * sigma).ln())
            })
            .sum();
        Ok(LnLikelihood::Finite(ln_likelihood))
    }
}
