//! Maximum-likelihood fit driver.
//!
//! Minimizes the negative log-likelihood over θ with COBYLA, a
//! derivative-free optimizer. The likelihood surface is discontinuous at
//! solver-failure boundaries (rejected regions evaluate to -∞), which rules
//! out gradient-based methods; COBYLA only ever sees a total objective
//! function with infeasible regions mapped to +∞.

use crate::error::ModelError;
use crate::forward::{FreeParameters, TransmissionModel};
use crate::likelihood::{LikelihoodEvaluator, LnLikelihood};

use std::cell::RefCell;

use cobyla::{Func, RhoBeg, StopTols, minimize};
use serde::{Deserialize, Serialize};

/// Optimizer options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Maximum number of objective evaluations.
    pub max_evaluations: usize,
    /// Initial change applied to the parameters.
    pub rhobeg: f64,
    /// Relative tolerance on the objective value for convergence.
    pub ftol_rel: f64,
    /// Optional (lower, upper) box per parameter, in θ order.
    pub bounds: Option<[(f64, f64); FreeParameters::NPARAMS]>,
}

impl FitOptions {
    pub fn default_max_evaluations() -> usize {
        1000
    }

    pub fn default_rhobeg() -> f64 {
        0.5
    }

    pub fn default_ftol_rel() -> f64 {
        1e-6
    }
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: Self::default_max_evaluations(),
            rhobeg: Self::default_rhobeg(),
            ftol_rel: Self::default_ftol_rel(),
            bounds: None,
        }
    }
}

/// Best-effort fit result. Non-convergence is a diagnostic, not an error:
/// `converged` is false when the evaluation budget ran out first, and the
/// caller decides whether to accept or restart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FitOutcome {
    pub parameters: FreeParameters,
    /// Log-likelihood at `parameters`.
    pub ln_likelihood: f64,
    pub converged: bool,
}

/// Minimize the negative log-likelihood starting from `initial`.
///
/// Rejected parameter vectors surface to the optimizer as a +∞ objective.
/// A non-instability [`ModelError`] raised during any evaluation is stashed
/// and re-raised after the run, so the objective stays total while defects
/// still abort the fit.
pub fn fit<M: TransmissionModel>(
    evaluator: &LikelihoodEvaluator<M>,
    initial: &FreeParameters,
    options: &FitOptions,
) -> Result<FitOutcome, ModelError> {
    let failure: RefCell<Option<ModelError>> = RefCell::new(None);

    let objective = |x: &[f64], _user_data: &mut ()| -> f64 {
        // Safety: COBYLA guarantees that x has the same length as x0
        let parameters = FreeParameters::from_array(x.try_into().unwrap());
        match evaluator.ln_likelihood(&parameters) {
            Ok(LnLikelihood::Finite(value)) => -value,
            Ok(LnLikelihood::Rejected) => f64::INFINITY,
            Err(error) => {
                failure.borrow_mut().get_or_insert(error);
                f64::INFINITY
            }
        }
    };

    let bounds: Vec<(f64, f64)> = match options.bounds {
        Some(bounds) => bounds.to_vec(),
        None => vec![(f64::NEG_INFINITY, f64::INFINITY); FreeParameters::NPARAMS],
    };
    let constraints: Vec<&dyn Func<()>> = vec![];
    let stop_tol = StopTols {
        ftol_rel: options.ftol_rel,
        ..StopTols::default()
    };

    let x0 = initial.to_array();
    let result = minimize(
        objective,
        &x0,
        &bounds,
        &constraints,
        (),
        options.max_evaluations,
        RhoBeg::All(options.rhobeg),
        Some(stop_tol),
    );

    if let Some(error) = failure.into_inner() {
        return Err(error);
    }

    let (best, objective_value, converged) = match result {
        Ok((status, best, objective_value)) => {
            let converged = matches!(
                status,
                cobyla::SuccessStatus::Success
                    | cobyla::SuccessStatus::FtolReached
                    | cobyla::SuccessStatus::XtolReached
            );
            (best, objective_value, converged)
        }
        Err((_status, best, objective_value)) => (best, objective_value, false),
    };
    // Safety: COBYLA returns a vector with the same length as x0
    let parameters = FreeParameters::from_array(best.try_into().unwrap());
    Ok(FitOutcome {
        parameters,
        ln_likelihood: -objective_value,
        converged,
    })
}
