#![doc = include_str!("../README.md")]

mod atmosphere;
pub use atmosphere::{
    AtmosphereModel, AtmosphericProfile, AtmosphericStateSolver, HeliumPopulationRequest,
    HeliumPopulations, IonBalance, IonBalanceRequest, WindStructure, WindStructureRequest,
};

pub mod constants;

mod config;
pub use config::{ForwardModelSettings, SystemConfig};

mod error;
pub use error::{DataError, ModelError};

mod fit;
pub use fit::{FitOptions, FitOutcome, fit};

mod forward;
pub use forward::{ForwardModel, FreeParameters, TransmissionModel};

mod geometry;
pub use geometry::{TransitGeometry, build_transit_geometry};

mod likelihood;
pub use likelihood::{LikelihoodEvaluator, LnLikelihood};

mod spectrum;
pub use spectrum::{
    InstrumentalKernel, ObservedSpectrum, ReferenceSpectrum, air_to_vacuum, vacuum_to_air,
};

mod transfer;
pub use transfer::{BroadeningMethod, RadiativeTransferEvaluator, RadiativeTransferRequest};

#[cfg(test)]
mod test_support;

pub use ndarray;
