#![doc = include_str!("../README.md")]


mod data;
pub use data::{LightCurve, ObservedData};

pub mod detrend;
pub use detrend::GpDetrend;

mod error;
pub use error::{DetrendError, LightCurveError, ModelError, SamplerError};

pub mod inference;
pub use inference::prior::{LnPrior, LnPrior1D, LnPrior1DTrait, Transform};
pub use inference::{LikeFloat, NutsSampler, SamplerAlgorithm, SamplerTrait, SmcSampler, Trace};

pub mod quiet;
pub use quiet::QuietGuard;

mod session;
pub use session::Session;

pub mod spot_model;
pub use spot_model::{
    CONTRAST, GlobalParameters, ModelBuilder, ModelConfig, SpotModel, SpotParameters,
};

mod types;

pub use ndarray;
