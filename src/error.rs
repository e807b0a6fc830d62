/// Error returned when a [crate::LightCurve] cannot be constructed or used
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LightCurveError {
    #[error("light curve must be non-empty")]
    Empty,

    #[error("{name} has length {actual}, but time has length {expected}")]
    LengthMismatch {
        name: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("time must be non-decreasing")]
    Unsorted,

    #[error("{0} must contain finite values only")]
    NonFinite(&'static str),

    #[error("flux errors must be positive")]
    NonPositiveError,
}

/// Error returned from [crate::ModelBuilder] and [crate::ModelConfig::validate]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("rotation period must be positive and finite, got {0}")]
    RotationPeriod(f64),

    #[error("number of spots must be at least one")]
    NoSpots,

    #[error("latitude cutoff must be in [0, 90) degrees, got {0}")]
    LatitudeCutoff(f64),

    #[error("error scale must be finite and not less than unity, got {0}")]
    ScaleError(f64),

    #[error("subsampling stride must be positive")]
    ZeroStride,

    #[error("observations must be attached before the model is built")]
    NotObserved,

    #[error("wrong number of parameters {actual}, model has {expected}")]
    ParameterCount { actual: usize, expected: usize },

    #[error("gradient buffer has length {actual}, but {expected} parameters are given")]
    GradientLength { actual: usize, expected: usize },

    #[error("parameter {index} is declared as {actual}, but the model expects {expected}")]
    ParameterName {
        index: usize,
        actual: String,
        expected: String,
    },

    #[error(transparent)]
    LightCurve(#[from] LightCurveError),
}

/// Error returned from [crate::GpDetrend]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DetrendError {
    #[error(transparent)]
    LightCurve(#[from] LightCurveError),

    #[error("GP hyperparameters must be finite, got log_sigma={log_sigma}, log_rho={log_rho}")]
    Hyperparameters { log_sigma: f64, log_rho: f64 },

    #[error("GP covariance matrix is not positive definite")]
    SingularCovariance,

    #[error("GP trend is zero or non-finite at index {0}")]
    DegenerateTrend(usize),

    #[error("cannot render diagnostic plot: {0}")]
    Plot(String),
}

/// Error returned from samplers and [crate::Session] sampling methods
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("model must be built with Session::build_model before specifying a sampler")]
    ModelNotBuilt,

    #[error("number of draws must be positive")]
    ZeroDraws,

    #[error("number of cores and chains must be positive")]
    ZeroCores,

    #[error("target acceptance rate must be in (0, 1), got {0}")]
    TargetAccept(f64),

    #[error("SMC resampling threshold must be in (0, 1], got {0}")]
    Threshold(f64),

    #[error("start point is outside of the prior support: {0}")]
    Start(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("cannot build sampler thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("ensemble sampler failed: {0}")]
    Emcee(String),

    #[error("NUTS sampler failed in chain {chain}: {message}")]
    Nuts { chain: usize, message: String },

    #[error("SMC collapsed: all particle weights are zero at stage {stage} (beta = {beta})")]
    Degenerate { stage: usize, beta: f64 },
}
