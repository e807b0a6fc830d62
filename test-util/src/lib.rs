pub use synthetic::{
    ONE_SPOT_LIGHT_CURVE, ONE_SPOT_PARAMS, SPOTTED_LIGHT_CURVES, TripleArray,
    flat_light_curve, spotted_light_curve, trended_light_curve,
};

mod synthetic;
