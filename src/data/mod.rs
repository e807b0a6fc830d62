mod light_curve;
pub use light_curve::LightCurve;

mod observed;
pub use observed::ObservedData;
