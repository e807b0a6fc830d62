use enum_dispatch::enum_dispatch;
use ordered_float::NotNan;
use rand::{Rng, RngCore};
use rand_distr::{Normal, StandardNormal};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Maximum number of rejection-sampling attempts for [TruncatedNormalLnPrior1D::sample]
const MAX_REJECTIONS: usize = 10_000;

#[enum_dispatch]
pub trait LnPrior1DTrait:
    Clone + Debug + Serialize + DeserializeOwned + PartialEq + Eq + Hash
{
    /// Evaluate the natural logarithm of the prior at x
    ///
    /// If `grad` is `Some`, the gradient d(ln_prior)/dx is also computed and stored in it.
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64;

    /// Closed interval containing all the prior mass, bounds may be infinite
    fn support(&self) -> (f64, f64);

    /// Draw a single value from the prior distribution
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

/// Natural logarithm of prior for a single parameter of the starspot model
#[enum_dispatch(LnPrior1DTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LnPrior1D {
    HalfNormal(HalfNormalLnPrior1D),
    TruncatedNormal(TruncatedNormalLnPrior1D),
    Uniform(UniformLnPrior1D),
}

impl LnPrior1D {
    pub fn half_normal(std: f64) -> Self {
        HalfNormalLnPrior1D::new(std).into()
    }

    pub fn truncated_normal(mu: f64, std: f64, left: f64, right: f64) -> Self {
        TruncatedNormalLnPrior1D::new(mu, std, left, right).into()
    }

    pub fn uniform(left: f64, right: f64) -> Self {
        UniformLnPrior1D::new(left, right).into()
    }
}

/// Probability mass of `Normal(mu, std)` on `[left, right]`
pub(crate) fn normal_mass(mu: f64, std: f64, left: f64, right: f64) -> f64 {
    std_normal_cdf((right - mu) / std) - std_normal_cdf((left - mu) / std)
}

/// Standard normal cumulative distribution function
fn std_normal_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x * std::f64::consts::FRAC_1_SQRT_2)
}

/// Normal distribution folded at zero, supported on `[0, +inf)`
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "HalfNormalLnPrior1DParameters",
    from = "HalfNormalLnPrior1DParameters"
)]
pub struct HalfNormalLnPrior1D {
    std: NotNan<f64>,
    inv_std2: NotNan<f64>,
    ln_prob_coeff: NotNan<f64>,
}

impl HalfNormalLnPrior1D {
    pub fn new(std: f64) -> Self {
        assert!(std > 0.0, "std must be positive");
        Self {
            std: NotNan::new(std).expect("std must be not NaN"),
            inv_std2: NotNan::new(std.powi(-2)).expect("std must be positive and finite"),
            ln_prob_coeff: NotNan::new(
                std::f64::consts::LN_2 - f64::ln(std) - 0.5 * f64::ln(std::f64::consts::TAU),
            )
            .expect("std must be positive and finite"),
        }
    }

    fn std(&self) -> f64 {
        self.std.into_inner()
    }

    fn inv_std2(&self) -> f64 {
        self.inv_std2.into_inner()
    }

    fn ln_prob_coeff(&self) -> f64 {
        self.ln_prob_coeff.into_inner()
    }
}

impl LnPrior1DTrait for HalfNormalLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        if x.is_nan() || x < 0.0 {
            if let Some(g) = grad {
                *g = 0.0;
            }
            return f64::NEG_INFINITY;
        }
        if let Some(g) = grad {
            *g = -x * self.inv_std2();
        }
        self.ln_prob_coeff() - 0.5 * x.powi(2) * self.inv_std2()
    }

    fn support(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.std() * z.abs()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "HalfNormalLnPrior1D")]
struct HalfNormalLnPrior1DParameters {
    std: f64,
}

impl From<HalfNormalLnPrior1D> for HalfNormalLnPrior1DParameters {
    fn from(f: HalfNormalLnPrior1D) -> Self {
        Self { std: f.std() }
    }
}

impl From<HalfNormalLnPrior1DParameters> for HalfNormalLnPrior1D {
    fn from(f: HalfNormalLnPrior1DParameters) -> Self {
        Self::new(f.std)
    }
}

/// Normal distribution restricted to `[left, right]` and renormalised
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "TruncatedNormalLnPrior1DParameters",
    from = "TruncatedNormalLnPrior1DParameters"
)]
pub struct TruncatedNormalLnPrior1D {
    mu: NotNan<f64>,
    std: NotNan<f64>,
    range: std::ops::RangeInclusive<NotNan<f64>>,
    inv_std2: NotNan<f64>,
    ln_prob_coeff: NotNan<f64>,
}

impl TruncatedNormalLnPrior1D {
    pub fn new(mu: f64, std: f64, left: f64, right: f64) -> Self {
        assert!(std > 0.0, "std must be positive");
        assert!(left < right, "left must be smaller than right");
        let mass = normal_mass(mu, std, left, right);
        Self {
            mu: NotNan::new(mu).expect("mu must be not NaN"),
            std: NotNan::new(std).expect("std must be not NaN"),
            range: NotNan::new(left).expect("left must be not NaN")
                ..=NotNan::new(right).expect("right must be not NaN"),
            inv_std2: NotNan::new(std.powi(-2)).expect("std must be positive and finite"),
            ln_prob_coeff: NotNan::new(
                -f64::ln(std) - 0.5 * f64::ln(std::f64::consts::TAU) - f64::ln(mass),
            )
            .expect("truncation interval must hold non-zero probability mass"),
        }
    }

    fn mu(&self) -> f64 {
        self.mu.into_inner()
    }

    fn std(&self) -> f64 {
        self.std.into_inner()
    }

    fn left(&self) -> f64 {
        self.range.start().into_inner()
    }

    fn right(&self) -> f64 {
        self.range.end().into_inner()
    }

    fn inv_std2(&self) -> f64 {
        self.inv_std2.into_inner()
    }

    fn ln_prob_coeff(&self) -> f64 {
        self.ln_prob_coeff.into_inner()
    }
}

impl LnPrior1DTrait for TruncatedNormalLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        let inside = NotNan::new(x).is_ok_and(|x| self.range.contains(&x));
        if !inside {
            if let Some(g) = grad {
                *g = 0.0;
            }
            return f64::NEG_INFINITY;
        }
        let diff = self.mu() - x;
        if let Some(g) = grad {
            *g = diff * self.inv_std2();
        }
        self.ln_prob_coeff() - 0.5 * diff.powi(2) * self.inv_std2()
    }

    fn support(&self) -> (f64, f64) {
        (self.left(), self.right())
    }

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        let normal = Normal::new(self.mu(), self.std()).expect("std is positive and finite");
        for _ in 0..MAX_REJECTIONS {
            let x = rng.sample(normal);
            if (self.left()..=self.right()).contains(&x) {
                return x;
            }
        }
        // Interval is far in the tail, fall back to a uniform draw
        rng.random_range(self.left()..=self.right())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "TruncatedNormalLnPrior1D")]
struct TruncatedNormalLnPrior1DParameters {
    mu: f64,
    std: f64,
    range: std::ops::RangeInclusive<f64>,
}

impl From<TruncatedNormalLnPrior1D> for TruncatedNormalLnPrior1DParameters {
    fn from(f: TruncatedNormalLnPrior1D) -> Self {
        Self {
            mu: f.mu(),
            std: f.std(),
            range: f.left()..=f.right(),
        }
    }
}

impl From<TruncatedNormalLnPrior1DParameters> for TruncatedNormalLnPrior1D {
    fn from(f: TruncatedNormalLnPrior1DParameters) -> Self {
        Self::new(f.mu, f.std, *f.range.start(), *f.range.end())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "UniformLnPrior1DParameters",
    from = "UniformLnPrior1DParameters"
)]
pub struct UniformLnPrior1D {
    range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob: NotNan<f64>,
}

impl UniformLnPrior1D {
    pub fn new(left: f64, right: f64) -> Self {
        let left = NotNan::new(left).expect("left must be finite");
        let right = NotNan::new(right).expect("right must be finite");
        Self {
            range: left..=right,
            ln_prob: NotNan::new(-f64::ln(right.into_inner() - left.into_inner()))
                .expect("right must be larger than left"),
        }
    }

    fn left(&self) -> f64 {
        self.range.start().into_inner()
    }

    fn right(&self) -> f64 {
        self.range.end().into_inner()
    }

    fn ln_prob(&self) -> f64 {
        self.ln_prob.into_inner()
    }
}

impl LnPrior1DTrait for UniformLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        if let Some(g) = grad {
            *g = 0.0;
        }
        match NotNan::new(x) {
            Ok(x) if self.range.contains(&x) => self.ln_prob(),
            _ => f64::NEG_INFINITY,
        }
    }

    fn support(&self) -> (f64, f64) {
        (self.left(), self.right())
    }

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        rng.random_range(self.left()..=self.right())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformLnPrior")]
struct UniformLnPrior1DParameters {
    range: std::ops::RangeInclusive<f64>,
}

impl From<UniformLnPrior1D> for UniformLnPrior1DParameters {
    fn from(f: UniformLnPrior1D) -> Self {
        Self {
            range: f.left()..=f.right(),
        }
    }
}

impl From<UniformLnPrior1DParameters> for UniformLnPrior1D {
    fn from(f: UniformLnPrior1DParameters) -> Self {
        Self::new(*f.range.start(), *f.range.end())
    }
}
