use crate::inference::LikeFloat;

use serde::{Deserialize, Serialize};

/// Number of parameters shared by all spots
pub const N_GLOBAL: usize = 4;

/// Number of parameters of a single spot
pub const N_PER_SPOT: usize = 3;

/// Star-wide parameters
///
/// - `f0`: baseline flux offset, the unspotted flux is `1 + f0`
/// - `p_eq`: equatorial rotation period
/// - `shear`: differential rotation shear
/// - `comp_inc`: inclination of the rotation axis, radians
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalParameters<U = f64> {
    pub f0: U,
    pub p_eq: U,
    pub shear: U,
    pub comp_inc: U,
}

impl GlobalParameters {
    pub const NAMES: [&'static str; N_GLOBAL] = ["f0", "P_eq", "shear", "comp_inc"];
}

impl<U: LikeFloat> GlobalParameters<U> {
    /// Read from the head of a parameter vector
    pub fn from_slice(params: &[U]) -> Self {
        Self {
            f0: params[0],
            p_eq: params[1],
            shear: params[2],
            comp_inc: params[3],
        }
    }

    pub fn to_array(&self) -> [U; N_GLOBAL] {
        [self.f0, self.p_eq, self.shear, self.comp_inc]
    }
}

/// Parameters of a single spot
///
/// - `lon`: longitude, radians, within the spot's own wedge
/// - `lat`: colatitude, radians, measured from the pole
/// - `r_spot`: spot radius in units of the stellar radius
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpotParameters<U = f64> {
    pub lon: U,
    pub lat: U,
    pub r_spot: U,
}

impl SpotParameters {
    /// Parameter names of the spot with index `i`
    pub fn names(i: usize) -> [String; N_PER_SPOT] {
        [format!("lon_{i}"), format!("lat_{i}"), format!("R_spot_{i}")]
    }
}

impl<U: LikeFloat> SpotParameters<U> {
    pub fn from_slice(params: &[U]) -> Self {
        Self {
            lon: params[0],
            lat: params[1],
            r_spot: params[2],
        }
    }

    pub fn to_array(&self) -> [U; N_PER_SPOT] {
        [self.lon, self.lat, self.r_spot]
    }
}

/// Split a full parameter vector into global and per-spot parameters
///
/// The length must be `N_GLOBAL + N_PER_SPOT * n_spots`.
pub fn unpack<U: LikeFloat>(params: &[U]) -> (GlobalParameters<U>, Vec<SpotParameters<U>>) {
    let (globals, spots) = params.split_at(N_GLOBAL);
    (
        GlobalParameters::from_slice(globals),
        spots
            .chunks_exact(N_PER_SPOT)
            .map(SpotParameters::from_slice)
            .collect(),
    )
}

/// Join global and per-spot parameters into a full parameter vector
pub fn pack<U: LikeFloat>(globals: &GlobalParameters<U>, spots: &[SpotParameters<U>]) -> Vec<U> {
    globals
        .to_array()
        .into_iter()
        .chain(spots.iter().flat_map(|spot| spot.to_array()))
        .collect()
}

/// Full list of parameter names for `n_spots` spots
pub fn parameter_names(n_spots: usize) -> Vec<String> {
    GlobalParameters::NAMES
        .iter()
        .map(|name| name.to_string())
        .chain((0..n_spots).flat_map(SpotParameters::names))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_order() {
        assert_eq!(
            parameter_names(2),
            [
                "f0", "P_eq", "shear", "comp_inc", "lon_0", "lat_0", "R_spot_0", "lon_1", "lat_1",
                "R_spot_1"
            ]
        );
    }

    #[test]
    fn pack_unpack() {
        let params: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (globals, spots) = unpack(&params);
        assert_eq!(globals.p_eq, 1.0);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[1].lat, 8.0);
        assert_eq!(pack(&globals, &spots), params);
    }
}
