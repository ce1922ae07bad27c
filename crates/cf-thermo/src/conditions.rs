//! Gas reference states used by the formulas.

/// Pseudo-critical point of the gas mixture used by the compressibility correlation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CriticalPoint {
    /// Critical temperature (K)
    pub temperature: f64,
    /// Critical pressure (MPa)
    pub pressure: f64,
}

impl Default for CriticalPoint {
    fn default() -> Self {
        Self {
            temperature: 190.0,
            pressure: 4.6,
        }
    }
}

/// Conditions at which commercial flow is metered.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceConditions {
    /// Reference pressure (MPa)
    pub pressure: f64,
    /// Reference temperature (K)
    pub temperature: f64,
}

impl Default for ReferenceConditions {
    fn default() -> Self {
        Self {
            pressure: 0.101_325,
            temperature: 283.0,
        }
    }
}
