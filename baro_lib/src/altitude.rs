//! Correction of station pressure for a fixed site altitude.

/// Multiplicative factor from the barometric formula,
/// `(1 - altitude / 44330)^5.255`, computed once per process.
///
/// A site altitude at or above 44330 m would make the factor
/// non-positive; that is a configuration mistake, not a runtime case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeFactor(f64);

impl AltitudeFactor {
    pub fn for_site(altitude_m: f64) -> Self {
        Self(libm::pow(1.0 - altitude_m / 44330.0, 5.255))
    }

    pub fn factor(&self) -> f64 {
        self.0
    }

    /// Station pressure to sea-level-equivalent pressure.
    pub fn correct(&self, pressure_hpa: f64) -> f64 {
        pressure_hpa / self.0
    }
}
