//! Engine-native units.
//!
//! The engine reports lengths in millimetres, times in nanoseconds and
//! energies in MeV. Divide by one of these constants to express a value in
//! that unit, e.g. `x / units::CM` or `e / units::GEV`.

/// Millimetre (engine length unit)
pub const MM: f64 = 1.0;

/// Centimetre
pub const CM: f64 = 10.0 * MM;

/// Nanosecond (engine time unit)
pub const NS: f64 = 1.0;

/// MeV (engine energy unit)
pub const MEV: f64 = 1.0;

/// GeV
pub const GEV: f64 = 1000.0 * MEV;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ratios() {
        assert_eq!(25.0 / CM, 2.5);
        assert_eq!(1500.0 / GEV, 1.5);
        assert_eq!(3.0 / NS, 3.0);
    }
}
