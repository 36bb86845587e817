//! Age analysis extension module.
//!
//! Shipped inside the optional `FabrikamAgeAnalysis` package and loaded by the
//! host at runtime. Exports the `GetAge` entry point with the fixed
//! `extern "C" fn() -> i32` contract.

/// Age reported while no estimation model is bundled with the package.
pub const ESTIMATED_AGE: i32 = 42;

/// Returns the estimated age for the face currently analyzed by the host.
#[allow(non_snake_case)]
#[no_mangle]
pub extern "C" fn GetAge() -> i32 {
    ESTIMATED_AGE
}

#[cfg(test)]
mod tests {
    use super::{GetAge, ESTIMATED_AGE};

    #[test]
    fn get_age_returns_estimate() {
        assert_eq!(GetAge(), ESTIMATED_AGE);
    }
}
