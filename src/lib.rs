pub mod analysis;
pub mod cleaning;
pub mod config;
pub mod dashboard;
pub mod data_generation;
pub mod data_ingestion;
pub mod error;
pub mod export;
pub mod model;

pub use data_generation::generate_mock_data;
pub use error::{PipelineError, Result};

/// Rounds to cents, the precision every monetary figure is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(2.675_1), 2.68);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(-1.005_1), -1.01);
        assert_eq!(round2(0.0), 0.0);
    }
}
