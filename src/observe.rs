use crate::codec;
use crate::error::{RecoveryError, RecoveryResult};

/// A validated generator output and its position in the observed stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub index: usize,
    pub value: f64,
}

impl Observation {
    pub fn mantissa(&self) -> u64 { codec::encode(self.value) }
}

/// Rejects empty input and any value that is not a finite double in `[0, 1)`.
pub fn validate(values: &[f64]) -> RecoveryResult<Vec<Observation>> {
    if values.is_empty() { return Err(RecoveryError::NoObservations); }
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value.is_finite() && (0.0..1.0).contains(&value) {
                Ok(Observation { index, value })
            } else {
                Err(RecoveryError::MalformedObservation { index, value })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    #[case(1.0)]
    #[case(-0.25)]
    #[case(3.5)]
    fn rejects_values_outside_unit_interval(#[case] bad: f64) {
        let err = validate(&[0.5, bad]).unwrap_err();
        assert!(matches!(err, RecoveryError::MalformedObservation { index: 1, .. }));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(validate(&[]), Err(RecoveryError::NoObservations)));
    }

    #[test]
    fn keeps_order_and_positions() {
        let obs = validate(&[0.0, 0.25, 0.999]).unwrap();
        assert_eq!(obs.iter().map(|o| o.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(obs[1].mantissa(), 1 << 50);
    }
}
