//! Yearly reduction of monthly values

use crate::indicators::YearlyMode;

/// Reduce up to twelve monthly values into one yearly value
///
/// `None` months are skipped; a year with no valued month is `None`.
/// Majority vote counts 0/1 month flags and needs strictly more ones.
pub fn reduce_year(mode: YearlyMode, months: &[Option<f64>]) -> Option<f64> {
    let valued: Vec<f64> = months.iter().flatten().copied().collect();
    if valued.is_empty() {
        return None;
    }

    let value = match mode {
        YearlyMode::MeanOfMonths => valued.iter().sum::<f64>() / valued.len() as f64,
        YearlyMode::SumOfMonths => valued.iter().sum(),
        YearlyMode::MaxOfMonths => valued.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        YearlyMode::MajorityVote => {
            let ones = valued.iter().filter(|v| **v >= 0.5).count();
            let zeros = valued.len() - ones;
            if ones > zeros {
                1.0
            } else {
                0.0
            }
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sum_skips_missing_months() {
        let months = [Some(1.0), None, Some(2.5), None];
        assert_relative_eq!(reduce_year(YearlyMode::SumOfMonths, &months).unwrap(), 3.5);
        assert_eq!(reduce_year(YearlyMode::SumOfMonths, &[None; 12]), None);
    }

    #[test]
    fn test_mean_and_max() {
        let months = [Some(1.0), Some(3.0), None];
        assert_relative_eq!(reduce_year(YearlyMode::MeanOfMonths, &months).unwrap(), 2.0);
        assert_relative_eq!(reduce_year(YearlyMode::MaxOfMonths, &months).unwrap(), 3.0);
    }

    #[test]
    fn test_majority_vote() {
        let mut tie = vec![Some(1.0); 6];
        tie.extend(vec![Some(0.0); 6]);
        assert_eq!(reduce_year(YearlyMode::MajorityVote, &tie), Some(0.0));

        let mut seven = vec![Some(1.0); 7];
        seven.extend(vec![Some(0.0); 5]);
        assert_eq!(reduce_year(YearlyMode::MajorityVote, &seven), Some(1.0));

        // missing months abstain
        let sparse = [Some(1.0), None, None, Some(1.0), Some(0.0)];
        assert_eq!(reduce_year(YearlyMode::MajorityVote, &sparse), Some(1.0));
    }
}
