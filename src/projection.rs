use crate::models::ProjectionResult;

/// Project next month's revenue from a chronological trailing window.
///
/// The window is split in two; the recent half's mean relative to the
/// earlier half's mean gives a trend ratio, which is applied to the most
/// recent month. With an odd length the extra month goes to the recent
/// half. Growth is reported at full precision.
pub fn project_next_month(monthly_revenue: &[f64]) -> ProjectionResult {
    let series: Vec<f64> = monthly_revenue.iter().copied().map(sanitize).collect();

    let last_value = match series.last() {
        Some(value) => *value,
        None => {
            return ProjectionResult {
                projected: 0.0,
                growth_percent: 0.0,
            }
        }
    };

    let ratio = trend_ratio(&series);
    let projected = sanitize(last_value * (1.0 + ratio));

    ProjectionResult {
        projected,
        growth_percent: growth_percent(last_value, projected),
    }
}

/// Relative change between the earlier and the recent half of `series`.
pub fn trend_ratio(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }

    let (prior, recent) = series.split_at(series.len() / 2);
    let prior_mean = mean(prior);
    let recent_mean = mean(recent);

    if prior_mean > 0.0 {
        (recent_mean - prior_mean) / prior_mean
    } else if recent_mean > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Percentage change of `projected` over `last_value`, special-casing a zero base.
pub fn growth_percent(last_value: f64, projected: f64) -> f64 {
    if last_value == 0.0 {
        if projected > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        let growth = (projected - last_value) / last_value * 100.0;
        if growth.is_finite() {
            growth
        } else {
            0.0
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Non-finite and negative amounts count as zero.
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_zero_series_project_nothing() {
        for series in [vec![], vec![0.0; 6]] {
            let result = project_next_month(&series);
            assert_eq!(result.projected, 0.0);
            assert_eq!(result.growth_percent, 0.0);
        }
    }

    #[test]
    fn rising_series_projects_growth() {
        let result = project_next_month(&[100.0, 100.0, 100.0, 200.0, 200.0, 200.0]);
        assert!(result.projected >= 200.0);
        assert!(result.growth_percent > 0.0);
        assert!((result.projected - 400.0).abs() < 1e-9);
        assert!((result.growth_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn falling_series_projects_decline() {
        let result = project_next_month(&[200.0, 200.0, 200.0, 100.0, 100.0, 100.0]);
        assert!(result.growth_percent < 0.0);
        assert!((result.projected - 50.0).abs() < 1e-9);
        assert!((result.growth_percent + 50.0).abs() < 1e-9);
    }

    #[test]
    fn single_point_is_flat() {
        let result = project_next_month(&[250.0]);
        assert_eq!(result.projected, 250.0);
        assert_eq!(result.growth_percent, 0.0);
    }

    #[test]
    fn revenue_from_nothing_doubles_last_value() {
        // prior half is all zero, recent half has revenue: ratio is 1.0
        let result = project_next_month(&[0.0, 0.0, 0.0, 0.0, 0.0, 120.0]);
        assert_eq!(result.projected, 240.0);
        assert_eq!(result.growth_percent, 100.0);
    }

    #[test]
    fn zero_last_month_with_projection_reports_full_growth() {
        assert_eq!(growth_percent(0.0, 10.0), 100.0);
        assert_eq!(growth_percent(0.0, 0.0), 0.0);
    }

    #[test]
    fn collapse_never_goes_negative() {
        let result = project_next_month(&[1000.0, 1000.0, 1000.0, 0.0, 0.0, 10.0]);
        assert!(result.projected >= 0.0);
    }

    #[test]
    fn odd_length_gives_recent_half_the_extra_month() {
        // prior = [100, 100], recent = [100, 200, 200]
        let ratio = trend_ratio(&[100.0, 100.0, 100.0, 200.0, 200.0]);
        let expected = (500.0 / 3.0 - 100.0) / 100.0;
        assert!((ratio - expected).abs() < 1e-12);
    }

    #[test]
    fn overflowing_trend_never_reports_infinity() {
        let result = project_next_month(&[1.0, f64::MAX]);
        assert!(result.projected.is_finite());
        assert!(result.growth_percent.is_finite());
        assert_eq!(result.projected, 0.0);
        assert_eq!(result.growth_percent, -100.0);

        assert_eq!(growth_percent(f64::MIN_POSITIVE, f64::MAX), 0.0);
    }

    #[test]
    fn non_finite_points_count_as_zero() {
        let result = project_next_month(&[f64::NAN, f64::INFINITY, 0.0, 0.0]);
        assert_eq!(result.projected, 0.0);
        assert_eq!(result.growth_percent, 0.0);
        assert!(result.growth_percent.is_finite());
    }
}
