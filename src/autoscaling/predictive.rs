//! Linear-regression-based forecasting: projects utilization forward from
//! a recent history window and scales ahead of an anticipated threshold
//! breach rather than reacting after it happens.

use super::policy::{clamp_replicas, ScalingContext, ScalingDecision};

/// A (minutes-since-window-start, utilization-percent) observation.
#[derive(Clone, Copy, Debug)]
pub struct TimedSample {
    pub minutes: f64,
    pub value_percent: f64,
}

/// Ordinary least squares fit: returns `(slope, intercept)` such that
/// `value ≈ slope * minutes + intercept`.
pub fn linear_regression(samples: &[TimedSample]) -> (f64, f64) {
    let n = samples.len() as f64;
    if samples.len() < 2 {
        return (0.0, samples.first().map(|s| s.value_percent).unwrap_or(0.0));
    }

    let sum_x: f64 = samples.iter().map(|s| s.minutes).sum();
    let sum_y: f64 = samples.iter().map(|s| s.value_percent).sum();
    let sum_xy: f64 = samples.iter().map(|s| s.minutes * s.value_percent).sum();
    let sum_xx: f64 = samples.iter().map(|s| s.minutes * s.minutes).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (0.0, sum_y / n);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

pub fn forecast(samples: &[TimedSample], minutes_ahead: f64) -> f64 {
    let (slope, intercept) = linear_regression(samples);
    let last_minute = samples.iter().map(|s| s.minutes).fold(0.0_f64, f64::max);
    (slope * (last_minute + minutes_ahead) + intercept).max(0.0)
}

/// How far ahead the forecast looks before deciding to scale preemptively.
const FORECAST_HORIZON_MINUTES: f64 = 15.0;

pub fn decide(ctx: &ScalingContext, history: &[TimedSample]) -> ScalingDecision {
    let target = match ctx.policy.target_cpu_percent {
        Some(t) => t as f64,
        None => {
            return ScalingDecision::no_change(
                ctx.current_replicas,
                "predictive scaling requires targetCpuPercent",
            )
        }
    };

    if history.len() < 2 {
        return ScalingDecision::no_change(ctx.current_replicas, "insufficient history to forecast");
    }

    let projected = forecast(history, FORECAST_HORIZON_MINUTES);
    if projected <= target {
        return ScalingDecision::no_change(
            ctx.current_replicas,
            format!("projected utilization {projected:.1}% within target"),
        );
    }

    let ratio = projected / target;
    let desired = (ctx.current_replicas as f64 * ratio).ceil() as i32;
    let target_replicas = clamp_replicas(desired.max(1), &ctx.policy);

    ScalingDecision {
        target_replicas,
        reason: format!(
            "forecast projects {projected:.1}% utilization in {FORECAST_HORIZON_MINUTES:.0}m, scaling ahead"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_recovers_exact_line() {
        let samples = vec![
            TimedSample { minutes: 0.0, value_percent: 10.0 },
            TimedSample { minutes: 1.0, value_percent: 20.0 },
            TimedSample { minutes: 2.0, value_percent: 30.0 },
        ];
        let (slope, intercept) = linear_regression(&samples);
        assert!((slope - 10.0).abs() < 1e-6);
        assert!((intercept - 10.0).abs() < 1e-6);
    }

    #[test]
    fn regression_with_single_sample_is_flat() {
        let samples = vec![TimedSample { minutes: 0.0, value_percent: 42.0 }];
        let (slope, intercept) = linear_regression(&samples);
        assert_eq!(slope, 0.0);
        assert_eq!(intercept, 42.0);
    }

    #[test]
    fn forecast_extrapolates_upward_trend() {
        let samples = vec![
            TimedSample { minutes: 0.0, value_percent: 10.0 },
            TimedSample { minutes: 5.0, value_percent: 20.0 },
        ];
        let projected = forecast(&samples, 15.0);
        assert!(projected > 20.0);
    }
}
