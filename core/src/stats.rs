use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Population mean and standard deviation; `(0, 0)` for no values.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Pearson's chi-squared statistic against equal expected counts.
pub fn chi_squared_uniform(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if counts.is_empty() || total == 0 {
        return 0.0;
    }
    let expected = total as f64 / counts.len() as f64;
    counts
        .iter()
        .map(|&count| (count as f64 - expected).powi(2) / expected)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r2: f64,
}

/// Ordinary least squares over the common prefix of `x` and `y`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let n = x.len().min(y.len());
    if n == 0 {
        return Regression::default();
    }
    let (x, y) = (&x[..n], &y[..n]);
    let nf = n as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_xx: f64 = x.iter().map(|a| a * a).sum();

    let denominator = nf * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return Regression {
            slope: 0.0,
            intercept: sum_y / nf,
            r2: 0.0,
        };
    }
    let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / nf;

    let mean_y = sum_y / nf;
    let (ss_tot, ss_res) = x.iter().zip(y).fold((0.0, 0.0), |(tot, res), (a, b)| {
        let predicted = slope * a + intercept;
        (tot + (b - mean_y).powi(2), res + (b - predicted).powi(2))
    });
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
    Regression {
        slope,
        intercept,
        r2,
    }
}

pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }
    let denom = (denom_x * denom_y).sqrt();
    if denom > 0.0 { num / denom } else { 0.0 }
}

/// Standard normal draw via Box-Muller.
pub fn randn<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // (0, 1]: ln(0) is undefined
    let u1 = 1.0 - rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * f64::ln(u1)).sqrt() * (2.0 * PI * u2).cos()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LnStats {
    pub mean: f64,
    pub variance: f64,
}

/// Mean and variance of `ln k` for a fair die with `sides` faces.
pub fn ln_stats(sides: u32) -> LnStats {
    if sides == 0 {
        return LnStats {
            mean: 0.0,
            variance: 0.0,
        };
    }
    let logs: Vec<f64> = (1..=sides).map(|k| f64::from(k).ln()).collect();
    let (mean, std) = mean_and_std(&logs);
    LnStats {
        mean,
        variance: std * std,
    }
}
