//! Descriptive statistics over numeric columns.
//!
//! `ColumnStats` accumulates present values and answers the summary measures
//! used by the cleaner (median fill) and the explorer (describe tables,
//! skewness, kurtosis). Quantiles interpolate linearly between order
//! statistics; skewness and kurtosis apply the usual sample bias corrections.

use serde::Serialize;

use crate::table;

#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
    sum_squares: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut stats = Self::new();
        for value in values {
            stats.add_value(value);
        }
        stats
    }

    pub fn add_value(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.sum += value;
        self.sum_squares += value * value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
        self.values.push(value);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        (!self.values.is_empty()).then(|| self.sum / self.count() as f64)
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Linear-interpolated quantile, `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sorted = self.sorted();
        let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        let count = self.count();
        if count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance = (self.sum_squares - count as f64 * mean * mean) / (count as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    fn central_moments(&self) -> Option<(f64, f64, f64)> {
        let mean = self.mean()?;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for value in &self.values {
            let delta = value - mean;
            let squared = delta * delta;
            m2 += squared;
            m3 += squared * delta;
            m4 += squared * squared;
        }
        Some((m2, m3, m4))
    }

    /// Adjusted Fisher-Pearson skewness; zero for constant input.
    pub fn skewness(&self) -> Option<f64> {
        let count = self.count();
        if count < 3 {
            return None;
        }
        let (m2, m3, _) = self.central_moments()?;
        let n = count as f64;
        let variance = m2 / n;
        if variance <= f64::EPSILON * f64::EPSILON {
            return Some(0.0);
        }
        let g1 = (m3 / n) / variance.powf(1.5);
        Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
    }

    /// Bias-corrected excess kurtosis; zero for constant input.
    pub fn kurtosis(&self) -> Option<f64> {
        let count = self.count();
        if count < 4 {
            return None;
        }
        let (m2, _, m4) = self.central_moments()?;
        let n = count as f64;
        let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
        if denominator.abs() <= f64::EPSILON {
            return Some(0.0);
        }
        let numerator = n * (n + 1.0) * (n - 1.0) * m4;
        let adjustment = 3.0 * (n - 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0));
        Some(numerator / denominator - adjustment)
    }

    pub fn describe(&self, column: &str) -> Describe {
        Describe {
            column: column.to_string(),
            count: self.count(),
            mean: self.mean(),
            std: self.std_dev(),
            min: self.min,
            q25: self.quantile(0.25),
            q50: self.quantile(0.5),
            q75: self.quantile(0.75),
            max: self.max,
        }
    }
}

/// One row of a describe table.
#[derive(Debug, Clone, Serialize)]
pub struct Describe {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Describe {
    pub fn headers() -> Vec<String> {
        ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    pub fn render_row(&self) -> Vec<String> {
        let metric = |value: Option<f64>| value.map(format_number).unwrap_or_default();
        vec![
            self.column.clone(),
            self.count.to_string(),
            metric(self.mean),
            metric(self.std),
            metric(self.min),
            metric(self.q25),
            metric(self.q50),
            metric(self.q75),
            metric(self.max),
        ]
    }
}

pub fn render_describe_table(rows: &[Describe]) -> String {
    let rendered: Vec<Vec<String>> = rows.iter().map(Describe::render_row).collect();
    table::render_table(&Describe::headers(), &rendered)
}

/// Pearson correlation over the pairs where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some((cov / denominator).clamp(-1.0, 1.0))
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(left: f64, right: f64) {
        assert!((left - right).abs() < 1e-9, "{left} != {right}");
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        approx(ColumnStats::from_values([3.0, 1.0, 2.0]).median().unwrap(), 2.0);
        approx(
            ColumnStats::from_values([4.0, 1.0, 3.0, 2.0]).median().unwrap(),
            2.5,
        );
        assert!(ColumnStats::new().median().is_none());
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let stats = ColumnStats::from_values([1.0, 2.0, 3.0, 4.0]);
        approx(stats.quantile(0.25).unwrap(), 1.75);
        approx(stats.quantile(0.75).unwrap(), 3.25);
    }

    #[test]
    fn std_dev_uses_sample_denominator() {
        let stats = ColumnStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        approx(stats.std_dev().unwrap(), 2.138089935299395);
    }

    #[test]
    fn skewness_and_kurtosis_apply_bias_correction() {
        let stats = ColumnStats::from_values([1.0, 2.0, 3.0, 4.0, 10.0]);
        approx(stats.skewness().unwrap(), 1.6970562748477143);
        approx(stats.kurtosis().unwrap(), 3.152);
        assert_eq!(ColumnStats::from_values([5.0; 6]).skewness(), Some(0.0));
    }

    #[test]
    fn pearson_skips_missing_pairs() {
        let xs = [Some(1.0), Some(2.0), None, Some(3.0)];
        let ys = [Some(2.0), Some(4.0), Some(100.0), Some(6.0)];
        approx(pearson(&xs, &ys).unwrap(), 1.0);
        assert!(pearson(&[Some(1.0), Some(1.0)], &[Some(2.0), Some(3.0)]).is_none());
    }
}
