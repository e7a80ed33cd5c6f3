//! Parsing of run output and aggregation across repeated runs.

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// Output Parsing
// ------------------------------------------------------------------------------------------------

/// Session summaries found in one run's textual output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub mean_rtt_ps: Vec<f64>,
    pub mean_signal_strength_dbm: Vec<f64>,
    pub measurements: Vec<f64>,
}

/// Collects every `Mean RTT [ps]`, `Mean Signal Strength [dBm]` and
/// `Number of Measurements` line of a run's output. Unparsable values are skipped.
pub fn parse_output(output: &str) -> RunSummary {
    let mut summary = RunSummary::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<f64>() else {
            continue;
        };
        match key.trim() {
            "Mean RTT [ps]" => summary.mean_rtt_ps.push(value),
            "Mean Signal Strength [dBm]" => summary.mean_signal_strength_dbm.push(value),
            "Number of Measurements" => summary.measurements.push(value),
            _ => {}
        }
    }
    summary
}

impl RunSummary {
    pub fn extend(&mut self, other: RunSummary) {
        self.mean_rtt_ps.extend(other.mean_rtt_ps);
        self.mean_signal_strength_dbm.extend(other.mean_signal_strength_dbm);
        self.measurements.extend(other.measurements);
    }
}

// ------------------------------------------------------------------------------------------------
// Aggregation
// ------------------------------------------------------------------------------------------------

/// Mean and population standard deviation of a set of values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub samples: usize,
}

impl Summary {
    /// Empty input yields NaN statistics with zero samples
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                samples: 0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
            samples: values.len(),
        }
    }
}

/// Aggregated results of one sweep combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationStats {
    pub combination: String,
    pub seeds: Vec<u64>,
    pub mean_rtt_ps: Summary,
    pub mean_signal_strength_dbm: Summary,
    pub measurements: Summary,
    /// Round-trip time of the configured station distance without any error
    pub ideal_rtt_ps: f64,
    /// Mean RTT minus the ideal RTT
    pub rtt_bias_ps: f64,
}

impl CombinationStats {
    pub fn from_runs(combination: &str, seeds: Vec<u64>, runs: &RunSummary, ideal_rtt_ps: f64) -> Self {
        let mean_rtt_ps = Summary::from_values(&runs.mean_rtt_ps);
        Self {
            combination: combination.to_string(),
            seeds,
            rtt_bias_ps: mean_rtt_ps.mean - ideal_rtt_ps,
            mean_rtt_ps,
            mean_signal_strength_dbm: Summary::from_values(&runs.mean_signal_strength_dbm),
            measurements: Summary::from_values(&runs.measurements),
            ideal_rtt_ps,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Metric Series
// ------------------------------------------------------------------------------------------------

/// Metrics reported per combination, with the file stem each series is saved under
pub const METRICS: [(&str, &str); 3] = [
    ("Mean RTT [ps]", "mean_rtt"),
    ("Mean Signal Strength [dBm]", "mean_signal_strength"),
    ("Number of Measurements", "number_of_measurements"),
];

/// One point of a metric series: mean and population std of a combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub combination: String,
    pub mean: f64,
    pub std: f64,
}

/// A metric across every combination of a sweep, in combination order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    pub file_stem: String,
    pub points: Vec<MetricPoint>,
    /// Ground truth the metric is compared against; only RTT has one
    pub reference: Option<f64>,
}

/// Builds one series per metric. The RTT series carries `ideal_rtt_ps` as its reference line.
pub fn metric_series(combinations: &[CombinationStats], ideal_rtt_ps: f64) -> Vec<MetricSeries> {
    METRICS
        .iter()
        .map(|(metric, file_stem)| {
            let points = combinations
                .iter()
                .map(|stats| {
                    let summary = match *file_stem {
                        "mean_rtt" => stats.mean_rtt_ps,
                        "mean_signal_strength" => stats.mean_signal_strength_dbm,
                        _ => stats.measurements,
                    };
                    MetricPoint {
                        combination: stats.combination.clone(),
                        mean: summary.mean,
                        std: summary.std,
                    }
                })
                .collect();
            MetricSeries {
                metric: metric.to_string(),
                file_stem: file_stem.to_string(),
                points,
                reference: (*file_stem == "mean_rtt").then_some(ideal_rtt_ps),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_collects_every_session() {
        let output = "Frequency:              5 GHz\n\
                      AP address: 10.1.0.1\n\
                      FTM params: status_indication=0(0) bursts_exponent=1\n\
                      Mean RTT [ps]: 33500.5\n\
                      Mean Signal Strength [dBm]: -45.25\n\
                      Number of Measurements: 4\n\
                      FTM params: status_indication=0(0) bursts_exponent=1\n\
                      Mean RTT [ps]: 34000\n\
                      Mean Signal Strength [dBm]: -46\n\
                      Number of Measurements: 3\n";
        let summary = parse_output(output);
        assert_eq!(summary.mean_rtt_ps, vec![33500.5, 34000.0]);
        assert_eq!(summary.mean_signal_strength_dbm, vec![-45.25, -46.0]);
        assert_eq!(summary.measurements, vec![4.0, 3.0]);
    }

    #[test]
    fn test_parse_output_ignores_noise() {
        let summary = parse_output("Mean RTT [ps]: not-a-number\nsomething else\n\n");
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_population_std() {
        let summary = Summary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std, 2.0);
        assert_eq!(summary.samples, 8);

        let single = Summary::from_values(&[3.0]);
        assert_eq!((single.mean, single.std), (3.0, 0.0));
        assert!(Summary::from_values(&[]).mean.is_nan());
    }

    /// Tests metric series:
    /// - one series per metric, points in combination order with mean and std
    /// - only the RTT series carries the ideal RTT reference
    /// - each combination records its bias against the ideal RTT
    #[test]
    fn test_metric_series_against_ideal_rtt() {
        let runs = |rtt: &[f64]| RunSummary {
            mean_rtt_ps: rtt.to_vec(),
            mean_signal_strength_dbm: vec![-40.0; rtt.len()],
            measurements: vec![4.0; rtt.len()],
        };
        let combos = vec![
            CombinationStats::from_runs("channelBandwidth=20", vec![1, 2], &runs(&[34_000.0, 36_000.0]), 33_356.4),
            CombinationStats::from_runs("channelBandwidth=40", vec![3, 4], &runs(&[33_500.0, 33_500.0]), 33_356.4),
        ];
        assert!((combos[0].rtt_bias_ps - 1_643.6).abs() < 1e-6);
        assert_eq!(combos[1].ideal_rtt_ps, 33_356.4);

        let series = metric_series(&combos, 33_356.4);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].metric, "Mean RTT [ps]");
        assert_eq!(series[0].reference, Some(33_356.4));
        assert_eq!(
            series[0].points,
            vec![
                MetricPoint { combination: "channelBandwidth=20".into(), mean: 35_000.0, std: 1_000.0 },
                MetricPoint { combination: "channelBandwidth=40".into(), mean: 33_500.0, std: 0.0 },
            ]
        );
        assert_eq!(series[1].reference, None);
        assert_eq!(series[1].points[0].mean, -40.0);
        assert_eq!(series[2].file_stem, "number_of_measurements");
        assert_eq!(series[2].points[1].mean, 4.0);
    }
}
