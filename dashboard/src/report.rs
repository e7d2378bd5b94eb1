use crate::model::{Metric, Reading};
use chrono::{DateTime, Utc};

/// Trailing window a report covers, in hours.
pub const REPORT_WINDOW_HOURS: i64 = 24;

/// Min/max/average of one metric over the window. All three stay zero when
/// no reading in the window carried the metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl MetricStats {
    pub const EMPTY: MetricStats = MetricStats {
        min: 0.0,
        max: 0.0,
        avg: 0.0,
    };
}

/// Everything the report view needs, reduced from one window of readings.
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub co2: MetricStats,
    pub pm25: MetricStats,
    pub temp: MetricStats,
    pub hum: MetricStats,
    pub ventilation_count: usize,
    pub incidents: Vec<Reading>,
    pub incidents_count: usize,
    pub health_score: i64,
}

impl ReportSummary {
    pub fn stats(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::Co2 => &self.co2,
            Metric::Pm25 => &self.pm25,
            Metric::Temp => &self.temp,
            Metric::Hum => &self.hum,
        }
    }
}

/// Reduce a window of readings to its summary; `None` when the window is
/// empty, so callers report "no data" instead of dividing by zero.
pub fn summarize(readings: &[Reading], generated_at: DateTime<Utc>) -> Option<ReportSummary> {
    if readings.is_empty() {
        return None;
    }

    let incidents: Vec<Reading> = readings
        .iter()
        .filter(|r| r.is_polluted())
        .cloned()
        .collect();
    let incidents_count = incidents.len();

    Some(ReportSummary {
        generated_at,
        co2: metric_stats(readings, Metric::Co2),
        pm25: metric_stats(readings, Metric::Pm25),
        temp: metric_stats(readings, Metric::Temp),
        hum: metric_stats(readings, Metric::Hum),
        ventilation_count: readings.iter().filter(|r| r.ventilation_on()).count(),
        incidents,
        incidents_count,
        health_score: health_score(incidents_count),
    })
}

/// 100 minus two points per incident, floored at zero. No ceiling: zero
/// incidents scores a flat 100.
pub fn health_score(incidents: usize) -> i64 {
    (100 - 2 * incidents as i64).max(0)
}

fn metric_stats(readings: &[Reading], metric: Metric) -> MetricStats {
    let values: Vec<f64> = readings.iter().filter_map(|r| r.sensor(metric)).collect();
    if values.is_empty() {
        return MetricStats::EMPTY;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in &values {
        min = min.min(*v);
        max = max.max(*v);
        sum += v;
    }

    MetricStats {
        min,
        max,
        avg: round2(sum / values.len() as f64),
    }
}

// Round half away from zero at two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actuators, Analysis, Reading, Sensors};
    use chrono::Utc;

    fn reading(co2: Option<f64>, ventilation: Option<&str>, prediction: Option<&str>) -> Reading {
        Reading {
            id: 0,
            timestamp: Utc::now(),
            sensors: co2.map(|v| Sensors {
                co2: Some(v),
                ..Default::default()
            }),
            actuators: ventilation.map(|state| Actuators {
                ventilation: Some(state.to_string()),
                ..Default::default()
            }),
            analysis: prediction.map(|label| Analysis {
                prediction: Some(label.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn empty_window_yields_no_summary() {
        assert!(summarize(&[], Utc::now()).is_none());
    }

    #[test]
    fn co2_stats_over_three_readings() {
        let readings = vec![
            reading(Some(400.0), None, None),
            reading(Some(800.0), None, None),
            reading(Some(1200.0), None, None),
        ];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.co2.min, 400.0);
        assert_eq!(summary.co2.max, 1200.0);
        assert_eq!(summary.co2.avg, 800.0);
    }

    #[test]
    fn absent_metric_stays_all_zero() {
        let readings = vec![reading(Some(500.0), None, None)];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.pm25, MetricStats::EMPTY);
        assert_eq!(summary.temp, MetricStats::EMPTY);
        assert_eq!(summary.hum, MetricStats::EMPTY);
    }

    #[test]
    fn readings_without_the_metric_are_skipped() {
        let readings = vec![
            reading(Some(600.0), None, None),
            reading(None, None, None),
            reading(Some(1000.0), None, None),
        ];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.co2.min, 600.0);
        assert_eq!(summary.co2.max, 1000.0);
        assert_eq!(summary.co2.avg, 800.0);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let readings = vec![
            reading(Some(1.0), None, None),
            reading(Some(2.0), None, None),
            reading(Some(2.0), None, None),
        ];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.co2.avg, 1.67);
    }

    #[test]
    fn health_score_clamps_at_zero() {
        assert_eq!(health_score(0), 100);
        assert_eq!(health_score(10), 80);
        assert_eq!(health_score(60), 0);
        assert_eq!(health_score(500), 0);
    }

    #[test]
    fn health_score_never_increases_with_incidents() {
        for n in 0..100 {
            assert!(health_score(n + 1) <= health_score(n));
            assert!(health_score(n) >= 0);
        }
    }

    #[test]
    fn ventilation_count_only_counts_on() {
        let readings = vec![
            reading(None, Some("ON"), None),
            reading(None, Some("OFF"), None),
            reading(None, None, None),
            reading(None, Some("ON"), None),
        ];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.ventilation_count, 2);
    }

    #[test]
    fn incidents_are_the_polluted_subsequence() {
        let readings = vec![
            reading(Some(900.0), None, Some("Polluted")),
            reading(Some(450.0), None, Some("Clean")),
            reading(Some(1100.0), None, Some("Polluted")),
            reading(Some(480.0), None, None),
        ];
        let summary = summarize(&readings, Utc::now()).unwrap();
        assert_eq!(summary.incidents_count, 2);
        assert_eq!(summary.incidents.len(), 2);
        assert!(summary.incidents.iter().all(|r| r.is_polluted()));
        assert_eq!(summary.health_score, 96);
    }
}
