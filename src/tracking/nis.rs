//! Normalized innovation squared (NIS) records, sinks and statistics

use ordered_float::OrderedFloat;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::common::{FusionResult, SensorType};

/// 95th percentile of the chi-squared distribution with 2 degrees of freedom
pub const CHI_SQUARED_95_2DOF: f64 = 5.991;

/// 95th percentile of the chi-squared distribution with 3 degrees of freedom
pub const CHI_SQUARED_95_3DOF: f64 = 7.815;

/// 95% consistency threshold for a sensor's measurement dimension
pub fn chi_squared_95(sensor: SensorType) -> f64 {
    match sensor {
        SensorType::Lidar => CHI_SQUARED_95_2DOF,
        SensorType::Radar => CHI_SQUARED_95_3DOF,
    }
}

/// Latest NIS values after one update cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NisRecord {
    /// Update cycle number, starting at 1
    pub cycle: u64,
    /// Sensor used in this cycle
    pub sensor: SensorType,
    pub lidar: Option<f64>,
    pub radar: Option<f64>,
}

impl NisRecord {
    /// NIS of the sensor used in this cycle
    pub fn value(&self) -> Option<f64> {
        match self.sensor {
            SensorType::Lidar => self.lidar,
            SensorType::Radar => self.radar,
        }
    }
}

/// Destination for per-cycle NIS values
pub trait NisSink {
    fn record(&mut self, record: &NisRecord) -> FusionResult<()>;
}

impl<S: NisSink + ?Sized> NisSink for &mut S {
    fn record(&mut self, record: &NisRecord) -> FusionResult<()> {
        (**self).record(record)
    }
}

impl<A: NisSink, B: NisSink> NisSink for (A, B) {
    fn record(&mut self, record: &NisRecord) -> FusionResult<()> {
        self.0.record(record)?;
        self.1.record(record)
    }
}

fn format_nis(value: Option<f64>) -> String {
    value.map_or_else(|| "nan".to_string(), |v| format!("{:.6}", v))
}

/// Writes one line per cycle: `cycle sensor nis_lidar nis_radar`
pub struct NisWriter<W: Write> {
    writer: W,
}

impl<W: Write> NisWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Create a writer that starts with a commented column header
    pub fn with_header(mut writer: W) -> FusionResult<Self> {
        writeln!(writer, "# cycle sensor nis_lidar nis_radar")?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> FusionResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl NisWriter<BufWriter<File>> {
    /// Create (or truncate) a log file
    pub fn create<P: AsRef<Path>>(path: P) -> FusionResult<Self> {
        Self::with_header(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> NisSink for NisWriter<W> {
    fn record(&mut self, record: &NisRecord) -> FusionResult<()> {
        writeln!(
            self.writer,
            "{} {} {} {}",
            record.cycle,
            record.sensor,
            format_nis(record.lidar),
            format_nis(record.radar)
        )?;
        Ok(())
    }
}

/// Summary of a NIS series
#[derive(Debug, Clone, PartialEq)]
pub struct NisStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    /// Share of samples above the 95% chi-squared threshold
    pub fraction_above_95: f64,
}

impl NisStatistics {
    pub fn from_samples(samples: &[f64], threshold: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;

        let mut sorted: Vec<OrderedFloat<f64>> = samples.iter().map(|&v| OrderedFloat(v)).collect();
        sorted.sort();
        let median = if count % 2 == 0 {
            0.5 * (sorted[count / 2 - 1].0 + sorted[count / 2].0)
        } else {
            sorted[count / 2].0
        };
        let max = sorted[count - 1].0;
        let above = samples.iter().filter(|&&v| v > threshold).count();

        Some(Self {
            count,
            mean,
            median,
            max,
            fraction_above_95: above as f64 / count as f64,
        })
    }
}

/// Keeps every NIS value per sensor in memory
#[derive(Debug, Clone, Default)]
pub struct NisCollector {
    lidar: Vec<f64>,
    radar: Vec<f64>,
}

impl NisCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, sensor: SensorType) -> &[f64] {
        match sensor {
            SensorType::Lidar => &self.lidar,
            SensorType::Radar => &self.radar,
        }
    }

    /// Statistics for one sensor, ignoring the first `skip` samples (filter warm-up)
    pub fn statistics(&self, sensor: SensorType, skip: usize) -> Option<NisStatistics> {
        let series = self.series(sensor);
        let tail = series.get(skip..).unwrap_or(&[]);
        NisStatistics::from_samples(tail, chi_squared_95(sensor))
    }
}

impl NisSink for NisCollector {
    fn record(&mut self, record: &NisRecord) -> FusionResult<()> {
        if let Some(value) = record.value() {
            match record.sensor {
                SensorType::Lidar => self.lidar.push(value),
                SensorType::Radar => self.radar.push(value),
            }
        }
        Ok(())
    }
}
