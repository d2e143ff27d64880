//! Measured patient samples and their extraction into a time-ordered,
//! unit-normalized series. Grounded on
//! `original_source/src/tucucore/sampleextractor.h` and
//! `test/tucucore/gtest_sampleextractor.cpp`.

use crate::error::ComputingStatus;
use crate::units;

/// One measured concentration at a point in time, in its originally
/// recorded unit.
#[derive(Debug, Clone)]
pub struct Sample {
    pub event_time: f64,
    pub analyte_id: String,
    pub value: f64,
    pub unit: String,
}

impl Sample {
    pub fn new(event_time: f64, analyte_id: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self { event_time, analyte_id: analyte_id.into(), value, unit: unit.into() }
    }
}

/// A time-ordered series of samples already normalized to one target unit.
#[derive(Debug, Clone, Default)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

impl std::ops::Index<usize> for SampleSeries {
    type Output = Sample;
    fn index(&self, idx: usize) -> &Sample {
        &self.samples[idx]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleExtractor;

impl SampleExtractor {
    /// Drops samples outside `[start, end]`, converts the rest to
    /// `target_unit`, and returns them in (input) time order. Fails the
    /// whole extraction the first time a retained sample's unit isn't
    /// convertible to `target_unit`.
    pub fn extract(
        &self,
        samples: &[Sample],
        start: f64,
        end: f64,
        target_unit: &str,
    ) -> Result<SampleSeries, ComputingStatus> {
        let mut series = SampleSeries::new();

        for sample in samples {
            if sample.event_time < start || sample.event_time > end {
                continue;
            }

            let converted = units::convert_to_unit(sample.value, &sample.unit, target_unit)
                .ok_or(ComputingStatus::SampleExtractionError)?;

            series.samples.push(Sample::new(sample.event_time, sample.analyte_id.clone(), converted, target_unit));
        }

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_in_window_is_kept() {
        let samples = vec![Sample::new(5.0, "theAnalyte", 12.0, "ug/l")];
        let series = SampleExtractor.extract(&samples, 0.0, 10.0, "ug/l").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].value, 12.0);
    }

    #[test]
    fn out_of_window_samples_are_dropped_and_units_converted() {
        let samples = vec![
            Sample::new(-100.0, "theAnalyte", 12.0, "ug/l"),
            Sample::new(5.0, "theAnalyte", 10.0, "ug/l"),
            Sample::new(6.0, "theAnalyte", 14.0, "mg/l"),
            Sample::new(500.0, "theAnalyte", 12.0, "ug/l"),
        ];
        let series = SampleExtractor.extract(&samples, 0.0, 10.0, "ug/l").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 10.0);
        assert_eq!(series[1].value, 14_000.0);
    }

    #[test]
    fn incompatible_unit_is_an_error() {
        let samples = vec![Sample::new(5.0, "theAnalyte", 12.0, "mmHg")];
        let result = SampleExtractor.extract(&samples, 0.0, 10.0, "ug/l");
        assert_eq!(result.unwrap_err(), ComputingStatus::SampleExtractionError);
    }

    #[test]
    fn empty_sample_list_returns_empty_series() {
        let series = SampleExtractor.extract(&[], 0.0, 10.0, "ug/l").unwrap();
        assert!(series.is_empty());
    }
}
