//! `CycleStatisticsCalculator`: derives peak/trough/AUC-family statistics
//! from a prediction's raw cycle data. Grounded on
//! `original_source/src/tucucore/cyclestatisticscalculator.cpp`.

use crate::concentration::{CycleData, CycleStatisticType};

#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStatisticsCalculator;

impl CycleStatisticsCalculator {
    /// Fills in `statistics` for every cycle, in order, so `CumulativeAuc`
    /// accumulates correctly across the whole prediction. Matches the
    /// original's behavior of abandoning the whole run (not just the
    /// current compartment) the moment any compartment's concentration
    /// array is empty.
    pub fn calculate(&self, cycles: &mut [CycleData]) {
        if cycles.is_empty() {
            return;
        }
        let nb_compartments = cycles[0].concentrations.len();
        let mut cumulative_auc = vec![0.0; nb_compartments];

        for cycle in cycles.iter_mut() {
            for compartment in 0..cycle.concentrations.len() {
                let times = &cycle.times;
                let conc = &cycle.concentrations[compartment];

                if conc.is_empty() {
                    log::error!("No data in concentrations");
                    return;
                }

                let stats = &mut cycle.statistics[compartment];
                let mut prev_gradient = 0.0;
                let mut auc = 0.0;
                let mut peak = 0.0;
                let mut peak_position = 0usize;

                for i in 0..conc.len() - 1 {
                    let gradient = conc[i + 1] - conc[i];

                    if prev_gradient > 0.0 && gradient < 0.0 {
                        stats.add(CycleStatisticType::Maximum, times[i], conc[i]);
                    } else if prev_gradient < 0.0 && gradient > 0.0 {
                        stats.add(CycleStatisticType::Minimum, times[i], conc[i]);
                    }
                    prev_gradient = gradient;

                    auc += (conc[i] + conc[i + 1]) / 2.0 * (times[i + 1] - times[i]);

                    if peak < conc[i] {
                        peak = conc[i];
                        peak_position = i;
                    } else if peak < conc[i + 1] {
                        peak = conc[i + 1];
                        peak_position = i + 1;
                    }
                }

                cumulative_auc[compartment] += auc;

                let last_time = *times.last().unwrap();
                let first_time = times[0];
                let interval = last_time - first_time;

                stats.add(CycleStatisticType::Residual, last_time, *conc.last().unwrap());
                stats.add(CycleStatisticType::Auc, 0.0, auc);
                stats.add(CycleStatisticType::CumulativeAuc, 0.0, cumulative_auc[compartment]);
                stats.add(CycleStatisticType::Mean, 0.0, auc / interval);
                stats.add(CycleStatisticType::Peak, times[peak_position], peak);
                stats.add(CycleStatisticType::CycleInterval, 0.0, interval);

                if interval == 0.0 {
                    stats.add(CycleStatisticType::Auc24, 0.0, -1.0);
                } else {
                    stats.add(CycleStatisticType::Auc24, 0.0, auc * 24.0 / interval);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterSetEvent;
    use approx::assert_relative_eq;

    fn cycle(times: Vec<f64>, concentrations: Vec<f64>) -> CycleData {
        CycleData::new(0.0, times, vec![concentrations], ParameterSetEvent::new(0.0))
    }

    #[test]
    fn mean_times_interval_equals_auc() {
        let mut cycles = vec![cycle(vec![0.0, 2.0, 4.0, 6.0], vec![0.0, 10.0, 6.0, 2.0])];
        CycleStatisticsCalculator.calculate(&mut cycles);

        let stats = &cycles[0].statistics[0];
        let auc = stats.value(CycleStatisticType::Auc).unwrap();
        let mean = stats.value(CycleStatisticType::Mean).unwrap();
        let interval = stats.value(CycleStatisticType::CycleInterval).unwrap();
        assert_relative_eq!(mean * interval, auc, max_relative = 1e-9);
    }

    #[test]
    fn peak_dominates_interior_maximum_and_minimum() {
        let mut cycles = vec![cycle(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![0.0, 10.0, 2.0, 8.0, 1.0])];
        CycleStatisticsCalculator.calculate(&mut cycles);

        let stats = &cycles[0].statistics[0];
        let peak = stats.value(CycleStatisticType::Peak).unwrap();
        let maximum = stats.value(CycleStatisticType::Maximum).unwrap();
        let minimum = stats.value(CycleStatisticType::Minimum).unwrap();
        assert!(peak >= maximum);
        assert!(peak >= minimum);
        assert_relative_eq!(peak, 10.0);
    }

    #[test]
    fn zero_length_cycle_sentinels_auc24() {
        let mut cycles = vec![cycle(vec![0.0, 0.0], vec![5.0, 5.0])];
        CycleStatisticsCalculator.calculate(&mut cycles);
        let stats = &cycles[0].statistics[0];
        assert_relative_eq!(stats.value(CycleStatisticType::Auc24).unwrap(), -1.0);
    }

    #[test]
    fn cumulative_auc_accumulates_across_cycles() {
        let mut cycles = vec![
            cycle(vec![0.0, 1.0], vec![0.0, 10.0]),
            cycle(vec![0.0, 1.0], vec![0.0, 10.0]),
        ];
        CycleStatisticsCalculator.calculate(&mut cycles);
        let first_auc = cycles[0].statistics[0].value(CycleStatisticType::Auc).unwrap();
        let second_cumulative = cycles[1].statistics[0].value(CycleStatisticType::CumulativeAuc).unwrap();
        assert_relative_eq!(second_cumulative, first_auc * 2.0, max_relative = 1e-9);
    }
}
