//! One dosing cycle's raw output and its derived statistics. Grounded on
//! `original_source/src/tucucore/cyclestatisticscalculator.h`'s
//! `CycleData`/`CycleStatistics`.

use std::collections::HashMap;

use crate::parameter::ParameterSetEvent;

/// The nine statistic kinds `cyclestatisticscalculator.cpp` computes per
/// compartment. `Maximum`/`Minimum` can occur more than once in a cycle
/// (every interior gradient sign change); the rest are added exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStatisticType {
    Mean,
    Peak,
    Maximum,
    Minimum,
    Auc,
    Auc24,
    CumulativeAuc,
    Residual,
    CycleInterval,
}

impl CycleStatisticType {
    pub const ALL: [CycleStatisticType; 9] = [
        CycleStatisticType::Mean,
        CycleStatisticType::Peak,
        CycleStatisticType::Maximum,
        CycleStatisticType::Minimum,
        CycleStatisticType::Auc,
        CycleStatisticType::Auc24,
        CycleStatisticType::CumulativeAuc,
        CycleStatisticType::Residual,
        CycleStatisticType::CycleInterval,
    ];
}

/// One (time-offset-within-cycle, value) pair recorded for a statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticValue {
    pub time_offset: f64,
    pub value: f64,
}

/// Per-compartment statistic values, keyed by type. Most types hold at
/// most one entry; `Maximum`/`Minimum` may hold several.
#[derive(Debug, Clone, Default)]
pub struct CompartmentStatistics {
    entries: HashMap<CycleStatisticType, Vec<StatisticValue>>,
}

impl CompartmentStatistics {
    pub(crate) fn add(&mut self, stat: CycleStatisticType, time_offset: f64, value: f64) {
        self.entries.entry(stat).or_default().push(StatisticValue { time_offset, value });
    }

    pub fn values(&self, stat: CycleStatisticType) -> &[StatisticValue] {
        self.entries.get(&stat).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The single recorded value for statistic types that only ever add one
    /// (everything except `Maximum`/`Minimum`).
    pub fn value(&self, stat: CycleStatisticType) -> Option<f64> {
        self.values(stat).first().map(|v| v.value)
    }
}

/// One dosing interval's computed output: the time grid, per-compartment
/// concentrations (outer index = compartment), the parameter snapshot used
/// to compute it, and its derived statistics (filled in by
/// `CycleStatisticsCalculator`, empty until then).
#[derive(Debug, Clone)]
pub struct CycleData {
    pub start: f64,
    pub times: Vec<f64>,
    pub concentrations: Vec<Vec<f64>>,
    pub parameters: ParameterSetEvent,
    pub statistics: Vec<CompartmentStatistics>,
}

impl CycleData {
    pub fn new(start: f64, times: Vec<f64>, concentrations: Vec<Vec<f64>>, parameters: ParameterSetEvent) -> Self {
        let nb_compartments = concentrations.len();
        Self {
            start,
            times,
            concentrations,
            parameters,
            statistics: vec![CompartmentStatistics::default(); nb_compartments],
        }
    }
}

/// An append-only sequence of cycle data, assembled by
/// `MultiConcentrationCalculator` and read by `CycleStatisticsCalculator`.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    cycles: Vec<CycleData>,
}

impl Prediction {
    pub fn new() -> Self {
        Self { cycles: Vec::new() }
    }

    pub fn push(&mut self, cycle: CycleData) {
        self.cycles.push(cycle);
    }

    pub fn cycles(&self) -> &[CycleData] {
        &self.cycles
    }

    pub fn cycles_mut(&mut self) -> &mut [CycleData] {
        &mut self.cycles
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }
}
