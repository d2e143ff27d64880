//! Chains intake-interval calculations into a full prediction: propagates
//! residuals cycle to cycle, applies residual-error models, detects steady
//! state. Grounded on
//! `original_source/src/tucucore/multiconcentrationcalculator.cpp`.

pub mod cycle;
pub mod multi;

pub use cycle::{CompartmentStatistics, CycleData, CycleStatisticType, Prediction, StatisticValue};
pub use multi::MultiConcentrationCalculator;
