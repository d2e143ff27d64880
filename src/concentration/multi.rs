//! `MultiConcentrationCalculator`: chains a whole intake series into a
//! `Prediction`, propagating residuals cycle to cycle. Grounded on
//! `original_source/src/tucucore/multiconcentrationcalculator.cpp`.

use crate::calculator::{build, IntakeIntervalCalculator};
use crate::error::ComputingStatus;
use crate::error_model::ResidualErrorModel;
use crate::intake::IntakeSeries;
use crate::parameter::{Deviations, Etas, ParameterSetSeries};
use crate::residual::{self, Residuals};

use super::{CycleData, Prediction};

const STEADY_STATE_TOLERANCE: f64 = 1e-4;
const MAX_STEADY_STATE_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiConcentrationCalculator;

impl MultiConcentrationCalculator {
    fn residual_size(intakes: &IntakeSeries) -> usize {
        intakes.iter().map(|intake| build(*intake.calculator_id).residual_size()).max().unwrap_or(0)
    }

    /// Runs one intake through its calculator, optionally appending the
    /// resulting cycle to `prediction` with residual-error models applied.
    #[allow(clippy::too_many_arguments)]
    fn run_one_cycle(
        calculator: &dyn IntakeIntervalCalculator,
        intake: &crate::intake::IntakeEvent,
        parameters: &crate::parameter::ParameterSetEvent,
        in_residuals: &Residuals,
        compute_all_compartments: bool,
        record: bool,
        error_models: &[Box<dyn ResidualErrorModel>],
        epsilons: &[Deviations],
        prediction: &mut Prediction,
    ) -> Result<Residuals, ComputingStatus> {
        let result = calculator.calculate_intake_points(intake, parameters, in_residuals, compute_all_compartments, None)?;

        if record {
            let mut concentrations = result.concentrations;
            for (i, model) in error_models.iter().enumerate() {
                if let (Some(conc), Some(eps)) = (concentrations.get_mut(i), epsilons.get(i)) {
                    model.apply_eps_to_array(conc, eps);
                }
            }
            prediction.push(CycleData::new(intake.event_time, result.times, concentrations, parameters.clone()));
        }

        Ok(result.residuals_out)
    }

    /// Computes concentrations over the intake series within
    /// `[record_from, record_to]`, appending recorded cycles to
    /// `prediction`.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_concentrations(
        &self,
        prediction: &mut Prediction,
        compute_all_compartments: bool,
        record_from: f64,
        record_to: f64,
        intakes: &IntakeSeries,
        parameters: &ParameterSetSeries,
        etas: &Etas,
        error_models: &[Box<dyn ResidualErrorModel>],
        epsilons: &[Deviations],
    ) -> Result<(), ComputingStatus> {
        let residual_size = Self::residual_size(intakes);
        let mut in_residuals = residual::zeros(residual_size);

        for intake in intakes.iter() {
            let snapshot = parameters
                .get_at_time(intake.event_time, etas)
                .ok_or(ComputingStatus::ConcentrationCalculatorNoParameters)?;

            let intake_end = intake.end_time();
            let record = intake_end > record_from && intake.event_time < record_to;

            let calculator = build(*intake.calculator_id);
            let out_residuals = Self::run_one_cycle(
                calculator.as_ref(),
                intake,
                &snapshot,
                &in_residuals,
                compute_all_compartments,
                record,
                error_models,
                epsilons,
                prediction,
            )?;
            in_residuals = out_residuals;
        }

        Ok(())
    }

    /// Loops the series until residuals stabilize (`max|in-out| <= 1e-4`),
    /// then runs one more recorded pass. Caps at 1000 full passes.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_concentrations_at_steady_state(
        &self,
        prediction: &mut Prediction,
        compute_all_compartments: bool,
        intakes: &IntakeSeries,
        parameters: &ParameterSetSeries,
        etas: &Etas,
        error_models: &[Box<dyn ResidualErrorModel>],
        epsilons: &[Deviations],
    ) -> Result<(), ComputingStatus> {
        let residual_size = Self::residual_size(intakes);
        let mut in_residuals = residual::zeros(residual_size);

        let mut reached_steady_state = false;
        let mut iterations = 0usize;

        loop {
            let mut finished = false;

            for intake in intakes.iter() {
                let snapshot = parameters
                    .get_at_time(intake.event_time, etas)
                    .ok_or(ComputingStatus::ConcentrationCalculatorNoParameters)?;

                let calculator = build(*intake.calculator_id);
                let out_residuals = Self::run_one_cycle(
                    calculator.as_ref(),
                    intake,
                    &snapshot,
                    &in_residuals,
                    compute_all_compartments,
                    reached_steady_state,
                    error_models,
                    epsilons,
                    prediction,
                )?;

                if reached_steady_state {
                    finished = true;
                }

                reached_steady_state = in_residuals
                    .iter()
                    .zip(out_residuals.iter())
                    .all(|(&a, &b)| (a - b).abs() <= STEADY_STATE_TOLERANCE);

                in_residuals = out_residuals;
            }

            if finished {
                break;
            }

            iterations += 1;
            if iterations > MAX_STEADY_STATE_ITERATIONS {
                return Err(ComputingStatus::NoSteadyState);
            }
        }

        Ok(())
    }

    /// Evaluates concentrations only at sample instants, returning one
    /// per-analyte vector per sample, in sample order.
    pub fn compute_concentrations_at_times(
        &self,
        compute_all_compartments: bool,
        intakes: &IntakeSeries,
        parameters: &ParameterSetSeries,
        sample_times: &[f64],
        etas: &Etas,
    ) -> Result<Vec<Vec<f64>>, ComputingStatus> {
        let residual_size = Self::residual_size(intakes);
        let mut in_residuals = residual::zeros(residual_size);
        let mut out = Vec::new();

        let mut samples = sample_times.iter().copied().peekable();
        let mut intake_iter = intakes.iter().peekable();

        while let (Some(&next_sample), Some(intake)) = (samples.peek(), intake_iter.peek()) {
            let snapshot = match parameters.get_at_time(intake.event_time, etas) {
                Some(s) => s,
                None => return Err(ComputingStatus::ConcentrationCalculatorNoParameters),
            };
            let calculator = build(*intake.calculator_id);
            let next_intake_time = intake.end_time();

            if next_sample > next_intake_time {
                let result = calculator.calculate_intake_single_point(
                    intake,
                    &snapshot,
                    &in_residuals,
                    0.0,
                    compute_all_compartments,
                )?;
                in_residuals = result.residuals_out;
                intake_iter.next();
                continue;
            }

            if next_sample >= intake.event_time && next_sample <= next_intake_time {
                let at_time = next_sample - intake.event_time;
                let result = calculator.calculate_intake_single_point(
                    intake,
                    &snapshot,
                    &in_residuals,
                    at_time,
                    compute_all_compartments,
                )?;
                let nb_analytes = calculator.nb_analytes();
                out.push(result.concentrations[..nb_analytes].to_vec());
                in_residuals = result.residuals_out;
                samples.next();
                continue;
            }

            intake_iter.next();
        }

        Ok(out)
    }
}
