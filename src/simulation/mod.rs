pub mod individual;
pub mod population;

use std::collections::HashMap;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::calculator::CalculatorId;
use crate::concentration::MultiConcentrationCalculator;
use crate::config::{Config, ModelConfig};
use crate::dosing;
use crate::error::{PKError, PKResult};
use crate::error_model::{Proportional, ResidualErrorModel};
use crate::intake::{AbsorptionRoute, IntakeSeries};
use crate::parameter::{
    Etas, ParameterDefinition, ParameterId, ParameterSetEvent, ParameterSetSeries, Variability, VariabilityKind,
};
use crate::registry::{default_populate, PkModelCollection};

pub use individual::*;
pub use population::*;

/// Drives the multi-cycle core (`calculator`/`concentration`/`registry`) over
/// a population described by the flat `Config` schema: resolves the
/// registered PK model and absorption route once, then for each patient draws
/// etas and demographics, chains the dosing schedule through
/// `MultiConcentrationCalculator`, and applies a proportional residual error
/// to each observation.
pub struct Simulator {
    config: Config,
    rng: StdRng,
    models: PkModelCollection,
    model_id: String,
    route: AbsorptionRoute,
    base_parameters: ParameterSetEvent,
}

impl Simulator {
    pub fn new(config: Config, seed: Option<u64>) -> PKResult<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut models = PkModelCollection::new();
        default_populate(&mut models);

        let model_id = resolve_model_id(&config.model)?;
        let has_tlag = config.model.parameters.contains_key("TLAG");
        let route = dosing::resolve_route(&config.dosing.route, has_tlag);

        models
            .get_pk_model_from_id(&model_id)
            .and_then(|model| model.entry_for(route))
            .ok_or_else(|| PKError::InvalidModel(format!("no calculator registered for model '{model_id}' on route {route:?}")))?;

        let base_parameters = build_base_parameter_event(&config.model)?;

        Ok(Self { config, rng, models, model_id, route, base_parameters })
    }

    fn calculator_id(&self) -> CalculatorId {
        self.models.get_pk_model_from_id(&self.model_id).unwrap().entry_for(self.route).unwrap().calculator_id
    }

    pub fn simulate_population(&mut self, n_patients: usize) -> PKResult<Vec<PatientResult>> {
        info!("Starting population simulation for {} patients", n_patients);

        let intakes = dosing::build_intake_series(
            &self.config.dosing,
            self.route,
            self.calculator_id(),
            &self.config.simulation.time_points,
        )?;

        let mut parameters = ParameterSetSeries::new();
        parameters.add_parameter_set_event(self.base_parameters.clone());

        let mut results = Vec::with_capacity(n_patients);
        for patient_id in 1..=n_patients {
            if patient_id % 10 == 0 || patient_id <= 10 {
                info!("Simulating patient {}/{}", patient_id, n_patients);
            }

            let patient_result = self.simulate_individual(patient_id, &intakes, &parameters)?;
            results.push(patient_result);
        }

        info!("Population simulation completed");
        Ok(results)
    }

    fn simulate_individual(
        &mut self,
        patient_id: usize,
        intakes: &IntakeSeries,
        parameters: &ParameterSetSeries,
    ) -> PKResult<PatientResult> {
        debug!("Simulating patient {}", patient_id);

        let etas = self.sample_etas()?;
        let demographics = self.generate_demographics()?;

        let snapshot = parameters
            .get_at_time(0.0, &etas)
            .ok_or_else(|| PKError::Simulation("no parameter event covers time zero".to_string()))?;
        let snapshot = clamp_to_bounds(snapshot, &self.config.model);

        let time_points = self.config.simulation.time_points.clone();
        let predicted = MultiConcentrationCalculator
            .compute_concentrations_at_times(false, intakes, parameters, &time_points, &etas)
            .map_err(|status| PKError::Simulation(format!("{status:?}")))?;

        let error_model = Proportional { sigma: self.config.simulation.sigma };
        let mut observations = Vec::with_capacity(predicted.len());
        for (&time, analytes) in time_points.iter().zip(predicted.iter()) {
            let predicted_conc = analytes.first().copied().unwrap_or(0.0);
            let observed_conc = if predicted_conc <= 0.0 {
                0.0
            } else {
                let eps = self.rng.sample::<f64, _>(Normal::new(0.0, 1.0)?);
                let mut value = [predicted_conc];
                error_model.apply_eps_to_array(&mut value, &vec![eps]);
                value[0].max(0.0)
            };

            observations.push(Observation { time, concentration: observed_conc, predicted_concentration: predicted_conc });
        }

        let parameters_by_name: HashMap<String, f64> =
            snapshot.parameters().iter().map(|p| (p.definition.id.name().to_string(), p.value)).collect();

        Ok(PatientResult { patient_id, demographics, parameters: parameters_by_name, observations })
    }

    fn sample_etas(&mut self) -> PKResult<Etas> {
        let mut etas = Etas::new();
        for parameter in self.base_parameters.parameters() {
            if !parameter.is_variable() {
                continue;
            }
            for &sd in &parameter.definition.variability.standard_deviations {
                let dist = Normal::new(0.0, sd)?;
                etas.push(self.rng.sample(dist));
            }
        }
        Ok(etas)
    }

    fn generate_demographics(&mut self) -> PKResult<Demographics> {
        let demo_config = self.config.population.demographics.clone();

        let weight = self.rng.sample(Normal::new(demo_config.weight_mean, demo_config.weight_sd)?);
        let age = self.rng.sample(Normal::new(demo_config.age_mean, demo_config.age_sd)?);

        Ok(Demographics { weight: weight.max(30.0).min(200.0), age: age.max(18.0).min(100.0) })
    }
}

/// Chooses the registered model id for a compartment count and parameter
/// naming. `Config::validate_model_parameters` currently only ever populates
/// the CL/V-style keys, so this resolves to the macro form in practice; the
/// Ke/K12-style and RQCL/RV2V1-ratio branches exist for a config file that
/// supplies rate constants or ratios directly.
fn resolve_model_id(model: &ModelConfig) -> PKResult<String> {
    let has = |name: &str| model.parameters.contains_key(name);
    let form = match model.compartments {
        1 => {
            if has("KE") {
                "micro"
            } else {
                "macro"
            }
        }
        2 => {
            if has("RQCL") {
                "macroratios"
            } else if has("KE") {
                "micro"
            } else {
                "macro"
            }
        }
        3 => {
            if has("KE") {
                "micro"
            } else {
                "macro"
            }
        }
        n => return Err(PKError::InvalidModel(format!("Unsupported number of compartments: {n}"))),
    };
    Ok(format!("linear.{}comp.{}", model.compartments, form))
}

/// Maps the config file's NONMEM-style parameter names to a `ParameterId`.
fn parameter_id_from_config_name(name: &str) -> Option<ParameterId> {
    match name.to_ascii_uppercase().as_str() {
        "CL" => Some(ParameterId::CL),
        "V" => Some(ParameterId::V),
        "V1" => Some(ParameterId::V1),
        "V2" => Some(ParameterId::V2),
        "V3" => Some(ParameterId::V3),
        "Q" => Some(ParameterId::Q),
        "Q1" => Some(ParameterId::Q1),
        "Q2" => Some(ParameterId::Q2),
        "Q3" => Some(ParameterId::Q3),
        "KE" => Some(ParameterId::Ke),
        "K12" => Some(ParameterId::K12),
        "K21" => Some(ParameterId::K21),
        "K13" => Some(ParameterId::K13),
        "K31" => Some(ParameterId::K31),
        "KA" => Some(ParameterId::Ka),
        "F" => Some(ParameterId::F),
        "TLAG" => Some(ParameterId::Tlag),
        "KM" => Some(ParameterId::Km),
        "VMAX" => Some(ParameterId::Vmax),
        "RQCL" => Some(ParameterId::RQCL),
        "RV2V1" => Some(ParameterId::RV2V1),
        _ => None,
    }
}

/// Converts the config's CV% omega into the log-normal sigma the
/// `Exponential` variability kind expects — the same conversion the
/// teacher's `apply_log_normal_variability` used.
fn cv_to_sigma_log(cv_percent: f64) -> f64 {
    let cv = cv_percent / 100.0;
    (cv * cv + 1.0).ln().sqrt()
}

fn build_base_parameter_event(model: &ModelConfig) -> PKResult<ParameterSetEvent> {
    let mut event = ParameterSetEvent::new(0.0);
    for (name, param_config) in &model.parameters {
        let id = parameter_id_from_config_name(name)
            .ok_or_else(|| PKError::InvalidModel(format!("Unknown parameter: {name}")))?;

        let definition = match param_config.omega {
            Some(omega) if omega > 0.0 => {
                let sigma_log = cv_to_sigma_log(omega);
                ParameterDefinition::variable(
                    id,
                    param_config.theta,
                    Variability::new(VariabilityKind::Exponential, vec![sigma_log]),
                )
            }
            _ => ParameterDefinition::fixed(id, param_config.theta),
        };
        event.add_parameter_event(definition, param_config.theta);
    }
    Ok(event)
}

/// Reapplies the config's declared (lower, upper) bounds to a post-eta
/// snapshot, matching the teacher's `generate_individual_parameters` clamp.
fn clamp_to_bounds(snapshot: ParameterSetEvent, model: &ModelConfig) -> ParameterSetEvent {
    let mut snapshot = snapshot;
    for (name, param_config) in &model.parameters {
        let Some((lower, upper)) = param_config.bounds else { continue };
        let Some(id) = parameter_id_from_config_name(name) else { continue };
        if let Some(value) = snapshot.get_value(id) {
            let clamped = value.max(lower).min(upper);
            snapshot.add_parameter_event(ParameterDefinition::fixed(id, clamped), clamped);
        }
    }
    snapshot
}
