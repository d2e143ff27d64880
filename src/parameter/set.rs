use std::collections::HashMap;

use log::warn;

use super::definition::{ParameterDefinition, ParameterId};
use super::value::Parameter;
use super::Etas;

/// An ordered list of parameters valid starting at `event_time`. Ordering:
/// variable parameters first, then fixed, alphabetical by id within each
/// group. Grounded on `original_source/src/tucucore/parameter.cpp`'s
/// `ParameterSetEvent::addParameterEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSetEvent {
    pub event_time: f64,
    parameters: Vec<Parameter>,
    id_to_index: HashMap<ParameterId, usize>,
}

impl ParameterSetEvent {
    pub fn new(event_time: f64) -> Self {
        Self {
            event_time,
            parameters: Vec::new(),
            id_to_index: HashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get_value(&self, id: ParameterId) -> Option<f64> {
        self.id_to_index.get(&id).map(|&i| self.parameters[i].value)
    }

    pub fn get_optional_value(&self, id: ParameterId, default: f64) -> f64 {
        self.get_value(id).unwrap_or(default)
    }

    pub fn has(&self, id: ParameterId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    /// Inserts or updates a (definition, value) pair, keeping the
    /// variable-first / alphabetical-within-group invariant, then rebuilds
    /// the omega-index bookkeeping and the id->position index.
    pub fn add_parameter_event(&mut self, definition: ParameterDefinition, value: f64) {
        let updating_index = self.parameters.iter().position(|p| p.definition.id == definition.id);

        if let Some(idx) = updating_index {
            self.parameters[idx] = Parameter::new(definition, value);
        } else {
            let insert_at = self
                .parameters
                .iter()
                .position(|p| {
                    match (definition.is_variable(), p.is_variable()) {
                        (true, false) => true,
                        (false, true) => false,
                        _ => definition.id < p.definition.id,
                    }
                })
                .unwrap_or(self.parameters.len());
            self.parameters.insert(insert_at, Parameter::new(definition, value));
        }

        self.reindex();
    }

    fn reindex(&mut self) {
        self.id_to_index.clear();
        let mut omega_index = 0usize;
        for (index, parameter) in self.parameters.iter_mut().enumerate() {
            if parameter.is_variable() {
                parameter.omega_index = omega_index;
                parameter.nb_etas = parameter.definition.variability.nb_etas().max(1);
                omega_index += parameter.nb_etas;
            }
            self.id_to_index.insert(parameter.definition.id, index);
        }
    }

    /// Pure application of an eta vector: returns a new event with etas
    /// applied, the original is untouched. Mirrors
    /// `ParameterSetEvent::applyEtas`, reworked as a value->value function
    /// per the redesign note in spec §9.
    pub fn with_etas_applied(&self, etas: &Etas) -> Option<ParameterSetEvent> {
        let mut copy = self.clone();
        let mut k = 0usize;
        let mut ok = true;

        for parameter in copy.parameters.iter_mut() {
            if !parameter.is_variable() {
                continue;
            }
            if parameter.nb_etas <= 1 {
                let eta = etas.get(k).copied().unwrap_or(0.0);
                ok &= parameter.apply_eta(eta);
                k += 1;
            } else {
                let sum: f64 = (0..parameter.nb_etas)
                    .map(|i| etas.get(k + i).copied().unwrap_or(0.0))
                    .sum();
                ok &= parameter.apply_eta(sum);
                k += parameter.nb_etas;
            }
        }

        if etas.len() != k {
            warn!("The eta vector does not fit the variable parameters size.");
        }

        if ok {
            Some(copy)
        } else {
            None
        }
    }
}

/// An ordered sequence of parameter set events, read-only during a
/// computation.
#[derive(Debug, Clone, Default)]
pub struct ParameterSetSeries {
    events: Vec<ParameterSetEvent>,
}

impl ParameterSetSeries {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn add_parameter_set_event(&mut self, event: ParameterSetEvent) {
        self.events.push(event);
        self.events
            .sort_by(|a, b| a.event_time.partial_cmp(&b.event_time).unwrap());
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the last event with time <= `at_time`, copied, with `etas`
    /// applied. Returns `None` if the series is empty or the eta application
    /// makes a value infinite/NaN.
    pub fn get_at_time(&self, at_time: f64, etas: &Etas) -> Option<ParameterSetEvent> {
        let mut iter = self.events.iter();
        let mut current = iter.next()?;
        for candidate in iter {
            if at_time >= candidate.event_time {
                current = candidate;
            } else {
                break;
            }
        }

        if etas.is_empty() {
            Some(current.clone())
        } else {
            current.with_etas_applied(etas)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::definition::{Variability, VariabilityKind};
    use approx::assert_relative_eq;

    fn def(id: ParameterId, variable: bool) -> ParameterDefinition {
        if variable {
            ParameterDefinition::variable(id, 1.0, Variability::new(VariabilityKind::Additive, vec![0.1]))
        } else {
            ParameterDefinition::fixed(id, 1.0)
        }
    }

    #[test]
    fn variable_parameters_precede_fixed_and_are_alphabetical() {
        let mut event = ParameterSetEvent::new(0.0);
        event.add_parameter_event(def(ParameterId::V, false), 10.0);
        event.add_parameter_event(def(ParameterId::CL, true), 2.0);
        event.add_parameter_event(def(ParameterId::Ka, true), 1.0);
        event.add_parameter_event(def(ParameterId::Ke, false), 0.2);

        let ids: Vec<&str> = event.parameters().iter().map(|p| p.definition.id.name()).collect();
        assert_eq!(ids, vec!["CL", "Ka", "Ke", "V"]);
    }

    #[test]
    fn o2_lookup_is_accurate_after_reindex() {
        let mut event = ParameterSetEvent::new(0.0);
        event.add_parameter_event(def(ParameterId::CL, false), 2.0);
        event.add_parameter_event(def(ParameterId::V, false), 10.0);
        assert_relative_eq!(event.get_value(ParameterId::CL).unwrap(), 2.0);
        assert_relative_eq!(event.get_value(ParameterId::V).unwrap(), 10.0);
        assert!(event.get_value(ParameterId::Ka).is_none());
    }

    #[test]
    fn get_at_time_returns_last_event_not_after_time() {
        let mut series = ParameterSetSeries::new();
        let mut e0 = ParameterSetEvent::new(0.0);
        e0.add_parameter_event(def(ParameterId::CL, false), 2.0);
        let mut e10 = ParameterSetEvent::new(10.0);
        e10.add_parameter_event(def(ParameterId::CL, false), 4.0);
        series.add_parameter_set_event(e10.clone());
        series.add_parameter_set_event(e0);

        let at5 = series.get_at_time(5.0, &vec![]).unwrap();
        assert_relative_eq!(at5.get_value(ParameterId::CL).unwrap(), 2.0);

        let at15 = series.get_at_time(15.0, &vec![]).unwrap();
        assert_relative_eq!(at15.get_value(ParameterId::CL).unwrap(), 4.0);
    }

    #[test]
    fn eta_application_is_pure() {
        let mut event = ParameterSetEvent::new(0.0);
        event.add_parameter_event(def(ParameterId::CL, true), 2.0);

        let applied = event.with_etas_applied(&vec![0.5]).unwrap();
        assert_relative_eq!(applied.get_value(ParameterId::CL).unwrap(), 2.5);
        // original untouched
        assert_relative_eq!(event.get_value(ParameterId::CL).unwrap(), 2.0);
    }
}
