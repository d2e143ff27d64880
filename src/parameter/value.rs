use log::warn;

use super::definition::{ParameterDefinition, VariabilityKind};

/// A parameter definition bound to a current value, plus the bookkeeping
/// `ParameterSetEvent::add_parameter_event` needs to apply etas in bulk.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub definition: ParameterDefinition,
    pub value: f64,
    /// Index of this parameter's first eta within the owning event's eta
    /// vector. Meaningless for fixed parameters.
    pub omega_index: usize,
    /// Number of etas this parameter consumes (sums them before applying).
    pub nb_etas: usize,
}

impl Parameter {
    pub fn new(definition: ParameterDefinition, value: f64) -> Self {
        Self {
            definition,
            value,
            omega_index: 0,
            nb_etas: 0,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.definition.is_variable()
    }

    /// Applies one (possibly pre-summed) eta realization to this parameter's
    /// value, per its variability kind. Returns `false` when the result is
    /// infinite or NaN (logged at `warn`); a resulting negative value is also
    /// logged at `warn` but is *not* treated as a failure and is propagated
    /// unchanged.
    pub fn apply_eta(&mut self, eta: f64) -> bool {
        if !self.is_variable() {
            return true;
        }

        match self.definition.variability.kind {
            VariabilityKind::None => {}
            VariabilityKind::Additive => {
                self.value += eta;
            }
            VariabilityKind::Exponential => {
                self.value *= eta.exp();
            }
            VariabilityKind::Proportional => {
                self.value *= 1.0 + eta;
            }
            VariabilityKind::Logit => {
                let logit_p = (self.value / (1.0 - self.value)).ln();
                let new_logit_p = logit_p + eta;
                self.value = 1.0 / (1.0 + (-new_logit_p).exp());
            }
        }

        if self.value.is_nan() {
            warn!(
                "Applying eta to parameter {} makes it not a number",
                self.definition.id
            );
            return false;
        }
        if self.value.is_infinite() {
            warn!(
                "Applying eta to parameter {} makes it infinite",
                self.definition.id
            );
            return false;
        }
        if self.value < 0.0 {
            warn!(
                "Applying eta to parameter {} makes it negative",
                self.definition.id
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::definition::{ParameterId, Variability};
    use approx::assert_relative_eq;

    fn param(kind: VariabilityKind, value: f64) -> Parameter {
        Parameter::new(
            ParameterDefinition::variable(ParameterId::V, value, Variability::new(kind, vec![0.1])),
            value,
        )
    }

    #[test]
    fn zero_eta_is_identity_for_every_kind() {
        for kind in [
            VariabilityKind::Additive,
            VariabilityKind::Exponential,
            VariabilityKind::Proportional,
        ] {
            let mut p = param(kind, 20.0);
            assert!(p.apply_eta(0.0));
            assert_relative_eq!(p.value, 20.0, max_relative = 1e-12);
        }

        let mut logit = param(VariabilityKind::Logit, 0.3);
        assert!(logit.apply_eta(0.0));
        assert_relative_eq!(logit.value, 0.3, max_relative = 1e-9);
    }

    #[test]
    fn log_normal_application_matches_scenario_5() {
        let mut p = param(VariabilityKind::Exponential, 20.0);
        assert!(p.apply_eta(0.1));
        assert_relative_eq!(p.value, 20.0 * (0.1_f64).exp(), max_relative = 1e-9);
    }

    #[test]
    fn negative_value_is_a_warning_not_a_failure() {
        let mut p = param(VariabilityKind::Additive, 1.0);
        assert!(p.apply_eta(-5.0));
        assert_relative_eq!(p.value, -4.0, max_relative = 1e-12);
    }

    #[test]
    fn fixed_parameter_ignores_eta() {
        let mut p = Parameter::new(ParameterDefinition::fixed(ParameterId::V, 10.0), 10.0);
        assert!(p.apply_eta(99.0));
        assert_relative_eq!(p.value, 10.0, max_relative = 1e-12);
    }
}
