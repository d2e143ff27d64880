//! Process-wide table mapping a model-id string to, per absorption route, a
//! calculator and its required parameter ids. Grounded on spec §4.6; the
//! original's dedicated registry source wasn't part of the retrieved set,
//! so the population list below is built from the concrete
//! `CalculatorId` variants `calculator::build` already supports.

use std::collections::HashMap;

use crate::calculator::{build, CalculatorId};
use crate::intake::AbsorptionRoute;
use crate::parameter::ParameterId;

/// One (route -> calculator) mapping for a model id, with the calculator's
/// required parameters cached at registration time.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub calculator_id: CalculatorId,
    pub required_parameters: Vec<ParameterId>,
}

/// A single PK model: every absorption route it supports.
#[derive(Debug, Clone, Default)]
pub struct PkModel {
    routes: HashMap<AbsorptionRoute, ModelEntry>,
}

impl PkModel {
    fn new() -> Self {
        Self::default()
    }

    fn with_route(mut self, route: AbsorptionRoute, calculator_id: CalculatorId) -> Self {
        let required_parameters = build(calculator_id).required_parameters().to_vec();
        self.routes.insert(route, ModelEntry { calculator_id, required_parameters });
        self
    }

    pub fn entry_for(&self, route: AbsorptionRoute) -> Option<&ModelEntry> {
        self.routes.get(&route)
    }
}

/// Process-wide collection of PK models, keyed by model-id string (e.g.
/// `linear.1comp.macro`). Insertion of a duplicate id fails and logs a
/// warning, matching the original's `addPkModel` behavior.
#[derive(Debug, Clone, Default)]
pub struct PkModelCollection {
    models: HashMap<String, PkModel>,
}

impl PkModelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, id: &str, model: PkModel) -> bool {
        if self.models.contains_key(id) {
            log::warn!("A PK model with id '{}' is already registered.", id);
            return false;
        }
        self.models.insert(id.to_string(), model);
        true
    }

    pub fn get_pk_model_from_id(&self, id: &str) -> Option<&PkModel> {
        self.models.get(id)
    }
}

/// Populates `collection` with every analytical and RK4 model this crate
/// implements. Called once at process startup.
pub fn default_populate(collection: &mut PkModelCollection) {
    use AbsorptionRoute::*;
    use CalculatorId::*;

    let one_comp = |bolus, infusion, extra, extra_lag| {
        PkModel::new()
            .with_route(IntravascularBolus, bolus)
            .with_route(IntravascularInfusion, infusion)
            .with_route(Extravascular, extra)
            .with_route(ExtravascularLag, extra_lag)
    };

    collection.add_model(
        "linear.1comp.micro",
        one_comp(OneCompartmentBolusMicro, OneCompartmentInfusionMicro, OneCompartmentExtraMicro, OneCompartmentExtraLagMicro),
    );
    collection.add_model(
        "linear.1comp.macro",
        one_comp(OneCompartmentBolusMacro, OneCompartmentInfusionMacro, OneCompartmentExtraMacro, OneCompartmentExtraLagMacro),
    );

    let two_comp = |bolus, infusion, extra| {
        PkModel::new()
            .with_route(IntravascularBolus, bolus)
            .with_route(IntravascularInfusion, infusion)
            .with_route(Extravascular, extra)
    };

    collection.add_model(
        "linear.2comp.micro",
        two_comp(TwoCompartmentBolusMicro, TwoCompartmentInfusionMicro, TwoCompartmentExtraMicro),
    );
    collection.add_model(
        "linear.2comp.macro",
        two_comp(TwoCompartmentBolusMacro, TwoCompartmentInfusionMacro, TwoCompartmentExtraMacro),
    );
    collection.add_model(
        "linear.2comp.macroratios",
        two_comp(TwoCompartmentBolusMacroRatios, TwoCompartmentInfusionMacroRatios, TwoCompartmentExtraMacroRatios),
    );

    let three_comp = |bolus, infusion, extra| {
        PkModel::new()
            .with_route(IntravascularBolus, bolus)
            .with_route(IntravascularInfusion, infusion)
            .with_route(Extravascular, extra)
    };

    collection.add_model(
        "linear.3comp.micro",
        three_comp(ThreeCompartmentBolusMicro, ThreeCompartmentInfusionMicro, ThreeCompartmentExtraMicro),
    );
    collection.add_model(
        "linear.3comp.macro",
        three_comp(ThreeCompartmentBolusMacro, ThreeCompartmentInfusionMacro, ThreeCompartmentExtraMacro),
    );

    collection.add_model(
        "michaelismenten.1comp",
        PkModel::new()
            .with_route(IntravascularBolus, RkMichaelisMentenOneCompBolus)
            .with_route(IntravascularInfusion, RkMichaelisMentenOneCompInfusion)
            .with_route(Extravascular, RkMichaelisMentenOneCompExtra),
    );

    collection.add_model(
        "michaelismenten.enzyme",
        PkModel::new()
            .with_route(IntravascularBolus, RkMichaelisMentenEnzymeBolus)
            .with_route(Extravascular, RkMichaelisMentenEnzymeExtra),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_populate_registers_every_analytical_family() {
        let mut collection = PkModelCollection::new();
        default_populate(&mut collection);

        for id in [
            "linear.1comp.micro",
            "linear.1comp.macro",
            "linear.2comp.micro",
            "linear.2comp.macro",
            "linear.2comp.macroratios",
            "linear.3comp.micro",
            "linear.3comp.macro",
            "michaelismenten.1comp",
            "michaelismenten.enzyme",
        ] {
            assert!(collection.get_pk_model_from_id(id).is_some(), "missing model {id}");
        }
    }

    #[test]
    fn duplicate_model_id_registration_fails() {
        let mut collection = PkModelCollection::new();
        assert!(collection.add_model("linear.1comp.micro", PkModel::new()));
        assert!(!collection.add_model("linear.1comp.micro", PkModel::new()));
    }

    #[test]
    fn unknown_model_id_returns_none() {
        let collection = PkModelCollection::new();
        assert!(collection.get_pk_model_from_id("does.not.exist").is_none());
    }

    #[test]
    fn required_parameters_are_populated_per_route() {
        let mut collection = PkModelCollection::new();
        default_populate(&mut collection);
        let model = collection.get_pk_model_from_id("linear.1comp.macro").unwrap();
        let entry = model.entry_for(AbsorptionRoute::IntravascularBolus).unwrap();
        assert!(entry.required_parameters.contains(&ParameterId::CL));
        assert!(entry.required_parameters.contains(&ParameterId::V));
    }
}
