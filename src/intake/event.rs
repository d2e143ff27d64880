use std::rc::Rc;

use crate::calculator::CalculatorId;

/// How the dose enters the body. Grounded on
/// `original_source/src/tucucore/intakeevent.h`'s `AbsorptionType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbsorptionRoute {
    IntravascularBolus,
    IntravascularInfusion,
    Extravascular,
    ExtravascularLag,
}

impl AbsorptionRoute {
    pub fn is_infusion(self) -> bool {
        matches!(self, AbsorptionRoute::IntravascularInfusion)
    }
}

/// One scheduled dose. `calculator_id` names the concrete
/// `IntakeIntervalCalculator` variant the registry resolved for
/// (model id, route) — the event carries the *choice*, the series owner
/// carries the calculator instances.
#[derive(Debug, Clone)]
pub struct IntakeEvent {
    pub event_time: f64,
    pub dose: f64,
    pub interval: f64,
    pub infusion_time: f64,
    pub route: AbsorptionRoute,
    pub nb_points: usize,
    pub calculator_id: Rc<CalculatorId>,
}

impl IntakeEvent {
    pub fn new(
        event_time: f64,
        dose: f64,
        interval: f64,
        infusion_time: f64,
        route: AbsorptionRoute,
        nb_points: usize,
        calculator_id: Rc<CalculatorId>,
    ) -> Self {
        Self {
            event_time,
            dose,
            interval,
            infusion_time,
            route,
            nb_points,
            calculator_id,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.event_time + self.interval
    }

    pub fn is_valid(&self) -> bool {
        if self.route.is_infusion() && self.infusion_time > self.interval {
            return false;
        }
        self.dose.is_finite() && self.dose >= 0.0 && self.nb_points >= 1
    }
}

/// An ordered, strictly-increasing-in-time list of intake events.
#[derive(Debug, Clone, Default)]
pub struct IntakeSeries {
    events: Vec<IntakeEvent>,
}

impl IntakeSeries {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends an intake. Panics only protect against a genuine programmer
    /// error (out-of-order insertion); callers build series in dose order.
    pub fn push(&mut self, event: IntakeEvent) {
        if let Some(last) = self.events.last() {
            debug_assert!(
                event.event_time > last.event_time,
                "intake events must be strictly increasing in time"
            );
        }
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntakeEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
