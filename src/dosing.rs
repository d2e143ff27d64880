//! Turns the flat `DosingConfig` schedule into an `IntakeSeries` the
//! multi-concentration core can chain cycle to cycle. Grounded on
//! `original_source/src/tucucore/intakeevent.h`'s event list and on the
//! teacher's own `DosingRegimen` (one dose per configured time, sorted),
//! generalized to carry an `interval`/`infusion_time`/`calculator_id` per
//! event instead of a bare (time, amount, route) tuple.

use std::rc::Rc;

use crate::calculator::CalculatorId;
use crate::config::{DosingConfig, DosingRoute};
use crate::error::{PKError, PKResult};
use crate::intake::{AbsorptionRoute, IntakeEvent, IntakeSeries};

/// Number of concentration points requested per cycle when none is forced by
/// a density retry. Matches the grid density the teacher's own time-point
/// simulation loop implicitly used by evaluating at many observation times.
const DEFAULT_NB_POINTS: usize = 20;

/// Interval given to a dose that has no later dose or observation time to
/// bound it.
const FALLBACK_TAIL_INTERVAL: f64 = 24.0;

pub fn build_intake_series(
    config: &DosingConfig,
    route: AbsorptionRoute,
    calculator_id: CalculatorId,
    observation_times: &[f64],
) -> PKResult<IntakeSeries> {
    if config.times.is_empty() {
        return Err(PKError::InvalidDosing("At least one dosing time must be specified".to_string()));
    }

    let mut times = config.times.clone();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let infusion_time = match route {
        AbsorptionRoute::IntravascularInfusion => {
            let duration = config.additional.as_ref().and_then(|a| a.duration).unwrap_or(0.0);
            if duration <= 0.0 {
                return Err(PKError::InvalidDosing("Infusion duration must be specified and positive".to_string()));
            }
            duration
        }
        _ => 0.0,
    };

    let last_observation = observation_times.iter().cloned().fold(f64::MIN, f64::max);
    let calculator_id = Rc::new(calculator_id);

    let mut series = IntakeSeries::new();
    for (i, &time) in times.iter().enumerate() {
        let interval = match times.get(i + 1) {
            Some(&next) => next - time,
            None => {
                let tail = last_observation - time;
                if tail.is_finite() && tail > infusion_time {
                    tail
                } else {
                    FALLBACK_TAIL_INTERVAL.max(infusion_time + 1.0)
                }
            }
        };

        series.push(IntakeEvent::new(
            time,
            config.amount,
            interval,
            infusion_time,
            route,
            DEFAULT_NB_POINTS,
            Rc::clone(&calculator_id),
        ));
    }

    Ok(series)
}

/// Maps the config's dosing route plus a `Tlag` hint from the model
/// parameters to an absorption route. Lagged absorption is only modeled for
/// the one-compartment family (`CalculatorId::OneCompartmentExtraLag*`), so
/// `has_tlag` is ignored outside that family by the caller.
pub fn resolve_route(route: &DosingRoute, has_tlag: bool) -> AbsorptionRoute {
    match route {
        DosingRoute::IvBolus => AbsorptionRoute::IntravascularBolus,
        DosingRoute::IvInfusion => AbsorptionRoute::IntravascularInfusion,
        DosingRoute::Oral if has_tlag => AbsorptionRoute::ExtravascularLag,
        DosingRoute::Oral => AbsorptionRoute::Extravascular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdditionalDosingParams;

    #[test]
    fn consecutive_doses_get_the_gap_as_their_interval() {
        let config = DosingConfig { route: DosingRoute::IvBolus, amount: 100.0, times: vec![0.0, 12.0, 24.0], additional: None };
        let series =
            build_intake_series(&config, AbsorptionRoute::IntravascularBolus, CalculatorId::OneCompartmentBolusMicro, &[36.0])
                .unwrap();
        assert_eq!(series.len(), 3);
        let events: Vec<_> = series.iter().collect();
        assert_eq!(events[0].interval, 12.0);
        assert_eq!(events[1].interval, 12.0);
        assert_eq!(events[2].interval, 12.0);
    }

    #[test]
    fn infusion_without_duration_is_rejected() {
        let config = DosingConfig { route: DosingRoute::IvInfusion, amount: 100.0, times: vec![0.0], additional: None };
        let result =
            build_intake_series(&config, AbsorptionRoute::IntravascularInfusion, CalculatorId::OneCompartmentInfusionMicro, &[
                24.0,
            ]);
        assert!(result.is_err());
    }

    #[test]
    fn infusion_duration_becomes_infusion_time() {
        let config = DosingConfig {
            route: DosingRoute::IvInfusion,
            amount: 1000.0,
            times: vec![0.0],
            additional: Some(AdditionalDosingParams { duration: Some(2.0), lag_time: None, bioavailability: None }),
        };
        let series = build_intake_series(
            &config,
            AbsorptionRoute::IntravascularInfusion,
            CalculatorId::OneCompartmentInfusionMicro,
            &[24.0],
        )
        .unwrap();
        assert_eq!(series.iter().next().unwrap().infusion_time, 2.0);
    }

    #[test]
    fn oral_with_tlag_hint_resolves_to_lagged_route() {
        assert_eq!(resolve_route(&DosingRoute::Oral, true), AbsorptionRoute::ExtravascularLag);
        assert_eq!(resolve_route(&DosingRoute::Oral, false), AbsorptionRoute::Extravascular);
    }
}
