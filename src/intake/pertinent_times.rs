//! Chooses the time grid within one cycle. Grounded on
//! `original_source/src/tucucore/intakeintervalcalculator.cpp`'s
//! `PertinentTimesCalculatorStandard` / `PertinentTimesCalculatorInfusion`.

use super::event::IntakeEvent;

pub trait PertinentTimesCalculator {
    /// Fills an `nb_points`-length vector of times (hours from cycle start,
    /// endpoint inclusive).
    fn calculate_times(&self, intake: &IntakeEvent, nb_points: usize) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

impl PertinentTimesCalculator for Standard {
    fn calculate_times(&self, intake: &IntakeEvent, nb_points: usize) -> Vec<f64> {
        if nb_points == 1 {
            return vec![intake.interval];
        }
        (0..nb_points)
            .map(|i| (i as f64) / ((nb_points - 1) as f64) * intake.interval)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Infusion;

impl PertinentTimesCalculator for Infusion {
    fn calculate_times(&self, intake: &IntakeEvent, nb_points: usize) -> Vec<f64> {
        let infusion_effective = intake.infusion_time.min(intake.interval);
        let interval = intake.interval;

        if nb_points == 1 {
            return vec![interval];
        }
        if nb_points == 2 {
            return vec![0.0, interval];
        }

        let post_time = interval - infusion_effective;
        let raw = (infusion_effective / interval) * (nb_points as f64);
        let nb_infus = (raw.round() as usize).clamp(2, nb_points);
        let nb_post = nb_points - nb_infus;

        let mut times = vec![0.0; nb_points];
        for i in 0..nb_infus {
            times[i] = (i as f64) / ((nb_infus - 1) as f64) * infusion_effective;
        }
        for i in 0..nb_post {
            times[i + nb_infus] = infusion_effective + ((i + 1) as f64) / (nb_post as f64) * post_time;
        }
        times
    }
}

pub fn for_route(route: super::event::AbsorptionRoute) -> Box<dyn PertinentTimesCalculator> {
    if route.is_infusion() {
        Box::new(Infusion)
    } else {
        Box::new(Standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorId;
    use crate::intake::event::AbsorptionRoute;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn intake(interval: f64, infusion_time: f64, route: AbsorptionRoute, nb_points: usize) -> IntakeEvent {
        IntakeEvent::new(0.0, 100.0, interval, infusion_time, route, nb_points, Rc::new(CalculatorId::OneCompartmentBolusMicro))
    }

    #[test]
    fn standard_single_point_is_interval() {
        let times = Standard.calculate_times(&intake(24.0, 0.0, AbsorptionRoute::IntravascularBolus, 1), 1);
        assert_eq!(times, vec![24.0]);
    }

    #[test]
    fn standard_uniform_grid() {
        let times = Standard.calculate_times(&intake(8.0, 0.0, AbsorptionRoute::IntravascularBolus, 5), 5);
        assert_relative_eq!(times[0], 0.0);
        assert_relative_eq!(times[4], 8.0);
        assert_relative_eq!(times[2], 4.0);
    }

    #[test]
    fn infusion_two_points_are_endpoints() {
        let times = Infusion.calculate_times(&intake(8.0, 1.0, AbsorptionRoute::IntravascularInfusion, 2), 2);
        assert_eq!(times, vec![0.0, 8.0]);
    }

    #[test]
    fn infusion_grid_hits_stop_instant_exactly() {
        let iv = intake(8.0, 1.0, AbsorptionRoute::IntravascularInfusion, 10);
        let times = Infusion.calculate_times(&iv, 10);
        assert!(times.iter().any(|&t| (t - 1.0).abs() < 1e-9));
        assert_relative_eq!(*times.last().unwrap(), 8.0);
    }
}
