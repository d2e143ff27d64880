//! Enzyme-induction (auto-induction) one-compartment model with a
//! transit-compartment absorption and a third, enzyme-level state. Grounded
//! on
//! `original_source/src/tucucore/pkmodels/rkmichaelismentenenzyme.h/.cpp`.
//! State: `[central, depot, enzyme]`. The infusion variant is commented out
//! in the original and is not implemented here either.

use crate::calculator::{
    check_condition, check_strictly_positive, IntakeIntervalCalculator, IntakePointsResult, SinglePointResult,
};
use crate::error::ComputingStatus;
use crate::intake::IntakeEvent;
use crate::parameter::{ParameterId, ParameterSetEvent};
use crate::residual::Residuals;

use super::super::analytical::pertinent_times_for;
use super::{all_finite, integrate_at_times};

struct Resolved {
    dose: f64,
    v: f64,
    km: f64,
    vmax: f64,
    f: f64,
    ka: f64,
    allm_cl: f64,
    kenz: f64,
    emax: f64,
    ecmid: f64,
    // Transit-compartment absorption terms, zeroed for the bolus route.
    ktr: f64,
    cumul: f64,
    mtt: f64,
    nn: f64,
}

/// `tvbio`'s defining expression has a removable discontinuity at
/// `dose == DoseMid - EDmid`; this clamps to the value at a bound around
/// that point instead of evaluating through it, exactly as the original
/// does.
fn tvbio(dose: f64, f: f64, fmax: f64, dose_mid: f64, ed_mid: f64) -> f64 {
    let critical_point = dose_mid - ed_mid;
    let low_bound = critical_point - 23.0;
    let high_bound = critical_point + 37.0;

    let value = if dose < critical_point && dose > low_bound {
        f * (1.0 + fmax * (low_bound - dose_mid) / (ed_mid + (low_bound - dose_mid)))
    } else if dose > critical_point && dose < high_bound {
        f * (1.0 + fmax * (high_bound - dose_mid) / (ed_mid + (high_bound - dose_mid)))
    } else {
        f * (1.0 + fmax * (dose - dose_mid) / (ed_mid + (dose - dose_mid)))
    };

    if value <= 0.0 {
        0.5
    } else {
        value
    }
}

fn resolve(extravascular: bool, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> Option<Resolved> {
    let dose = intake.dose;
    let v = parameters.get_value(ParameterId::V)?;
    let km = parameters.get_value(ParameterId::Km)?;
    let vmax = parameters.get_value(ParameterId::Vmax)?;
    let f = parameters.get_value(ParameterId::F)?;
    let allm_cl = parameters.get_value(ParameterId::AllmCL)?;
    let kenz = parameters.get_value(ParameterId::Kenz)?;
    let emax = parameters.get_value(ParameterId::Emax)?;
    let ecmid = parameters.get_value(ParameterId::ECmid)?;

    let (ka, ktr, cumul, mtt, nn) = if extravascular {
        let ka = parameters.get_value(ParameterId::Ka)?;
        let ed_mid = parameters.get_value(ParameterId::EDmid)?;
        let dose_mid = parameters.get_value(ParameterId::DoseMid)?;
        let fmax = parameters.get_value(ParameterId::Fmax)?;
        let nn = parameters.get_value(ParameterId::NN)?;
        let mtt = parameters.get_value(ParameterId::MTT)?;

        if !check_strictly_positive(ed_mid, "EDmid")
            || !check_strictly_positive(dose_mid, "DoseMid")
            || !check_strictly_positive(nn, "NN")
            || !check_strictly_positive(mtt, "MTT")
        {
            return None;
        }

        let ktr = (nn + 1.0) / mtt;
        // log(Gamma(nn+1)) via Stirling's approximation, as the original does.
        let l = 0.9189385 + (nn + 0.5) * nn.ln() - nn + (1.0 + 1.0 / (12.0 * nn)).ln();
        let bio = tvbio(dose, f, fmax, dose_mid, ed_mid);
        let lbpd = (bio * dose).ln();
        let lktr = ktr.ln();
        let cumul = lbpd + lktr - l;

        (ka, ktr, cumul, mtt, nn)
    } else {
        (0.0, 0.0, 0.0, 0.0, 0.0)
    };

    let ok = check_strictly_positive(v, "The volume")
        && check_strictly_positive(f, "The bioavailability")
        && check_strictly_positive(km, "The Michaelis Menten constant")
        && check_strictly_positive(vmax, "VMax")
        && check_strictly_positive(allm_cl, "Allometric clearance")
        && check_strictly_positive(kenz, "Kenz")
        && check_strictly_positive(emax, "Emax")
        && check_strictly_positive(ecmid, "ECmid")
        && (!extravascular || check_strictly_positive(ka, "The absorption rate"))
        && check_condition(intake.nb_points > 0, "The number of points is zero or negative.")
        && check_condition(intake.interval > 0.0, "The interval time is negative.");
    if !ok {
        return None;
    }

    Some(Resolved { dose, v, km, vmax, f, ka, allm_cl, kenz, emax, ecmid, ktr, cumul, mtt, nn })
}

/// The induction state starts at 1.0 on a first dose (residual-in of 0),
/// otherwise carries the prior cycle's value forward.
fn initial_state(extravascular: bool, r: &Resolved, residuals_in: &Residuals) -> [f64; 3] {
    let c0 = residuals_in.first().copied().unwrap_or(0.0);
    let c1 = residuals_in.get(1).copied().unwrap_or(0.0);
    let c2 = residuals_in.get(2).copied().unwrap_or(0.0);

    if extravascular {
        let enz = if r.dose > 0.0 {
            if c2 == 0.0 {
                1.0
            } else {
                c2
            }
        } else {
            c2
        };
        [c0, c1, enz]
    } else {
        let enz = if r.dose > 0.0 { c2 + 1.0 } else { c2 };
        [c0 + r.dose * r.f / r.v, c1, enz]
    }
}

fn derive(r: &Resolved, t: f64, c: &[f64]) -> Vec<f64> {
    let c0 = c[0];
    let c1 = c[1];
    let c2 = c[2];
    let ka_c1 = r.ka * c1;
    let den0 = 1.0 / (r.km + c0);
    let den2 = 1.0 / (r.ecmid + c0);

    let mut d0 = ka_c1 - r.vmax * c0 * r.allm_cl * c2 * den0;
    let d1 = if r.mtt == 0.0 {
        -ka_c1
    } else {
        let ktt = r.ktr * t;
        let log_density = if ktt > 0.0 { r.nn * ktt.ln() + r.cumul - ktt } else { f64::NEG_INFINITY };
        -ka_c1 + log_density.exp()
    };
    let d2 = r.kenz * (1.0 - c2 + c0 * r.emax * den2);

    d0 *= 1.0 / r.v;
    vec![d0, d1, d2]
}

#[derive(Debug, Clone, Copy)]
pub struct EnzymeInduction {
    pub extravascular: bool,
}

impl IntakeIntervalCalculator for EnzymeInduction {
    fn required_parameters(&self) -> &'static [ParameterId] {
        if self.extravascular {
            &[
                ParameterId::V,
                ParameterId::Km,
                ParameterId::Vmax,
                ParameterId::F,
                ParameterId::Ka,
                ParameterId::Kenz,
                ParameterId::Emax,
                ParameterId::ECmid,
                ParameterId::EDmid,
                ParameterId::DoseMid,
                ParameterId::Fmax,
                ParameterId::NN,
                ParameterId::MTT,
                ParameterId::AllmCL,
            ]
        } else {
            &[
                ParameterId::V,
                ParameterId::Km,
                ParameterId::Vmax,
                ParameterId::F,
                ParameterId::Kenz,
                ParameterId::Emax,
                ParameterId::ECmid,
                ParameterId::AllmCL,
            ]
        }
    }

    fn residual_size(&self) -> usize {
        3
    }

    fn check_inputs(&self, intake: &IntakeEvent, parameters: &ParameterSetEvent) -> bool {
        resolve(self.extravascular, intake, parameters).is_some()
    }

    fn calculate_intake_points(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        compute_all_compartments: bool,
        fixed_density: Option<usize>,
    ) -> Result<IntakePointsResult, ComputingStatus> {
        let r = resolve(self.extravascular, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let y0 = initial_state(self.extravascular, &r, residuals_in);
        let times = pertinent_times_for(intake, fixed_density);

        let f = |t: f64, c: &[f64]| derive(&r, t, c);
        let states = integrate_at_times(&f, &y0, &times, None);
        if states.iter().any(|s| !all_finite(s)) {
            return Err(ComputingStatus::Nan);
        }

        let central: Vec<f64> = states.iter().map(|s| s[0]).collect();
        let depot: Vec<f64> = states.iter().map(|s| s[1]).collect();
        let enzyme: Vec<f64> = states.iter().map(|s| s[2]).collect();

        let end_state = if intake.interval == 0.0 {
            vec![0.0, 0.0, 0.0]
        } else {
            integrate_at_times(&f, &y0, &[intake.interval], None).remove(0)
        };
        let residual_out = vec![end_state[0].max(0.0), end_state[1].max(0.0), end_state[2].max(0.0)];

        let mut concentrations = vec![central];
        if compute_all_compartments {
            concentrations.push(depot);
            concentrations.push(enzyme);
        }

        Ok(IntakePointsResult { times, concentrations, residuals_out: residual_out })
    }

    fn calculate_intake_single_point(
        &self,
        intake: &IntakeEvent,
        parameters: &ParameterSetEvent,
        residuals_in: &Residuals,
        at_time: f64,
        compute_all_compartments: bool,
    ) -> Result<SinglePointResult, ComputingStatus> {
        let r = resolve(self.extravascular, intake, parameters).ok_or(ComputingStatus::BadParameters)?;
        let y0 = initial_state(self.extravascular, &r, residuals_in);
        let f = |t: f64, c: &[f64]| derive(&r, t, c);
        let times = vec![at_time, intake.interval];
        let states = integrate_at_times(&f, &y0, &times, None);
        if states.iter().any(|s| !all_finite(s)) {
            return Err(ComputingStatus::Nan);
        }

        let at_state = &states[0];
        let end_state = if intake.interval == 0.0 { vec![0.0, 0.0, 0.0] } else { states[1].clone() };
        let residual_out = vec![end_state[0].max(0.0), end_state[1].max(0.0), end_state[2].max(0.0)];

        let mut concentrations = vec![at_state[0]];
        if compute_all_compartments {
            concentrations.push(at_state[1]);
            concentrations.push(at_state[2]);
        }

        Ok(SinglePointResult { concentrations, residuals_out: residual_out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorId;
    use std::rc::Rc;

    fn make_params(values: &[(ParameterId, f64)]) -> ParameterSetEvent {
        let mut event = ParameterSetEvent::new(0.0);
        for &(id, value) in values {
            event.add_parameter_event(crate::parameter::definition::ParameterDefinition::fixed(id, value), value);
        }
        event
    }

    #[test]
    fn tvbio_stays_finite_and_positive_across_the_critical_point() {
        // dose == DoseMid - EDmid is the removable discontinuity.
        let dose_mid = 100.0;
        let ed_mid = 20.0;
        let critical = dose_mid - ed_mid;
        for &dose in &[critical - 25.0, critical - 1.0, critical, critical + 1.0, critical + 40.0] {
            let v = tvbio(dose, 0.8, 0.5, dose_mid, ed_mid);
            assert!(v.is_finite() && v > 0.0, "tvbio({dose}) = {v}");
        }
    }

    #[test]
    fn first_dose_seeds_induction_state_to_one() {
        let intake = IntakeEvent::new(
            0.0,
            500.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            4,
            Rc::new(CalculatorId::RkMichaelisMentenEnzymeBolus),
        );
        let parameters = make_params(&[
            (ParameterId::V, 10.0),
            (ParameterId::Km, 5.0),
            (ParameterId::Vmax, 20.0),
            (ParameterId::F, 1.0),
            (ParameterId::Kenz, 0.05),
            (ParameterId::Emax, 2.0),
            (ParameterId::ECmid, 3.0),
            (ParameterId::AllmCL, 1.0),
        ]);
        let r = resolve(false, &intake, &parameters).unwrap();
        let state = initial_state(false, &r, &vec![0.0, 0.0, 0.0]);
        assert_eq!(state[2], 1.0);
    }

    #[test]
    fn bolus_integration_stays_finite() {
        let intake = IntakeEvent::new(
            0.0,
            500.0,
            24.0,
            0.0,
            crate::intake::AbsorptionRoute::IntravascularBolus,
            5,
            Rc::new(CalculatorId::RkMichaelisMentenEnzymeBolus),
        );
        let parameters = make_params(&[
            (ParameterId::V, 10.0),
            (ParameterId::Km, 5.0),
            (ParameterId::Vmax, 20.0),
            (ParameterId::F, 1.0),
            (ParameterId::Kenz, 0.05),
            (ParameterId::Emax, 2.0),
            (ParameterId::ECmid, 3.0),
            (ParameterId::AllmCL, 1.0),
        ]);
        let calc = EnzymeInduction { extravascular: false };
        let residuals_in = vec![0.0, 0.0, 0.0];

        let result = calc.calculate_intake_points(&intake, &parameters, &residuals_in, true, None).unwrap();
        assert_eq!(result.concentrations.len(), 3);
        assert!(result.concentrations.iter().flatten().all(|&c| c.is_finite()));
        assert!(result.residuals_out.iter().all(|&c| c >= 0.0 && c.is_finite()));
    }
}
