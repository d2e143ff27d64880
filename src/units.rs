//! Unit conversion tables, grounded on `original_source/src/tucucommon/unit.cpp`.
//!
//! The PK core treats unit conversion as an external collaborator (spec §6):
//! calculators never reach into this module, only `sample::SampleExtractor`
//! does, through the three functions below. Coverage matches spec §6: weight
//! (ug-kg), length (mm-m), time (s-year), concentration (g/l-ng/ml),
//! concentration-time, mole concentration (mol/l-umol/ml), molar mass, flow
//! rate (ml/min-l/h), temperature (celsius), and the empty/`-` unit.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFamily {
    Weight,
    Length,
    Time,
    Concentration,
    ConcentrationTime,
    MoleConcentration,
    MolarMass,
    FlowRate,
    Temperature,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit(String);

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table of (unit name, multiplier to the family's base unit). Conversion
/// between any two units of the same family is `value * from_mult / to_mult`.
fn family_and_multiplier(unit: &str) -> Option<(UnitFamily, f64)> {
    match unit {
        "" | "-" => Some((UnitFamily::None, 1.0)),

        "ug" => Some((UnitFamily::Weight, 1.0)),
        "mg" => Some((UnitFamily::Weight, 1_000.0)),
        "g" => Some((UnitFamily::Weight, 1_000_000.0)),
        "kg" => Some((UnitFamily::Weight, 1_000_000_000.0)),

        "mm" => Some((UnitFamily::Length, 1.0)),
        "cm" => Some((UnitFamily::Length, 10.0)),
        "dm" => Some((UnitFamily::Length, 100.0)),
        "m" => Some((UnitFamily::Length, 1_000.0)),

        "s" => Some((UnitFamily::Time, 1.0)),
        "min" => Some((UnitFamily::Time, 60.0)),
        "h" => Some((UnitFamily::Time, 3_600.0)),
        "d" => Some((UnitFamily::Time, 86_400.0)),
        "w" | "week" => Some((UnitFamily::Time, 604_800.0)),
        "month" => Some((UnitFamily::Time, 2_592_000.0)),
        "year" => Some((UnitFamily::Time, 31_536_000.0)),

        "ng/ml" | "ug/l" => Some((UnitFamily::Concentration, 1.0)),
        "ug/ml" | "mg/l" => Some((UnitFamily::Concentration, 1_000.0)),
        "g/l" => Some((UnitFamily::Concentration, 1_000_000.0)),

        "ng*h/ml" | "ug*h/l" => Some((UnitFamily::ConcentrationTime, 1.0)),
        "ug*h/ml" | "mg*h/l" => Some((UnitFamily::ConcentrationTime, 1_000.0)),

        "umol/l" | "nmol/ml" => Some((UnitFamily::MoleConcentration, 1.0)),
        "mmol/l" | "umol/ml" => Some((UnitFamily::MoleConcentration, 1_000.0)),
        "mol/l" => Some((UnitFamily::MoleConcentration, 1_000_000.0)),

        "g/mol" => Some((UnitFamily::MolarMass, 1.0)),
        "kg/mol" => Some((UnitFamily::MolarMass, 1_000.0)),

        "ml/min" => Some((UnitFamily::FlowRate, 1.0)),
        "l/h" => Some((UnitFamily::FlowRate, 1000.0 / 60.0)),
        "l/min" => Some((UnitFamily::FlowRate, 1_000.0)),

        "celsius" => Some((UnitFamily::Temperature, 1.0)),

        _ => None,
    }
}

/// Returns whether `unit` is one the table recognizes.
pub fn is_known(unit: &str) -> bool {
    family_and_multiplier(unit).is_some()
}

/// Returns whether two units belong to the same convertible family.
pub fn is_compatible(a: &str, b: &str) -> bool {
    match (family_and_multiplier(a), family_and_multiplier(b)) {
        (Some((fa, _)), Some((fb, _))) => fa == fb,
        _ => false,
    }
}

/// Converts `value` from `from_unit` to `to_unit`. Returns `None` when either
/// unit is unknown or the two are not in the same family.
pub fn convert_to_unit(value: f64, from_unit: &str, to_unit: &str) -> Option<f64> {
    let (fa, fmul) = family_and_multiplier(from_unit)?;
    let (fb, tmul) = family_and_multiplier(to_unit)?;
    if fa != fb {
        return None;
    }
    Some(value * fmul / tmul)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trip_preserves_value() {
        let pairs = [
            ("mg", "ug"),
            ("g/l", "ng/ml"),
            ("l/h", "ml/min"),
            ("umol/l", "mmol/l"),
            ("h", "s"),
        ];
        for (a, b) in pairs {
            let v = 3.14159;
            let to_b = convert_to_unit(v, a, b).unwrap();
            let back = convert_to_unit(to_b, b, a).unwrap();
            assert_relative_eq!(back, v, max_relative = 1e-9);
        }
    }

    #[test]
    fn incompatible_units_reject() {
        assert!(!is_compatible("km/l", "ug/l"));
        assert!(convert_to_unit(1.0, "km/l", "ug/l").is_none());
    }

    #[test]
    fn empty_unit_is_known() {
        assert!(is_known("-"));
        assert!(is_known(""));
    }
}
