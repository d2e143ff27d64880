use std::fmt;

/// The fixed enumerated set of parameter identifiers a PK model may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    Ke,
    V,
    V1,
    V2,
    V3,
    CL,
    Q,
    Q1,
    Q2,
    Q3,
    K12,
    K21,
    K13,
    K31,
    Ka,
    F,
    Tlag,
    Km,
    Vmax,
    RQCL,
    RV2V1,
    Kenz,
    Emax,
    ECmid,
    EDmid,
    DoseMid,
    Fmax,
    NN,
    MTT,
    AllmCL,
}

impl ParameterId {
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::Ke => "Ke",
            ParameterId::V => "V",
            ParameterId::V1 => "V1",
            ParameterId::V2 => "V2",
            ParameterId::V3 => "V3",
            ParameterId::CL => "CL",
            ParameterId::Q => "Q",
            ParameterId::Q1 => "Q1",
            ParameterId::Q2 => "Q2",
            ParameterId::Q3 => "Q3",
            ParameterId::K12 => "K12",
            ParameterId::K21 => "K21",
            ParameterId::K13 => "K13",
            ParameterId::K31 => "K31",
            ParameterId::Ka => "Ka",
            ParameterId::F => "F",
            ParameterId::Tlag => "Tlag",
            ParameterId::Km => "Km",
            ParameterId::Vmax => "Vmax",
            ParameterId::RQCL => "RQCL",
            ParameterId::RV2V1 => "RV2V1",
            ParameterId::Kenz => "Kenz",
            ParameterId::Emax => "Emax",
            ParameterId::ECmid => "ECmid",
            ParameterId::EDmid => "EDmid",
            ParameterId::DoseMid => "DoseMid",
            ParameterId::Fmax => "Fmax",
            ParameterId::NN => "NN",
            ParameterId::MTT => "MTT",
            ParameterId::AllmCL => "AllmCL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use ParameterId::*;
        Some(match name {
            "Ke" => Ke,
            "V" => V,
            "V1" => V1,
            "V2" => V2,
            "V3" => V3,
            "CL" => CL,
            "Q" => Q,
            "Q1" => Q1,
            "Q2" => Q2,
            "Q3" => Q3,
            "K12" => K12,
            "K21" => K21,
            "K13" => K13,
            "K31" => K31,
            "Ka" => Ka,
            "F" => F,
            "Tlag" => Tlag,
            "Km" => Km,
            "Vmax" => Vmax,
            "RQCL" => RQCL,
            "RV2V1" => RV2V1,
            "Kenz" => Kenz,
            "Emax" => Emax,
            "ECmid" => ECmid,
            "EDmid" => EDmid,
            "DoseMid" => DoseMid,
            "Fmax" => Fmax,
            "NN" => NN,
            "MTT" => MTT,
            "AllmCL" => AllmCL,
            _ => return None,
        })
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// Ordering used for the "alphabetical within group" rule in
// `ParameterSetEvent::add_parameter_event` — compare by display name, not by
// enum discriminant.
impl PartialOrd for ParameterId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParameterId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name().cmp(other.name())
    }
}

/// The law used to turn a population (typical) value plus an eta into an
/// individual value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariabilityKind {
    /// No inter-individual variability; the parameter is fixed.
    None,
    /// v <- v + eta. Covers both "Additive" and "Normal" naming in NONMEM-speak.
    Additive,
    /// v <- v * exp(eta). Covers both "Exponential" and "LogNormal".
    Exponential,
    /// v <- v * (1 + eta).
    Proportional,
    /// logit(v) <- logit(v) + eta.
    Logit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variability {
    pub kind: VariabilityKind,
    /// Standard deviations, one per eta this variability consumes. A
    /// variability with more than one entry sums that many consecutive etas
    /// before applying them (see `ParameterSetEvent::apply_etas`).
    pub standard_deviations: Vec<f64>,
}

impl Variability {
    pub fn none() -> Self {
        Self {
            kind: VariabilityKind::None,
            standard_deviations: Vec::new(),
        }
    }

    pub fn new(kind: VariabilityKind, standard_deviations: Vec<f64>) -> Self {
        Self {
            kind,
            standard_deviations,
        }
    }

    pub fn nb_etas(&self) -> usize {
        self.standard_deviations.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub id: ParameterId,
    pub variability: Variability,
    pub default_value: f64,
}

impl ParameterDefinition {
    pub fn fixed(id: ParameterId, default_value: f64) -> Self {
        Self {
            id,
            variability: Variability::none(),
            default_value,
        }
    }

    pub fn variable(id: ParameterId, default_value: f64, variability: Variability) -> Self {
        Self {
            id,
            variability,
            default_value,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.variability.kind != VariabilityKind::None
    }
}
