pub mod definition;
pub mod set;
pub mod value;

pub use definition::{ParameterDefinition, ParameterId, Variability, VariabilityKind};
pub use set::{ParameterSetEvent, ParameterSetSeries};
pub use value::Parameter;

pub type Deviation = f64;
pub type Deviations = Vec<Deviation>;
/// One eta realization per variability "slot" consumed across the whole
/// parameter set (a multi-eta variability consumes several consecutive
/// entries, see `ParameterSetEvent::apply_etas`).
pub type Etas = Vec<Deviation>;
