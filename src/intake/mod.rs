pub mod event;
pub mod pertinent_times;

pub use event::{AbsorptionRoute, IntakeEvent, IntakeSeries};
pub use pertinent_times::PertinentTimesCalculator;
