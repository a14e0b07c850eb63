pub mod admission;
pub mod epoch;
pub mod push;
pub mod state;

pub use admission::{Admission, AiThrottler};
pub use push::{PushDecision, PushLimiter};
pub use state::{EntityId, EntityState, StateTable};
