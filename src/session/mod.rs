pub mod state;
pub mod view;

pub use state::{
    Applied, EvaluationTicket, ExtractionTicket, Generation, RolePhase, RoleState, SessionPhase,
    SessionState, Slot, Transition,
};
pub use view::{RoleView, SessionSnapshot, NO_ANSWERS_FIELD, NO_EXTRACTION_YET};
