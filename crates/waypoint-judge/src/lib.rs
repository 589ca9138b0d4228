pub mod filter;
pub mod judge;
pub mod rubric;

pub use filter::RejectReason;
pub use judge::{
    Judge, RATIONALE_NO_CANDIDATES, RATIONALE_NONE_ELIGIBLE, RATIONALE_ONLY_ELIGIBLE,
};
pub use rubric::{DefaultScorer, Scorer};
