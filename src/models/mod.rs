pub mod evaluation;
pub mod extraction;
pub mod role;
pub mod upload;

pub use evaluation::{AnswerSet, EvaluationRequest, EvaluationResult, EvaluationView};
pub use extraction::ExtractionResult;
pub use role::Role;
pub use upload::UploadFile;
