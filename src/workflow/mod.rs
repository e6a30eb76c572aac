pub mod evaluation_flow;
pub mod extraction_flow;
