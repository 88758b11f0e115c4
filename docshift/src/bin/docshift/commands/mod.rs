pub mod counter;
pub mod resolve;
pub mod status;
