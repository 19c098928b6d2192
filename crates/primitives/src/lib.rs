pub mod id;
pub mod investor;
pub mod validation;
