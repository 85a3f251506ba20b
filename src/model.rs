pub mod attachment;
pub mod error;
pub mod object;
