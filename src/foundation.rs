pub mod error;
pub mod timing;
