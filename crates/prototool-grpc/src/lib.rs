pub mod codec;
pub mod error;
pub mod invoke;

pub use error::GrpcError;
pub use invoke::{invoke, CallConfig, CallInput};
