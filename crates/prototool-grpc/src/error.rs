use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrpcError {
    #[error("invalid method {0:?}: expected package.Service/Method")]
    InvalidMethod(String),
    #[error("method {0:?} not found in the compiled schema")]
    MethodNotFound(String),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid header {0:?}: expected key:value")]
    InvalidHeader(String),
    #[error("invalid request JSON: {0}")]
    Json(String),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("rpc failed: {code:?}: {message}")]
    Rpc { code: tonic::Code, message: String },
    #[error("descriptor error: {0}")]
    Descriptor(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tonic::Status> for GrpcError {
    fn from(status: tonic::Status) -> Self {
        GrpcError::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
