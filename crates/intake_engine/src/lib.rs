//! Intake engine: service client, response decoding and effect execution.
mod decode;
mod engine;
mod service;
mod types;

pub use decode::{
    decode_interface_data, decode_parameters, decode_project, decode_status, decode_stylesheet,
    decode_upload_xml, decode_uploader_envelope, DecodeError,
};
pub use engine::EngineHandle;
pub use service::{ProjectService, ReqwestService, ServiceSettings};
pub use types::{EngineEvent, EngineStopped, FailureKind, ServiceError};
