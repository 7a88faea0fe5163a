//! Coach engine: HTTP clients for the execution and content services, and
//! the background runtime that carries out core effects.
mod content;
mod engine;
mod execute;
mod http;
mod types;

pub use content::{ContentSource, ReqwestContentSource};
pub use engine::EngineHandle;
pub use execute::{CodeExecutor, ReqwestExecutor};
pub use http::{EndpointError, ServiceSettings, DEFAULT_SERVICE_URL};
pub use types::{EngineEvent, EngineStopped};
