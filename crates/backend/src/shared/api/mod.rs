//! JSON envelope shared by every endpoint, plus extractors that report
//! their rejections through the same envelope.

pub mod envelope;
pub mod extract;

pub use envelope::{error_response, transport_error, RequestContext, RequestId};
pub use extract::{ApiJson, ApiPath, ApiQuery};
