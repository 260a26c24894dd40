mod api;
mod middleware;

pub use api::{ApiState, RouterState, build_router};
pub use middleware::{Principal, RequestContext, attach_principal, log_responses, set_request_context};
