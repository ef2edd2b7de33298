mod handler;
mod model;

pub use handler::{consume_quota, peek_quota};
pub use model::{QuotaRequest, QuotaResponse};
