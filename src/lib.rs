//! Power-saving advisor service: buffers activity samples reported by client
//! agents, classifies the user as idle or active with a sequence model and
//! serves power-saving recommendations over HTTP.

pub mod activity_prediction;
pub mod advisor_session;
pub mod api;
pub mod errors;
pub mod server;
pub mod system_monitoring;
pub mod utils;
