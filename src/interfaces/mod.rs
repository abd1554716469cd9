pub mod http;
mod responses;
pub mod slack_options;
