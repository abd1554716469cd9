mod client;
mod queries;
mod response;

pub use client::{TokenGrant, UpstreamClient};
pub use response::{extract_members, extract_projects};
