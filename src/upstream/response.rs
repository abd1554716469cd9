use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    error::DomainError,
    models::{Member, Project},
};

const USER_PROJECTS: &[&str] = &["data", "user", "projects", "edges"];
const COMPANY_PROJECTS: &[&str] = &["data", "user", "company", "projects", "edges"];
const COMPANY_MEMBERS: &[&str] = &["data", "user", "company", "members", "edges"];

/// Own projects followed by company projects, in response order. The company
/// list is optional; the user's own list is not.
pub fn extract_projects(payload: &Value) -> Result<Vec<Project>, DomainError> {
    let Some(own) = edges_at(payload, USER_PROJECTS) else {
        return Err(missing_shape(USER_PROJECTS));
    };

    let company = edges_at(payload, COMPANY_PROJECTS).map_or(&[][..], Vec::as_slice);
    own.iter().chain(company).map(node_of::<Project>).collect()
}

pub fn extract_members(payload: &Value) -> Result<Vec<Member>, DomainError> {
    let Some(edges) = edges_at(payload, COMPANY_MEMBERS) else {
        return Err(missing_shape(COMPANY_MEMBERS));
    };

    edges.iter().map(node_of::<Member>).collect()
}

fn edges_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    let mut current = root;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_array()
}

fn node_of<T: DeserializeOwned>(edge: &Value) -> Result<T, DomainError> {
    let Some(node) = edge.get("node") else {
        return Err(DomainError::Upstream("edge is missing node".to_owned()));
    };
    T::deserialize(node)
        .map_err(|error| DomainError::Upstream(format!("unexpected node shape: {error}")))
}

fn missing_shape(path: &[&str]) -> DomainError {
    DomainError::Upstream(format!("response is missing {}", path.join(".")))
}
