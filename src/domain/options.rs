//! Conversion of upstream candidates into Slack option lists.

use std::{collections::HashSet, hash::Hash};

use super::models::{Member, Project, SlackOption};

/// Keeps the first item for every distinct key, preserving input order.
pub fn dedupe_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(key(&item)) {
            kept.push(item);
        }
    }
    kept
}

/// Own projects come before company projects, so the personal copy of a
/// jointly owned project is the one retained.
#[must_use]
pub fn dedupe_projects(projects: Vec<Project>) -> Vec<Project> {
    dedupe_by_key(projects, |project| project.pk.clone())
}

impl From<Project> for SlackOption {
    fn from(project: Project) -> Self {
        Self {
            text: project.name,
            value: project.pk,
        }
    }
}

impl From<Member> for SlackOption {
    fn from(member: Member) -> Self {
        Self {
            text: member.username,
            value: member.email,
        }
    }
}

/// Case-insensitive substring match on the option text. An empty search
/// keeps every option.
#[must_use]
pub fn filter_options(options: Vec<SlackOption>, search: &str) -> Vec<SlackOption> {
    if search.is_empty() {
        return options;
    }

    let needle = search.to_lowercase();
    options
        .into_iter()
        .filter(|option| option.text.to_lowercase().contains(&needle))
        .collect()
}

pub fn project_options(projects: Vec<Project>, search: &str) -> Vec<SlackOption> {
    let options = dedupe_projects(projects)
        .into_iter()
        .map(SlackOption::from)
        .collect();
    filter_options(options, search)
}

pub fn member_options(members: Vec<Member>, search: &str) -> Vec<SlackOption> {
    let options = members.into_iter().map(SlackOption::from).collect();
    filter_options(options, search)
}
