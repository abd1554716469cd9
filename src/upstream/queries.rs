pub(crate) const PROJECTS_INCLUDING_COMPANY: &str = r#"
query {
  user {
    projects(first: 100) {
      edges { node { pk name } }
    }
    company {
      projects(first: 100) {
        edges { node { pk name } }
      }
    }
  }
}
"#;

pub(crate) const COMPANY_MEMBERS: &str = r#"
query {
  user {
    company {
      members(first: 100) {
        edges { node { username email } }
      }
    }
  }
}
"#;
