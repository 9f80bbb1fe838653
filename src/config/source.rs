//! Project sources polled by the data pull job.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who owns an upstream project board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectOwner {
    Organization { login: String },
    Repository { owner: String, name: String },
}

/// One external project to poll, with the bearer token scoped to it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSource {
    pub owner: ProjectOwner,
    pub project_number: u32,
    pub token: String,
}

impl fmt::Debug for ProjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectSource")
            .field("owner", &self.owner)
            .field("project_number", &self.project_number)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ProjectSource {
    /// Identity key, `org/project` or `owner/repo/project`.
    pub fn key(&self) -> String {
        match &self.owner {
            ProjectOwner::Organization { login } => format!("{}/{}", login, self.project_number),
            ProjectOwner::Repository { owner, name } => {
                format!("{}/{}/{}", owner, name, self.project_number)
            }
        }
    }
}

impl fmt::Display for ProjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Reasons a configured source entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("org or repo information is required")]
    MissingOwner,
    #[error("project is required")]
    MissingProject,
    #[error("token is required")]
    MissingToken,
}

/// Raw, unvalidated source settings as read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSettings {
    pub org: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub project: Option<String>,
    pub token: Option<String>,
}

impl SourceSettings {
    /// Validate the entry, falling back to `default_token` when it has none.
    pub fn into_source(self, default_token: Option<&str>) -> Result<ProjectSource, SourceError> {
        let org = non_empty(self.org);
        let repo_owner = non_empty(self.repo_owner);
        let repo_name = non_empty(self.repo_name);

        let owner = match (org, repo_owner, repo_name) {
            (Some(login), _, _) => ProjectOwner::Organization { login },
            (None, Some(owner), Some(name)) => ProjectOwner::Repository { owner, name },
            _ => return Err(SourceError::MissingOwner),
        };

        let project_number = non_empty(self.project)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|number| *number > 0)
            .ok_or(SourceError::MissingProject)?;

        let token = non_empty(self.token)
            .or_else(|| default_token.map(str::to_string).and_then(|t| non_empty(Some(t))))
            .ok_or(SourceError::MissingToken)?;

        Ok(ProjectSource {
            owner,
            project_number,
            token,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org_settings() -> SourceSettings {
        SourceSettings {
            org: Some("acme".to_string()),
            project: Some("7".to_string()),
            token: Some("ghp_test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn organization_source_key() {
        let source = org_settings().into_source(None).unwrap();
        assert_eq!(source.key(), "acme/7");
        assert_eq!(
            source.owner,
            ProjectOwner::Organization {
                login: "acme".to_string()
            }
        );
    }

    #[test]
    fn repository_source_key() {
        let settings = SourceSettings {
            repo_owner: Some("octo".to_string()),
            repo_name: Some("widgets".to_string()),
            project: Some("3".to_string()),
            token: Some("ghp_test".to_string()),
            ..Default::default()
        };
        let source = settings.into_source(None).unwrap();
        assert_eq!(source.key(), "octo/widgets/3");
    }

    #[test]
    fn missing_owner_is_rejected() {
        let settings = SourceSettings {
            repo_owner: Some("octo".to_string()),
            project: Some("3".to_string()),
            token: Some("t".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.into_source(None), Err(SourceError::MissingOwner));
    }

    #[test]
    fn missing_or_zero_project_is_rejected() {
        let mut settings = org_settings();
        settings.project = None;
        assert_eq!(
            settings.clone().into_source(None),
            Err(SourceError::MissingProject)
        );
        settings.project = Some("0".to_string());
        assert_eq!(settings.into_source(None), Err(SourceError::MissingProject));
    }

    #[test]
    fn token_falls_back_to_default() {
        let mut settings = org_settings();
        settings.token = None;
        assert_eq!(
            settings.clone().into_source(None),
            Err(SourceError::MissingToken)
        );
        let source = settings.into_source(Some("fallback")).unwrap();
        assert_eq!(source.token, "fallback");
    }

    #[test]
    fn debug_output_hides_token() {
        let source = org_settings().into_source(None).unwrap();
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("ghp_test"));
    }
}
