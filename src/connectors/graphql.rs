//! Wire types for the ProjectV2 GraphQL API.
//!
//! Field values are unions upstream; each one is modelled as an enum tagged by
//! `__typename`, with an `Unknown` catch-all so new upstream shapes decode
//! instead of failing the whole page.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One document with both operations; the request picks one by `operationName`.
pub const PROJECT_QUERY: &str = r#"
fragment ProjectPage on ProjectV2 {
  id
  title
  status: field(name: $statusField) {
    __typename
    ... on ProjectV2SingleSelectField { options { id name } }
  }
  iteration: field(name: $iterationField) {
    __typename
    ... on ProjectV2IterationField {
      configuration {
        iterations { id title startDate duration }
        completedIterations { id title startDate duration }
      }
    }
  }
  items(first: $pageSize, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      status: fieldValueByName(name: $statusField) {
        __typename
        ... on ProjectV2ItemFieldSingleSelectValue { name }
      }
      iteration: fieldValueByName(name: $iterationField) {
        __typename
        ... on ProjectV2ItemFieldIterationValue { iterationId }
      }
      effort: fieldValueByName(name: $effortField) {
        __typename
        ... on ProjectV2ItemFieldNumberValue { number }
      }
      remaining: fieldValueByName(name: $remainingField) {
        __typename
        ... on ProjectV2ItemFieldNumberValue { number }
      }
      content {
        __typename
        ... on Issue {
          title
          createdAt
          closedAt
          labels(first: 50) { nodes { name } }
        }
      }
    }
  }
}

query OrganizationProject($login: String!, $number: Int!, $pageSize: Int!, $cursor: String,
    $statusField: String!, $iterationField: String!, $effortField: String!, $remainingField: String!) {
  organization(login: $login) { projectV2(number: $number) { ...ProjectPage } }
}

query RepositoryProject($owner: String!, $name: String!, $number: Int!, $pageSize: Int!, $cursor: String,
    $statusField: String!, $iterationField: String!, $effortField: String!, $remainingField: String!) {
  repository(owner: $owner, name: $name) { projectV2(number: $number) { ...ProjectPage } }
}
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerData {
    pub organization: Option<OwnerNode>,
    pub repository: Option<OwnerNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerNode {
    #[serde(rename = "projectV2")]
    pub project: Option<ProjectPage>,
}

/// A single page of a project as returned by one request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPage {
    pub id: String,
    pub title: String,
    pub status: Option<ProjectField>,
    pub iteration: Option<ProjectField>,
    pub items: ItemConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemConnection {
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<RawItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Every page of a project merged into one response.
#[derive(Debug, Clone)]
pub struct RawProject {
    pub id: String,
    pub title: String,
    pub status: Option<ProjectField>,
    pub iteration: Option<ProjectField>,
    pub items: Vec<RawItem>,
}

impl From<ProjectPage> for RawProject {
    fn from(page: ProjectPage) -> Self {
        Self {
            id: page.id,
            title: page.title,
            status: page.status,
            iteration: page.iteration,
            items: page.items.nodes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum ProjectField {
    #[serde(rename = "ProjectV2SingleSelectField")]
    SingleSelect { options: Vec<SelectOption> },
    #[serde(rename = "ProjectV2IterationField")]
    Iteration { configuration: IterationConfiguration },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationConfiguration {
    #[serde(default)]
    pub iterations: Vec<RawIteration>,
    #[serde(default)]
    pub completed_iterations: Vec<RawIteration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIteration {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
    /// Length in days
    pub duration: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub id: String,
    pub status: Option<ItemFieldValue>,
    pub iteration: Option<ItemFieldValue>,
    pub effort: Option<ItemFieldValue>,
    pub remaining: Option<ItemFieldValue>,
    pub content: Option<ItemContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum ItemFieldValue {
    #[serde(rename = "ProjectV2ItemFieldSingleSelectValue")]
    SingleSelect { name: Option<String> },
    #[serde(rename = "ProjectV2ItemFieldIterationValue")]
    Iteration {
        #[serde(rename = "iterationId")]
        iteration_id: String,
    },
    #[serde(rename = "ProjectV2ItemFieldNumberValue")]
    Number { number: Option<f64> },
    #[serde(other)]
    Unknown,
}

impl ItemFieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemFieldValue::SingleSelect { .. } => "single_select",
            ItemFieldValue::Iteration { .. } => "iteration",
            ItemFieldValue::Number { .. } => "number",
            ItemFieldValue::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum ItemContent {
    Issue(RawIssue),
    DraftIssue,
    PullRequest,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub labels: Option<LabelConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelConnection {
    #[serde(default)]
    pub nodes: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Variables shared by both project operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVariables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub number: u32,
    pub page_size: u32,
    pub cursor: Option<&'a str>,
    pub status_field: &'a str,
    pub iteration_field: &'a str,
    pub effort_field: &'a str,
    pub remaining_field: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub operation_name: &'a str,
    pub variables: ProjectVariables<'a>,
}
