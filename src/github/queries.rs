//! GraphQL documents and response schemas.
//!
//! Every payload is decoded here into `crate::types::Issue`. All fields are
//! optional on the wire: a node missing its number is dropped, a node with an
//! unparsable timestamp keeps `None` for that timestamp, and nothing here
//! panics on a surprising shape.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{Actor, ActorKind, Comment, Issue, IssueNumber, IssueState, parse_timestamp};

/// Fields fetched for every issue the classifier may look at.
const ISSUE_FIELDS_FRAGMENT: &str = r#"
fragment IssueFields on Issue {
    number
    title
    state
    updatedAt
    comments(last: 1) {
        nodes {
            createdAt
            author {
                __typename
                login
            }
        }
    }
}
"#;

/// Single-issue lookup for the freshness pre-check.
pub const ISSUE_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
    repository(owner: $owner, name: $name) {
        issue(number: $number) {
            ...IssueFields
        }
    }
}
"#;

/// Open issues, least recently updated first.
pub const STALE_PAGE_QUERY: &str = r#"
query($owner: String!, $name: String!, $first: Int!, $after: String) {
    repository(owner: $owner, name: $name) {
        issues(
            first: $first,
            after: $after,
            states: OPEN,
            orderBy: { field: UPDATED_AT, direction: ASC }
        ) {
            pageInfo {
                hasNextPage
                endCursor
            }
            nodes {
                ...IssueFields
            }
        }
    }
}
"#;

/// Issue search for label/type seeded candidates.
pub const SEARCH_QUERY: &str = r#"
query($query: String!, $first: Int!) {
    search(query: $query, type: ISSUE_ADVANCED, first: $first) {
        nodes {
            ... on Issue {
                ...IssueFields
            }
        }
    }
}
"#;

/// Appends the shared fragment to a query document.
pub fn with_issue_fields(query: &str) -> String {
    format!("{query}{ISSUE_FIELDS_FRAGMENT}")
}

/// Alias used for the `index`th parent in a batched sub-issue query.
pub fn parent_alias(index: usize) -> String {
    format!("p{index}")
}

/// Builds one query fetching the sub-issues of every parent via aliases.
///
/// Issue numbers are integers, so inlining them is safe; everything else is
/// passed as variables.
pub fn sub_issues_query(parents: &[IssueNumber]) -> String {
    let mut selections = String::new();
    for (index, parent) in parents.iter().enumerate() {
        selections.push_str(&format!(
            "        {}: issue(number: {}) {{ ...SubIssueFields }}\n",
            parent_alias(index),
            parent.0
        ));
    }

    let document = format!(
        r#"
query($owner: String!, $name: String!, $first: Int!) {{
    repository(owner: $owner, name: $name) {{
{selections}    }}
}}

fragment SubIssueFields on Issue {{
    number
    subIssues(first: $first) {{
        pageInfo {{
            hasNextPage
        }}
        nodes {{
            ...IssueFields
        }}
    }}
}}
"#
    );
    with_issue_fields(&document)
}

/// Builds the search string for open issues of one repository that carry any
/// of `labels` and any of `issue_types`.
pub fn search_string(owner: &str, name: &str, labels: &[String], issue_types: &[String]) -> String {
    let mut parts = vec![
        format!("repo:{owner}/{name}"),
        "is:issue".to_string(),
        "state:open".to_string(),
    ];
    if let Some(group) = or_group("label", labels) {
        parts.push(group);
    }
    if let Some(group) = or_group("type", issue_types) {
        parts.push(group);
    }
    parts.join(" ")
}

fn or_group(qualifier: &str, values: &[String]) -> Option<String> {
    let terms: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| format!("{qualifier}:\"{}\"", v.replace('"', "\\\"")))
        .collect();
    match terms.len() {
        0 => None,
        1 => terms.into_iter().next(),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}

// ─── Response Schemas ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuthorNode {
    #[serde(rename = "__typename")]
    pub typename: Option<String>,
    pub login: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub created_at: Option<String>,
    pub author: Option<AuthorNode>,
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> Connection<T> {
    /// Non-null nodes, in order.
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.nodes.unwrap_or_default().into_iter().flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub state: Option<String>,
    pub updated_at: Option<String>,
    pub comments: Option<Connection<CommentNode>>,
}

impl IssueNode {
    /// Decodes into the domain type. Returns `None` if the node has no number.
    pub fn into_issue(self) -> Option<Issue> {
        let number = IssueNumber(self.number?);

        let updated_at = self.updated_at.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(issue = %number, raw, "Unparsable updatedAt");
            }
            parsed
        });

        let last_comment = self
            .comments
            .and_then(|c| c.into_nodes().last())
            .map(|node| Comment {
                author: node.author.and_then(|a| {
                    a.login.map(|login| {
                        let kind = a
                            .typename
                            .as_deref()
                            .map(ActorKind::from_typename)
                            .unwrap_or(ActorKind::Other);
                        Actor::new(login, kind)
                    })
                }),
                created_at: node.created_at.as_deref().and_then(parse_timestamp),
            });

        Some(Issue {
            number,
            title: self.title.unwrap_or_default(),
            updated_at,
            state: self
                .state
                .as_deref()
                .map(IssueState::from_graphql)
                .unwrap_or(IssueState::Open),
            last_comment,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIssueConnection {
    #[serde(default)]
    pub page_info: PageInfo,
    pub nodes: Option<Vec<Option<IssueNode>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIssueParentNode {
    pub number: Option<u64>,
    pub sub_issues: Option<SubIssueConnection>,
}

/// `data` of [`ISSUE_QUERY`].
#[derive(Debug, Deserialize)]
pub struct IssueQueryData {
    pub repository: Option<IssueQueryRepository>,
}

#[derive(Debug, Deserialize)]
pub struct IssueQueryRepository {
    pub issue: Option<IssueNode>,
}

/// `data` of a [`sub_issues_query`] document; aliases map to parents.
#[derive(Debug, Deserialize)]
pub struct SubIssuesData {
    pub repository: Option<HashMap<String, Option<SubIssueParentNode>>>,
}

/// `data` of [`STALE_PAGE_QUERY`].
#[derive(Debug, Deserialize)]
pub struct StalePageData {
    pub repository: Option<StalePageRepository>,
}

#[derive(Debug, Deserialize)]
pub struct StalePageRepository {
    pub issues: Option<StalePageIssues>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StalePageIssues {
    #[serde(default)]
    pub page_info: PageInfo,
    pub nodes: Option<Vec<Option<IssueNode>>>,
}

/// `data` of [`SEARCH_QUERY`].
#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: Option<Connection<IssueNode>>,
}

/// Decodes a list of nullable issue nodes, dropping any without a number.
pub fn decode_issue_nodes(nodes: Option<Vec<Option<IssueNode>>>) -> Vec<Issue> {
    nodes
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(IssueNode::into_issue)
        .collect()
}
