//! Resource identifiers for elastic job agents and their credentials.
//!
//! Both identifiers are slash-delimited Azure Resource Manager paths:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Sql/servers/{server}/jobAgents/{agent}
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Sql/servers/{server}/jobAgents/{agent}/credentials/{name}
//! ```
//!
//! The credential path is the durable handle stored in state and the key used for
//! `import`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input was empty.
    #[error("parsing resource ID: the ID was empty")]
    Empty,

    /// A fixed segment did not match.
    #[error("parsing {input:?}: expected the segment {expected:?} but got {found:?}")]
    UnexpectedSegment {
        /// The full input.
        input: String,
        /// The fixed segment that was expected.
        expected: &'static str,
        /// What was found instead.
        found: String,
    },

    /// The input ended before all segments were read.
    #[error("parsing {input:?}: the segment {expected:?} was missing")]
    MissingSegment {
        /// The full input.
        input: String,
        /// The first segment that was not present.
        expected: &'static str,
    },

    /// A user-specified segment had no value.
    #[error("parsing {input:?}: the value for {segment:?} was empty")]
    EmptyValue {
        /// The full input.
        input: String,
        /// The name of the empty segment.
        segment: &'static str,
    },

    /// The input did not start with `/`.
    #[error("parsing {input:?}: resource IDs must start with '/'")]
    MissingLeadingSlash {
        /// The full input.
        input: String,
    },

    /// The input ended with `/`.
    #[error("parsing {input:?}: resource IDs must not end with '/'")]
    TrailingSlash {
        /// The full input.
        input: String,
    },

    /// Extra segments followed a complete identifier.
    #[error("parsing {input:?}: unexpected trailing segments")]
    TrailingSegments {
        /// The full input.
        input: String,
    },
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Static(&'static str),
    Value(&'static str),
}

const JOB_AGENT_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscriptionId"),
    Segment::Static("resourceGroups"),
    Segment::Value("resourceGroupName"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Sql"),
    Segment::Static("servers"),
    Segment::Value("serverName"),
    Segment::Static("jobAgents"),
    Segment::Value("jobAgentName"),
];

const CREDENTIAL_SEGMENTS: &[Segment] = &[
    Segment::Static("subscriptions"),
    Segment::Value("subscriptionId"),
    Segment::Static("resourceGroups"),
    Segment::Value("resourceGroupName"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.Sql"),
    Segment::Static("servers"),
    Segment::Value("serverName"),
    Segment::Static("jobAgents"),
    Segment::Value("jobAgentName"),
    Segment::Static("credentials"),
    Segment::Value("credentialName"),
];

/// Split `input` along `layout`, returning the user-specified values in order.
fn parse_segments(
    input: &str,
    layout: &[Segment],
    case_insensitive: bool,
) -> Result<Vec<String>, IdError> {
    if input.is_empty() || input == "/" {
        return Err(IdError::Empty);
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Err(IdError::MissingLeadingSlash {
            input: input.to_string(),
        });
    };
    if rest.ends_with('/') {
        return Err(IdError::TrailingSlash {
            input: input.to_string(),
        });
    }

    let mut parts = rest.split('/');
    let mut values = Vec::new();

    for segment in layout {
        let part = parts.next();
        match (segment, part) {
            (Segment::Static(expected), Some(found)) => {
                let matches = if case_insensitive {
                    found.eq_ignore_ascii_case(expected)
                } else {
                    found == *expected
                };
                if !matches {
                    return Err(IdError::UnexpectedSegment {
                        input: input.to_string(),
                        expected,
                        found: found.to_string(),
                    });
                }
            },
            (Segment::Value(name), Some(found)) => {
                if found.is_empty() {
                    return Err(IdError::EmptyValue {
                        input: input.to_string(),
                        segment: name,
                    });
                }
                values.push(found.to_string());
            },
            (Segment::Static(expected), None) | (Segment::Value(expected), None) => {
                return Err(IdError::MissingSegment {
                    input: input.to_string(),
                    expected,
                });
            },
        }
    }

    if parts.next().is_some() {
        return Err(IdError::TrailingSegments {
            input: input.to_string(),
        });
    }

    Ok(values)
}

/// Identifies an elastic job agent on a SQL server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobAgentId {
    /// The subscription the server lives in.
    pub subscription_id: String,
    /// The resource group the server lives in.
    pub resource_group_name: String,
    /// The SQL server name.
    pub server_name: String,
    /// The job agent name.
    pub job_agent_name: String,
}

impl JobAgentId {
    /// Create a new job agent identifier.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        server_name: impl Into<String>,
        job_agent_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            server_name: server_name.into(),
            job_agent_name: job_agent_name.into(),
        }
    }

    /// Parse a job agent identifier, matching fixed segments exactly.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        Self::parse_with(input, false)
    }

    /// Parse a job agent identifier, ignoring the case of fixed segments.
    pub fn parse_insensitively(input: &str) -> Result<Self, IdError> {
        Self::parse_with(input, true)
    }

    fn parse_with(input: &str, case_insensitive: bool) -> Result<Self, IdError> {
        let mut values = parse_segments(input, JOB_AGENT_SEGMENTS, case_insensitive)?.into_iter();
        // The layout guarantees exactly four values.
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            subscription_id: next(),
            resource_group_name: next(),
            server_name: next(),
            job_agent_name: next(),
        })
    }

    /// Derive the identifier of a credential that lives under this job agent.
    pub fn credential(&self, credential_name: impl Into<String>) -> CredentialId {
        CredentialId {
            subscription_id: self.subscription_id.clone(),
            resource_group_name: self.resource_group_name.clone(),
            server_name: self.server_name.clone(),
            job_agent_name: self.job_agent_name.clone(),
            credential_name: credential_name.into(),
        }
    }

    /// The formatted resource path.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JobAgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Sql/servers/{}/jobAgents/{}",
            self.subscription_id, self.resource_group_name, self.server_name, self.job_agent_name
        )
    }
}

impl FromStr for JobAgentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifies a credential belonging to an elastic job agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialId {
    /// The subscription the server lives in.
    pub subscription_id: String,
    /// The resource group the server lives in.
    pub resource_group_name: String,
    /// The SQL server name.
    pub server_name: String,
    /// The job agent name.
    pub job_agent_name: String,
    /// The credential name.
    pub credential_name: String,
}

impl CredentialId {
    /// Create a new credential identifier.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        server_name: impl Into<String>,
        job_agent_name: impl Into<String>,
        credential_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            server_name: server_name.into(),
            job_agent_name: job_agent_name.into(),
            credential_name: credential_name.into(),
        }
    }

    /// Parse a credential identifier, matching fixed segments exactly.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        Self::parse_with(input, false)
    }

    /// Parse a credential identifier, ignoring the case of fixed segments.
    pub fn parse_insensitively(input: &str) -> Result<Self, IdError> {
        Self::parse_with(input, true)
    }

    fn parse_with(input: &str, case_insensitive: bool) -> Result<Self, IdError> {
        let mut values =
            parse_segments(input, CREDENTIAL_SEGMENTS, case_insensitive)?.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            subscription_id: next(),
            resource_group_name: next(),
            server_name: next(),
            job_agent_name: next(),
            credential_name: next(),
        })
    }

    /// The parent job agent.
    pub fn job_agent_id(&self) -> JobAgentId {
        JobAgentId::new(
            self.subscription_id.clone(),
            self.resource_group_name.clone(),
            self.server_name.clone(),
            self.job_agent_name.clone(),
        )
    }

    /// The formatted resource path.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/credentials/{}", self.job_agent_id(), self.credential_name)
    }
}

impl FromStr for CredentialId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
