use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StructureTypeError;

/// A required structure type and the versions that satisfy it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dependency {
    pub name: String,
    pub min_version: u32,
    pub max_version: u32,
}

impl Dependency {
    pub fn new(name: impl Into<String>, min_version: u32, max_version: u32) -> Self {
        Self {
            name: name.into(),
            min_version,
            max_version,
        }
    }

    #[inline]
    pub fn accepts(&self, version: u32) -> bool {
        (self.min_version..=self.max_version).contains(&version)
    }

    /// Parse whitespace-separated `name(min;max)` tokens.
    pub fn parse_list(s: &str) -> Result<Vec<Dependency>, StructureTypeError> {
        s.split_whitespace().map(str::parse).collect()
    }
}

impl FromStr for Dependency {
    type Err = StructureTypeError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| StructureTypeError::InvalidDependency {
            token: token.to_string(),
            reason: reason.to_string(),
        };
        let (name, rest) = token
            .split_once('(')
            .ok_or_else(|| invalid("expected `name(min;max)`"))?;
        let range = rest
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing parenthesis"))?;
        let (min, max) = range
            .split_once(';')
            .ok_or_else(|| invalid("expected `min;max`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        let min: u32 = min.trim().parse().map_err(|_| invalid("bad minimum version"))?;
        let max: u32 = max.trim().parse().map_err(|_| invalid("bad maximum version"))?;
        if min > max {
            return Err(invalid("minimum version exceeds maximum"));
        }
        Ok(Self::new(name, min, max))
    }
}

impl TryFrom<String> for Dependency {
    type Error = StructureTypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Dependency> for String {
    fn from(d: Dependency) -> String {
        d.to_string()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({};{})", self.name, self.min_version, self.max_version)
    }
}

/// Declaration of one structure-type extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTypeInfo {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl StructureTypeInfo {
    pub fn new(name: impl Into<String>, version: u32, dependencies: Vec<Dependency>) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies,
        }
    }

    /// Parse a JSON array of declarations.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, StructureTypeError> {
        serde_json::from_str(json).map_err(|e| StructureTypeError::InvalidDeclaration {
            reason: e.to_string(),
        })
    }
}
