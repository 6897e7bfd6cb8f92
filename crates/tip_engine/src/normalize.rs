use std::fmt;
use std::str::FromStr;

/// How participant names and region labels are folded before comparison.
///
/// Fixed per deployment. `StripWhitespace` raises recall ("RealMadrid" matches
/// "Real Madrid") but lets unrelated multi-word names collide more easily;
/// `TrimOnly` keeps word boundaries intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePolicy {
    /// lower-case, trim
    TrimOnly,
    /// lower-case, drop every whitespace character
    StripWhitespace,
}

pub const DEFAULT_NAME_POLICY: NamePolicy = NamePolicy::StripWhitespace;

impl FromStr for NamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trim" | "trim_only" => Ok(NamePolicy::TrimOnly),
            "strip" | "strip_whitespace" => Ok(NamePolicy::StripWhitespace),
            other => Err(format!("unknown name policy `{other}` (expected trim or strip)")),
        }
    }
}

impl fmt::Display for NamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePolicy::TrimOnly => write!(f, "trim"),
            NamePolicy::StripWhitespace => write!(f, "strip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameNormalizer {
    policy: NamePolicy,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_POLICY)
    }
}

impl NameNormalizer {
    pub fn new(policy: NamePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NamePolicy {
        self.policy
    }

    pub fn normalize(&self, raw: &str) -> String {
        let lower = raw.to_lowercase();
        match self.policy {
            NamePolicy::TrimOnly => lower.trim().to_string(),
            NamePolicy::StripWhitespace => lower.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }
}
