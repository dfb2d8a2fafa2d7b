use regex::Regex;

/// Placeholder written for every pull-request column of a commit that
/// references no pull request.
pub const NOT_APPLICABLE: &str = "n/a";

/// One output column and the compiled pattern that fills it.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Regex,
}

/// Ordered column-name → pattern mapping. Order decides CSV column order.
#[derive(Debug, Clone, Default)]
pub struct FieldExtractionSpec {
    pub(super) fields: Vec<FieldPattern>,
}

impl FieldExtractionSpec {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPattern> {
        self.fields.iter()
    }
}

/// Pull-request columns resolved for one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFields {
    /// PR number found in the commit message, if any
    pub number: Option<u64>,
    /// Web URL of the pull request, or `n/a`
    pub url: String,
    /// One value per field, in mapping order
    pub values: Vec<String>,
}

impl PullRequestFields {
    /// Sentinel values for a commit with no pull request reference.
    pub fn not_applicable(field_count: usize) -> Self {
        Self {
            number: None,
            url: NOT_APPLICABLE.to_string(),
            values: vec![NOT_APPLICABLE.to_string(); field_count],
        }
    }
}
