use pep440_rs::VersionSpecifier;
use std::fmt;
use std::str::FromStr;

/// Version comparison operators, PEP 440 plus arbitrary equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    ArbitraryEqual,
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

impl Operator {
    /// All operators ordered longest token first, so that `===` is tried
    /// before `==` and `<=` before `<`.
    pub const BY_LENGTH: [Self; 8] = [
        Self::ArbitraryEqual,
        Self::Compatible,
        Self::Equal,
        Self::NotEqual,
        Self::LessEqual,
        Self::GreaterEqual,
        Self::Less,
        Self::Greater,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArbitraryEqual => "===",
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }

    /// Matches the longest operator at the start of `text`.
    pub fn match_prefix(text: &str) -> Option<(Self, &str)> {
        Self::BY_LENGTH
            .into_iter()
            .find_map(|op| text.strip_prefix(op.as_str()).map(|rest| (op, rest)))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `<operator><version>` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    pub operator: Operator,
    pub version: String,
}

impl Specifier {
    /// True when the clause is valid PEP 440 (legacy versions are still accepted).
    pub fn is_pep440(&self) -> bool {
        VersionSpecifier::from_str(&self.to_string()).is_ok()
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// Error for clauses that have no operator or no version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid specifier clause '{0}'")]
pub struct InvalidSpecifier(pub String);

/// Comma-separated list of specifier clauses, kept in input order.
///
/// # Examples
///
/// ```
/// use pipreq::specifier::{Operator, SpecifierSet};
///
/// let specs: SpecifierSet = "===1.0".parse().unwrap();
/// assert_eq!(specs.clauses()[0].operator, Operator::ArbitraryEqual);
///
/// let specs: SpecifierSet = ">= 2.0, <3".parse().unwrap();
/// assert_eq!(specs.to_string(), ">=2.0,<3");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpecifierSet(Vec<Specifier>);

impl SpecifierSet {
    pub fn clauses(&self) -> &[Specifier] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(operator, version)` pairs in input order.
    pub fn as_pairs(&self) -> Vec<(&'static str, &str)> {
        self.0
            .iter()
            .map(|spec| (spec.operator.as_str(), spec.version.as_str()))
            .collect()
    }

    /// The version of a single exact pin (`==` or `===`), if that is all the set holds.
    pub fn pinned_version(&self) -> Option<&str> {
        match self.0.as_slice() {
            [spec] if matches!(spec.operator, Operator::Equal | Operator::ArbitraryEqual) => {
                Some(spec.version.as_str())
            }
            _ => None,
        }
    }

    pub fn pinned(version: &str) -> Self {
        Self(vec![Specifier {
            operator: Operator::Equal,
            version: version.trim().to_string(),
        }])
    }
}

impl FromStr for SpecifierSet {
    type Err = InvalidSpecifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let text = text
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(text);

        let mut clauses = Vec::new();
        for clause in text.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let (operator, version) =
                Operator::match_prefix(clause).ok_or_else(|| InvalidSpecifier(clause.into()))?;
            let version: String = version.split_whitespace().collect();
            if version.is_empty() {
                return Err(InvalidSpecifier(clause.into()));
            }

            let spec = Specifier { operator, version };
            if !spec.is_pep440() {
                tracing::debug!("keeping non-PEP 440 specifier '{}'", spec);
            }
            clauses.push(spec);
        }
        Ok(Self(clauses))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(","))
    }
}
