//! Key levels and multi-level indices used to address sweep results.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single level of a multi-level index, e.g., a time window, a unit name or an intensity.
///
/// Real values are compared and hashed through their total order, so that they can be used as keys
/// of ordered or hashed collections. Both zeros are treated as the same level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Real(f64),
    Label(String),
}

impl Level {
    fn normalized(value: f64) -> f64 {
        if value == 0.0 {
            0.0
        } else {
            value
        }
    }

    /// Returns the real value of the level, if any.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Level::Real(value) => Some(*value),
            Level::Label(_) => None,
        }
    }

    /// Returns the label of the level, if any.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Level::Real(_) => None,
            Level::Label(label) => Some(label),
        }
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Level::Real(value)
    }
}

impl From<&str> for Level {
    fn from(label: &str) -> Self {
        Level::Label(label.to_string())
    }
}

impl From<String> for Level {
    fn from(label: String) -> Self {
        Level::Label(label)
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reals sort before labels.
impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Level::Real(a), Level::Real(b)) => {
                Level::normalized(*a).total_cmp(&Level::normalized(*b))
            }
            (Level::Real(_), Level::Label(_)) => Ordering::Less,
            (Level::Label(_), Level::Real(_)) => Ordering::Greater,
            (Level::Label(a), Level::Label(b)) => a.cmp(b),
        }
    }
}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Level::Real(value) => {
                0u8.hash(state);
                Level::normalized(*value).to_bits().hash(state);
            }
            Level::Label(label) => {
                1u8.hash(state);
                label.hash(state);
            }
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Real(value) => write!(f, "{}", value),
            Level::Label(label) => write!(f, "{}", label),
        }
    }
}

/// An immutable tuple of levels of arbitrary arity.
///
/// Grid points, inner indices and flattened table keys are all indices; a flattened key is the
/// concatenation of a grid point and an inner index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index(Vec<Level>);

impl Index {
    pub fn new(levels: Vec<Level>) -> Self {
        Index(levels)
    }

    /// The number of levels of the index.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn levels(&self) -> &[Level] {
        &self.0[..]
    }

    /// Returns a new index made of the levels of `self` followed by the levels of `other`.
    pub fn concat(&self, other: &Index) -> Index {
        Index(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// Write the raw bytes of the index, used to derive seeds and file names.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for level in self.0.iter() {
            match level {
                Level::Real(value) => {
                    bytes.push(0);
                    bytes.extend(Level::normalized(*value).to_bits().to_le_bytes());
                }
                Level::Label(label) => {
                    bytes.push(1);
                    bytes.extend((label.len() as u64).to_le_bytes());
                    bytes.extend(label.as_bytes());
                }
            }
        }
        bytes
    }
}

impl From<Vec<Level>> for Index {
    fn from(levels: Vec<Level>) -> Self {
        Index(levels)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, level) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", level)?;
        }
        write!(f, ")")
    }
}

/// Build an [`Index`] from a list of values convertible into levels.
///
/// ```rust
/// use rusty_noise_scan::index;
///
/// let key = index![1000.0, "RS", 0.2];
/// assert_eq!(key.arity(), 3);
/// ```
#[macro_export]
macro_rules! index {
    ($($level:expr),* $(,)?) => {
        $crate::core::key::Index::new(vec![$($crate::core::key::Level::from($level)),*])
    };
}
