/*!
 * Admin Payload Types
 * Tables, column families, garbage collection rules and modifications
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Garbage collection rule for a column family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcRule {
    /// Keep at most this many versions of each cell
    MaxNumVersions(u32),
    /// Drop cells older than this age
    MaxAge(Duration),
    /// Drop cells matching every nested rule
    Intersection(Vec<GcRule>),
    /// Drop cells matching any nested rule
    Union(Vec<GcRule>),
}

impl GcRule {
    pub fn max_num_versions(versions: u32) -> Self {
        GcRule::MaxNumVersions(versions)
    }

    pub fn max_age(age: Duration) -> Self {
        GcRule::MaxAge(age)
    }

    pub fn intersection(rules: impl IntoIterator<Item = GcRule>) -> Self {
        GcRule::Intersection(rules.into_iter().collect())
    }

    pub fn union(rules: impl IntoIterator<Item = GcRule>) -> Self {
        GcRule::Union(rules.into_iter().collect())
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self, GcRule::Intersection(_))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, GcRule::Union(_))
    }

    /// Number of directly nested rules (0 for leaf rules)
    pub fn nested_len(&self) -> usize {
        match self {
            GcRule::Intersection(rules) | GcRule::Union(rules) => rules.len(),
            _ => 0,
        }
    }
}

/// Column family settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamily {
    /// `None` keeps every version forever
    pub gc_rule: Option<GcRule>,
}

impl ColumnFamily {
    pub fn with_rule(rule: GcRule) -> Self {
        Self {
            gc_rule: Some(rule),
        }
    }
}

/// Table as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Fully qualified name: `projects/{p}/instances/{i}/tables/{t}`
    pub name: String,
    /// Column families keyed by id; empty in the name-only view
    pub column_families: BTreeMap<String, ColumnFamily>,
}

impl Table {
    /// Trailing table id of the qualified name
    pub fn table_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or("")
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.column_families.contains_key(family)
    }

    /// Copy restricted to what `view` exposes
    pub fn project(&self, view: TableView) -> Table {
        match view {
            TableView::Full => self.clone(),
            TableView::NameOnly => Table {
                name: self.name.clone(),
                column_families: BTreeMap::new(),
            },
        }
    }
}

/// Level of detail requested for a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableView {
    NameOnly,
    #[default]
    Full,
}

/// Column families and initial split keys for a new table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub column_families: BTreeMap<String, GcRule>,
    pub initial_splits: Vec<String>,
}

impl TableConfig {
    pub fn new<F, K, S, V>(families: F, splits: S) -> Self
    where
        F: IntoIterator<Item = (K, GcRule)>,
        K: Into<String>,
        S: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            column_families: families
                .into_iter()
                .map(|(id, rule)| (id.into(), rule))
                .collect(),
            initial_splits: splits.into_iter().map(Into::into).collect(),
        }
    }
}

/// One change applied by a modify-column-families call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFamilyModification {
    Create { id: String, rule: GcRule },
    Update { id: String, rule: GcRule },
    Drop { id: String },
}

impl ColumnFamilyModification {
    pub fn create(id: impl Into<String>, rule: GcRule) -> Self {
        Self::Create {
            id: id.into(),
            rule,
        }
    }

    pub fn update(id: impl Into<String>, rule: GcRule) -> Self {
        Self::Update {
            id: id.into(),
            rule,
        }
    }

    pub fn drop(id: impl Into<String>) -> Self {
        Self::Drop { id: id.into() }
    }

    /// Column family this modification targets
    pub fn family_id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Drop { id } => id,
        }
    }

    pub fn rule(&self) -> Option<&GcRule> {
        match self {
            Self::Create { rule, .. } | Self::Update { rule, .. } => Some(rule),
            Self::Drop { .. } => None,
        }
    }
}
