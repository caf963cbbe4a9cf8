//! Qualified names, scalars and data paths

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};

/// Qualified node name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub module: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(module: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            local: local.into(),
        }
    }

    /// Name without a module qualifier
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            module: None,
            local: local.into(),
        }
    }
}

/// `"module:local"` or plain `"local"`
impl From<&str> for QName {
    fn from(value: &str) -> Self {
        match value.split_once(':') {
            Some((module, local)) => QName::new(module, local),
            None => QName::local(value),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "{}:{}", module, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Leaf value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
    /// Decimal kept in its textual form
    Decimal(String),
    Empty,
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Uint(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Uint(v) => write!(f, "{}", v),
            Scalar::String(v) | Scalar::Decimal(v) => write!(f, "{}", v),
            Scalar::Empty => Ok(()),
        }
    }
}

/// Key predicates of a list entry, ordered by key name
pub type KeyPredicates = BTreeMap<QName, Scalar>;

/// One segment of a data path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathArg {
    /// Container, list, leaf-list, leaf or choice
    Node(QName),
    /// Keyed list entry
    Entry { name: QName, keys: KeyPredicates },
    /// Leaf-list entry
    Value { name: QName, value: Scalar },
}

impl PathArg {
    pub fn node(name: impl Into<QName>) -> Self {
        PathArg::Node(name.into())
    }

    pub fn entry<K, V>(name: impl Into<QName>, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Scalar>,
    {
        PathArg::Entry {
            name: name.into(),
            keys: keys
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn value(name: impl Into<QName>, value: impl Into<Scalar>) -> Self {
        PathArg::Value {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &QName {
        match self {
            PathArg::Node(name) => name,
            PathArg::Entry { name, .. } | PathArg::Value { name, .. } => name,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, PathArg::Node(_))
    }
}

impl fmt::Display for PathArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathArg::Node(name) => write!(f, "{}", name),
            PathArg::Entry { name, keys } => {
                write!(f, "{}[", name)?;
                for (idx, (key, value)) in keys.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, "]")
            }
            PathArg::Value { name, value } => write!(f, "{}[.={}]", name, value),
        }
    }
}

/// Absolute path from the datastore root
///
/// A list entry is addressed below its list: `/top/item/item[name=a]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DataPath(Vec<PathArg>);

impl DataPath {
    /// The datastore root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_args(args: impl IntoIterator<Item = PathArg>) -> Self {
        Self(args.into_iter().collect())
    }

    /// Parse the compact form `/top/item/item[name=a]/leaves[.=x]`
    ///
    /// Key and leaf-list values are parsed as strings. Values must not
    /// contain `/`, `,` or `]`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix('/').ok_or_else(|| {
            TxError::invalid_input(format!("path '{}' must start with '/'", text))
        })?;
        if body.is_empty() {
            return Ok(Self::root());
        }
        body.split('/').map(parse_arg).collect::<Result<Vec<_>>>().map(Self)
    }

    pub fn args(&self) -> &[PathArg] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&PathArg> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&PathArg> {
        self.0.last()
    }

    /// Child path
    pub fn node(&self, arg: PathArg) -> Self {
        let mut args = self.0.clone();
        args.push(arg);
        Self(args)
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    /// Path made of the first segment only
    pub fn head(&self) -> Option<Self> {
        self.0.first().map(|arg| Self(vec![arg.clone()]))
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for arg in &self.0 {
            write!(f, "/{}", arg)?;
        }
        Ok(())
    }
}

fn parse_arg(segment: &str) -> Result<PathArg> {
    let Some((name, rest)) = segment.split_once('[') else {
        if segment.is_empty() {
            return Err(TxError::invalid_input("empty path segment"));
        }
        return Ok(PathArg::node(segment));
    };
    let predicates = rest.strip_suffix(']').ok_or_else(|| {
        TxError::invalid_input(format!("unterminated predicate in '{}'", segment))
    })?;
    if let Some(value) = predicates.strip_prefix(".=") {
        return Ok(PathArg::value(name, value));
    }
    let mut keys = KeyPredicates::new();
    for predicate in predicates.split(',') {
        let (key, value) = predicate.split_once('=').ok_or_else(|| {
            TxError::invalid_input(format!("malformed key predicate '{}'", predicate))
        })?;
        keys.insert(QName::from(key), Scalar::from(value));
    }
    Ok(PathArg::Entry {
        name: QName::from(name),
        keys,
    })
}
