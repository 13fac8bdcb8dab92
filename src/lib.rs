use std::{fmt::Display, path::Path, str::FromStr};

use log::debug;
use serde::{Deserialize, Serialize};

use resolve::{resolve_name_to_smiles, Lookup};

/// the drawing toolkit
pub mod depict;

pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod resolve;

/// characters that only show up in structure strings, or in names with
/// locants like `2-propanol`
pub const SMILES_CHARS: &str = "#=()[]@+\\/-0123456789";

/// guess whether `text` is a SMILES string rather than a compound name
pub fn is_probably_smiles(text: &str) -> bool {
    text.trim().chars().any(|c| SMILES_CHARS.contains(c))
}

/// how a query should be read
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// decide with [is_probably_smiles]
    #[default]
    Auto,
    Smiles,
    Name,
}

impl InputKind {
    pub fn is_smiles(self, query: &str) -> bool {
        match self {
            InputKind::Auto => is_probably_smiles(query),
            InputKind::Smiles => true,
            InputKind::Name => false,
        }
    }
}

impl Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputKind::Auto => "auto",
            InputKind::Smiles => "smiles",
            InputKind::Name => "name",
        };
        write!(f, "{s}")
    }
}

/// where a structure string came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Source {
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "input_smiles")]
    InputSmiles,
    #[serde(rename = "pubchem")]
    PubChem,
    #[serde(rename = "none")]
    None,
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Input => "input",
            Source::InputSmiles => "input_smiles",
            Source::PubChem => "pubchem",
            Source::None => "none",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Structure {
    pub smiles: String,
    pub source: Source,
    pub cid: Option<u64>,
}

/// turn a user query into a SMILES string, looking names up with `lookup`.
/// the error is the resolver's message
pub async fn to_smiles(
    lookup: &impl Lookup,
    query: &str,
    kind: InputKind,
) -> Result<Structure, String> {
    let query = query.trim();
    if kind.is_smiles(query) {
        debug!("treating {query:?} as SMILES");
        return Ok(Structure {
            smiles: query.to_owned(),
            source: Source::Input,
            cid: None,
        });
    }
    let res = resolve_name_to_smiles(lookup, query).await;
    match res.smiles {
        Some(smiles) => Ok(Structure {
            smiles,
            source: res.source,
            cid: res.cid,
        }),
        None => Err(res.message),
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridSpecError {
    #[error("Grid must be like 2x3")]
    Format,
    #[error("Grid rows/cols must be positive.")]
    NotPositive,
}

/// rows and columns of a panel, written `2x3`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { rows: 2, cols: 3 }
    }
}

impl FromStr for GridSpec {
    type Err = GridSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let (rows, cols) = s.split_once('x').ok_or(GridSpecError::Format)?;
        let parse = |t: &str| t.parse::<i64>().map_err(|_| GridSpecError::Format);
        let (rows, cols) = (parse(rows)?, parse(cols)?);
        if rows <= 0 || cols <= 0 {
            return Err(GridSpecError::NotPositive);
        }
        let dim = |n: i64| usize::try_from(n).map_err(|_| GridSpecError::Format);
        Ok(Self {
            rows: dim(rows)?,
            cols: dim(cols)?,
        })
    }
}

impl Display for GridSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// panel ordering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OrderBy {
    #[default]
    Input,
    /// case-insensitive legend order
    Name,
}

impl OrderBy {
    /// sort `items` in place by the legend `key` returns. ties keep their
    /// input order
    pub fn apply<T>(self, items: &mut [T], key: impl Fn(&T) -> &str) {
        if self == OrderBy::Name {
            items.sort_by_cached_key(|item| key(item).to_lowercase());
        }
    }
}

/// write a figure caption listing `legends` to `path`
pub fn write_caption(
    path: impl AsRef<Path>,
    title: &str,
    legends: &[String],
) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let items = legends
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}) {name}", i + 1))
        .collect::<Vec<_>>()
        .join("; ");
    let title = title.trim();
    let caption = if title.is_empty() {
        format!("Compounds: {items}\n")
    } else {
        format!("{title}\nCompounds: {items}\n")
    };
    std::fs::write(path, caption)
}
