//! The work behind the `molpic` subcommands. Argument parsing and printing
//! stay in the binary; every way a command can fail is a [CommandError] with
//! its own exit code.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::batch::{run_batch, BatchOptions, BatchReport};
use crate::error::Error;
use crate::render::{render_grid, render_molecule, GridOptions, RenderOptions};
use crate::resolve::Lookup;
use crate::{to_smiles, write_caption, InputKind, OrderBy, Structure};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Could not resolve: {0}")]
    Unresolved(String),
    #[error("Failed: {0}")]
    Render(String),
    #[error("No valid molecules to render.")]
    NothingToRender,
    #[error("Failed to write caption {}: {source}", path.display())]
    Caption {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Batch(#[from] Error),
}

impl CommandError {
    /// 2 when there was nothing usable to work on, 1 for everything else
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::NothingToRender
            | CommandError::Batch(Error::MissingColumns { .. }) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug)]
pub struct Generated {
    pub structure: Structure,
    pub legend: String,
    pub kept_hydrogens: bool,
}

/// resolve `query` and draw it to `out`. an empty `options.legend` is
/// replaced by the query
pub async fn generate(
    lookup: &impl Lookup,
    query: &str,
    kind: InputKind,
    out: &Path,
    mut options: RenderOptions,
) -> Result<Generated, CommandError> {
    let query = query.trim();
    let structure = to_smiles(lookup, query, kind)
        .await
        .map_err(CommandError::Unresolved)?;

    let legend = match options.legend.trim() {
        "" => query.to_owned(),
        name => name.to_owned(),
    };
    options.legend = legend.clone();
    let res = render_molecule(&structure.smiles, out, &options);
    if !res.ok {
        return Err(CommandError::Render(res.message));
    }
    Ok(Generated {
        structure,
        legend,
        kept_hydrogens: res.kept_hydrogens,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelItem {
    pub legend: String,
    pub smiles: String,
}

/// a query left out of a panel, with the reason
#[derive(Clone, Debug, PartialEq)]
pub struct Skipped {
    pub query: String,
    pub message: String,
}

/// resolve every query, dropping the ones that fail. `names[i]` labels
/// `queries[i]` when present and non-blank
pub async fn collect_panel_items(
    lookup: &impl Lookup,
    queries: &[String],
    names: &[String],
    kind: InputKind,
) -> (Vec<PanelItem>, Vec<Skipped>) {
    let mut items = Vec::new();
    let mut skipped = Vec::new();
    for (i, query) in queries.iter().enumerate() {
        let query = query.trim();
        let structure = match to_smiles(lookup, query, kind).await {
            Ok(s) => s,
            Err(message) => {
                warn!("skipping {query:?}: {message}");
                skipped.push(Skipped {
                    query: query.to_owned(),
                    message,
                });
                continue;
            }
        };
        let legend = match names.get(i).map(|n| n.trim()) {
            Some(name) if !name.is_empty() => name,
            _ => query,
        };
        items.push(PanelItem {
            legend: legend.to_owned(),
            smiles: structure.smiles,
        });
    }
    (items, skipped)
}

/// draw `items` as one panel, plus a caption when `caption_file` is set.
/// returns how many structures went in
pub fn draw_panel(
    mut items: Vec<PanelItem>,
    order_by: OrderBy,
    out: &Path,
    mut options: GridOptions,
    caption_file: Option<&Path>,
) -> Result<usize, CommandError> {
    if items.is_empty() {
        return Err(CommandError::NothingToRender);
    }
    order_by.apply(&mut items, |item| item.legend.as_str());
    let (legends, smiles): (Vec<String>, Vec<String>) = items
        .into_iter()
        .map(|item| (item.legend, item.smiles))
        .unzip();

    options.legends = legends.clone();
    let res = render_grid(&smiles, out, &options);
    if !res.ok {
        return Err(CommandError::Render(res.message));
    }
    if let Some(path) = caption_file {
        write_caption(path, &options.title, &legends).map_err(|source| {
            CommandError::Caption {
                path: path.to_owned(),
                source,
            }
        })?;
    }
    Ok(smiles.len())
}

pub async fn batch(
    lookup: &impl Lookup,
    options: &BatchOptions,
) -> Result<BatchReport, CommandError> {
    let report = run_batch(options, lookup).await?;
    info!("{} of {} rows rendered", report.ok_count(), report.rows.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::resolve::tests::FakeLookup;
    use crate::resolve::Namespace;
    use crate::Source;

    use super::*;

    fn queries(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn generate_resolves_then_draws() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mol.svg");
        let lookup = FakeLookup::default().with("ethanol", Namespace::Name, 702, "CCO");
        let got = generate(&lookup, " ethanol ", InputKind::Auto, &out, Default::default())
            .await
            .unwrap();
        assert_eq!(got.legend, "ethanol");
        assert_eq!(got.structure.source, Source::PubChem);
        assert_eq!(got.structure.cid, Some(702));
        assert!(fs::read_to_string(&out).unwrap().contains(">ethanol</text>"));
    }

    #[tokio::test]
    async fn generate_failures_exit_1() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mol.svg");

        let err = generate(
            &FakeLookup::default(),
            "unobtainium",
            InputKind::Auto,
            &out,
            Default::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Could not resolve: No PubChem match found");
        assert_eq!(err.exit_code(), 1);

        let lookup = FakeLookup {
            fail: true,
            ..Default::default()
        };
        let err = generate(&lookup, "ethanol", InputKind::Name, &out, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Unresolved(_)));
        assert_eq!(err.exit_code(), 1);

        let err = generate(
            &FakeLookup::default(),
            "C1CC",
            InputKind::Auto,
            &out,
            Default::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed: could not parse the structure.");
        assert_eq!(err.exit_code(), 1);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn input_kind_decides_the_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mol.svg");
        let lookup =
            FakeLookup::default().with("2-propanol", Namespace::Name, 3776, "CC(C)O");

        // the locant looks like SMILES to the heuristic
        let err = generate(&lookup, "2-propanol", InputKind::Auto, &out, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Render(_)), "{err}");
        assert!(lookup.calls.lock().unwrap().is_empty());

        let got = generate(&lookup, "2-propanol", InputKind::Name, &out, Default::default())
            .await
            .unwrap();
        assert_eq!(got.structure.smiles, "CC(C)O");
        assert_eq!(lookup.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unresolved_queries_are_skipped() {
        let lookup = FakeLookup::default().with("water", Namespace::Name, 962, "O");
        let (items, skipped) = collect_panel_items(
            &lookup,
            &queries(&["C(C)O", "unobtainium", "water", "C(=O)O"]),
            &queries(&["ethanol", "ignored", " ", "formic acid"]),
            InputKind::Auto,
        )
        .await;
        assert_eq!(
            items,
            [
                PanelItem {
                    legend: "ethanol".to_owned(),
                    smiles: "C(C)O".to_owned(),
                },
                PanelItem {
                    legend: "water".to_owned(),
                    smiles: "O".to_owned(),
                },
                PanelItem {
                    legend: "formic acid".to_owned(),
                    smiles: "C(=O)O".to_owned(),
                },
            ]
        );
        assert_eq!(
            skipped,
            [Skipped {
                query: "unobtainium".to_owned(),
                message: "No PubChem match found".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_panel_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.svg");
        let (items, skipped) = collect_panel_items(
            &FakeLookup::default(),
            &queries(&["unobtainium", "nothingium"]),
            &[],
            InputKind::Name,
        )
        .await;
        assert!(items.is_empty());
        assert_eq!(skipped.len(), 2);

        let err = draw_panel(items, OrderBy::Input, &out, Default::default(), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "No valid molecules to render.");
        assert_eq!(err.exit_code(), 2);
        assert!(!out.exists());
    }

    #[test]
    fn panel_with_caption() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.svg");
        let caption = dir.path().join("caption.txt");
        let items = vec![
            PanelItem {
                legend: "water".to_owned(),
                smiles: "O".to_owned(),
            },
            PanelItem {
                legend: "Ethanol".to_owned(),
                smiles: "CCO".to_owned(),
            },
        ];
        let options = GridOptions {
            title: "Figure 1".to_owned(),
            ..Default::default()
        };
        let count =
            draw_panel(items, OrderBy::Name, &out, options, Some(&caption)).unwrap();
        assert_eq!(count, 2);
        assert!(out.exists());
        assert_eq!(
            fs::read_to_string(&caption).unwrap(),
            "Figure 1\nCompounds: 1) Ethanol; 2) water\n"
        );
    }

    #[test]
    fn missing_columns_exit_2() {
        let err = CommandError::from(Error::MissingColumns {
            smiles_col: "smiles".to_owned(),
            name_col: "name".to_owned(),
            available: vec!["id".to_owned()],
        });
        assert_eq!(err.exit_code(), 2);
        let err = CommandError::from(Error::Io(std::io::Error::other("disk full")));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "disk full");
    }
}
