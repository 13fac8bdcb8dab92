//! Rendering every row of a CSV file, with a report and optional panels.

use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::render::{
    render_grid, render_molecule, GridOptions, OutputFormat, RenderOptions,
};
use crate::resolve::{resolve_name_to_smiles, Lookup};
use crate::{write_caption, GridSpec, OrderBy, Source};

pub const REPORT_FILE: &str = "molpic_report.csv";

const REPORT_COLUMNS: [&str; 8] =
    ["row", "query", "legend", "ok", "out", "source", "cid", "message"];

/// longest legend fragment used in a file name
const MAX_LABEL_CHARS: usize = 80;

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub smiles_col: String,
    pub name_col: String,
    pub out_dir: PathBuf,
    pub fmt: OutputFormat,
    pub remove_hs: bool,
    pub make_panels: bool,
    pub panel_grid: GridSpec,
    pub panel_title_prefix: String,
    pub panel_size: (u32, u32),
    pub captions: bool,
    pub order_by: OrderBy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            smiles_col: "smiles".to_owned(),
            name_col: "name".to_owned(),
            out_dir: PathBuf::from("molpic_out"),
            fmt: OutputFormat::Svg,
            remove_hs: false,
            make_panels: false,
            panel_grid: GridSpec::default(),
            panel_title_prefix: "Panel".to_owned(),
            panel_size: (550, 450),
            captions: false,
            order_by: OrderBy::Input,
        }
    }
}

/// one line of the report. `row` is the 0-based data row of the input
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportRow {
    pub row: usize,
    pub query: String,
    pub legend: String,
    pub ok: bool,
    pub out: Option<String>,
    pub source: Option<Source>,
    pub cid: Option<u64>,
    pub message: String,
}

impl ReportRow {
    fn failed(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub rows: Vec<ReportRow>,
    pub report_path: PathBuf,
    /// panels that were written successfully
    pub panels: Vec<PathBuf>,
}

impl BatchReport {
    pub fn ok_count(&self) -> usize {
        self.rows.iter().filter(|r| r.ok).count()
    }
}

struct Rendered {
    legend: String,
    smiles: String,
}

/// `legend` made safe for a file name
pub fn safe_label(legend: &str) -> String {
    legend
        .chars()
        .map(|c| if c == ' ' || c == '/' { '_' } else { c })
        .take(MAX_LABEL_CHARS)
        .collect()
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// render every row of `options.input` into `options.out_dir`. only a
/// missing structure column or an unreadable input or report is fatal
pub async fn run_batch(
    options: &BatchOptions,
    lookup: &impl Lookup,
) -> Result<BatchReport> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&options.input)?;
    create_dir_all(&options.out_dir)?;

    let headers = reader.headers()?.clone();
    let smiles_idx = column(&headers, &options.smiles_col);
    let name_idx = column(&headers, &options.name_col);
    if smiles_idx.is_none() && name_idx.is_none() {
        return Err(Error::MissingColumns {
            smiles_col: options.smiles_col.clone(),
            name_col: options.name_col.clone(),
            available: headers.iter().map(str::to_owned).collect(),
        });
    }

    let mut rows = Vec::new();
    let mut rendered = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping unreadable row {i}: {e}");
                rows.push(ReportRow::failed(i, e.to_string()));
                continue;
            }
        };
        let cell = |idx: Option<usize>| {
            idx.and_then(|j| record.get(j)).map_or("", str::trim)
        };
        let raw_smiles = cell(smiles_idx);
        let raw_name = cell(name_idx);

        let query = if raw_smiles.is_empty() { raw_name } else { raw_smiles };
        if query.is_empty() {
            warn!("row {i} is empty");
            rows.push(ReportRow::failed(i, "empty"));
            continue;
        }

        let (smiles, source, cid) = if !raw_smiles.is_empty() {
            (raw_smiles.to_owned(), Source::InputSmiles, None)
        } else {
            let res = resolve_name_to_smiles(lookup, raw_name).await;
            match res.smiles {
                Some(s) => (s, res.source, res.cid),
                None => {
                    warn!("row {i}: {query}: {}", res.message);
                    rows.push(ReportRow {
                        query: query.to_owned(),
                        source: Some(res.source),
                        cid: res.cid,
                        ..ReportRow::failed(i, res.message)
                    });
                    continue;
                }
            }
        };

        let legend = if raw_name.is_empty() { query } else { raw_name };
        let out_file = options.out_dir.join(format!(
            "{i:04}_{}.{}",
            safe_label(legend),
            options.fmt
        ));
        let render_options = RenderOptions {
            legend: legend.to_owned(),
            remove_hs: options.remove_hs,
            ..Default::default()
        };
        let res = render_molecule(&smiles, &out_file, &render_options);
        if res.ok {
            debug!("row {i}: wrote {}", out_file.display());
            rendered.push(Rendered {
                legend: legend.to_owned(),
                smiles,
            });
        } else {
            warn!("row {i}: {query}: {}", res.message);
        }
        rows.push(ReportRow {
            row: i,
            query: query.to_owned(),
            legend: legend.to_owned(),
            ok: res.ok,
            out: res.out_path.map(|p| p.display().to_string()),
            source: Some(source),
            cid,
            message: res.message,
        });
    }

    let report_path = options.out_dir.join(REPORT_FILE);
    write_report(&report_path, &rows)?;
    info!(
        "rendered {} of {} rows, report in {}",
        rendered.len(),
        rows.len(),
        report_path.display()
    );

    let panels = if options.make_panels && !rendered.is_empty() {
        make_panels(options, rendered)
    } else {
        Vec::new()
    };

    Ok(BatchReport {
        rows,
        report_path,
        panels,
    })
}

fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    wtr.write_record(REPORT_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// chunk `items` into grids named `panel_001`, `panel_002`, ... and return
/// the ones that were written. failures are logged and skipped
fn make_panels(options: &BatchOptions, mut items: Vec<Rendered>) -> Vec<PathBuf> {
    options.order_by.apply(&mut items, |r| r.legend.as_str());
    let mut panels = Vec::new();
    for (n, chunk) in items.chunks(options.panel_grid.capacity()).enumerate() {
        let n = n + 1;
        let title = format!("{} {n:03}", options.panel_title_prefix);
        let legends: Vec<String> =
            chunk.iter().map(|r| r.legend.clone()).collect();
        let smiles: Vec<String> =
            chunk.iter().map(|r| r.smiles.clone()).collect();
        let out = options
            .out_dir
            .join(format!("panel_{n:03}.{}", options.fmt));
        let grid_options = GridOptions {
            grid: options.panel_grid,
            sub_size: options.panel_size,
            legends: legends.clone(),
            remove_hs: options.remove_hs,
            title: title.clone(),
            ..Default::default()
        };
        let res = render_grid(&smiles, &out, &grid_options);
        if res.ok {
            info!("wrote {}", out.display());
            panels.push(out);
        } else {
            warn!("panel {n:03} failed: {}", res.message);
        }
        if options.captions {
            let caption = options.out_dir.join(format!("panel_{n:03}_caption.txt"));
            if let Err(e) = write_caption(&caption, &title, &legends) {
                warn!("failed to write {}: {e}", caption.display());
            }
        }
    }
    panels
}
