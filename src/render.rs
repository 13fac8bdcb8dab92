//! Drawing structures to files. Everything the depiction toolkit can throw
//! at us, errors and panics alike, is turned into a [RenderResult] here.

use std::any::Any;
use std::fmt::Display;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::depict::draw::{self, DrawFlags, DrawOptions, SvgDrawer};
use crate::depict::raster::{self, RasterError};
use crate::depict::Mol;
use crate::GridSpec;

/// the `smiles` of every grid result
pub const GRID_SENTINEL: &str = "GRID";

/// space above a grid reserved for its title, in pixels
pub const TITLE_MARGIN: u32 = 70;

const TITLE_FONT_SIZE: u32 = 28;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderResult {
    pub smiles: Option<String>,
    /// only set when `ok`, and then the file exists
    pub out_path: Option<PathBuf>,
    pub ok: bool,
    pub message: String,
    /// hydrogen removal was requested but failed, so the structure was drawn
    /// with its explicit hydrogens
    pub kept_hydrogens: bool,
}

impl RenderResult {
    fn success(smiles: &str, out: &Path, kept_hydrogens: bool) -> Self {
        Self {
            smiles: Some(smiles.to_owned()),
            out_path: Some(out.to_owned()),
            ok: true,
            message: "OK".to_owned(),
            kept_hydrogens,
        }
    }

    fn failure(smiles: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            smiles: smiles.map(str::to_owned),
            out_path: None,
            ok: false,
            message: message.into(),
            kept_hydrogens: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// canvas width and height in pixels
    pub size: (u32, u32),
    pub legend: String,
    pub transparent: bool,
    pub remove_hs: bool,
    pub png_dpi: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: (900, 700),
            legend: String::new(),
            transparent: true,
            remove_hs: false,
            png_dpi: 300,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridOptions {
    pub grid: GridSpec,
    /// size of each cell in pixels
    pub sub_size: (u32, u32),
    /// one per structure. empty means no legends at all
    pub legends: Vec<String>,
    pub transparent: bool,
    pub remove_hs: bool,
    pub png_dpi: u32,
    /// only used for SVG output
    pub title: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            sub_size: (550, 450),
            legends: Vec::new(),
            transparent: false,
            remove_hs: false,
            png_dpi: 300,
            title: String::new(),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[default]
    Svg,
}

impl OutputFormat {
    /// the format named by the extension of `path`, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("png") {
            Some(Self::Png)
        } else if ext.eq_ignore_ascii_case("svg") {
            Some(Self::Svg)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(Debug, thiserror::Error)]
enum RenderError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Grid(#[from] draw::GridTooLarge),
    #[error("{0}")]
    Panic(String),
}

#[derive(Debug, PartialEq, thiserror::Error)]
enum PrepareError {
    #[error("could not parse the structure.")]
    Parse,
    #[error("Render error: {0}")]
    Panic(String),
}

/// parse `smiles`, lay it out, and strip hydrogens if asked. the flag is set
/// when the hydrogens had to be kept. a panic in the toolkit is reported
/// instead of unwinding into the caller
fn prepare(smiles: &str, remove_hs: bool) -> Result<(Mol, bool), PrepareError> {
    catch_panic(|| {
        let mut mol = match Mol::from_smiles(smiles) {
            Ok(m) => m,
            Err(e) => {
                warn!("failed to parse {smiles:?}: {e}");
                return Err(PrepareError::Parse);
            }
        };
        mol.compute_2d_coords();
        if !remove_hs {
            return Ok((mol, false));
        }
        match mol.remove_hs() {
            Ok(stripped) => Ok((stripped, false)),
            Err(e) => {
                warn!("keeping explicit hydrogens on {smiles:?}: {e}");
                Ok((mol, true))
            }
        }
    })
    .unwrap_or_else(|msg| {
        warn!("toolkit panicked on {smiles:?}: {msg}");
        Err(PrepareError::Panic(msg))
    })
}

fn draw_flags(transparent: bool, stereo: bool) -> DrawFlags {
    let mut flags = DrawFlags::NONE;
    if !transparent {
        flags |= DrawFlags::CLEAR_BACKGROUND;
    }
    if stereo {
        flags |= DrawFlags::ADD_STEREO_ANNOTATION;
    }
    flags
}

fn create_parent(out: &Path) -> std::io::Result<()> {
    match out.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// run `f`, turning a panic into its message
fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

/// run `f` and clean up after it. a failed or panicking write leaves no file
/// behind
fn guarded_write(
    out: &Path,
    f: impl FnOnce() -> Result<(), RenderError>,
) -> Result<(), RenderError> {
    let res = catch_panic(f).unwrap_or_else(|msg| Err(RenderError::Panic(msg)));
    if res.is_err() && out.exists() {
        if let Err(e) = fs::remove_file(out) {
            warn!("failed to remove partial output {}: {e}", out.display());
        }
    }
    res
}

/// rasterize `svg` into `out`, retrying without the DPI chunk if that fails
fn write_png(svg: &str, out: &Path, dpi: u32) -> Result<(), RenderError> {
    let pixmap = raster::rasterize(svg)?;
    if let Err(e) = raster::save_png(&pixmap, out, Some(dpi)) {
        warn!(
            "saving {} at {dpi} DPI failed ({e}), saving without DPI",
            out.display()
        );
        raster::save_png(&pixmap, out, None)?;
    }
    Ok(())
}

fn molecule_svg(mol: &Mol, options: &RenderOptions) -> String {
    let (width, height) = options.size;
    let mut drawer = SvgDrawer::new(width, height);
    let opts = drawer.options_mut();
    opts.flags = draw_flags(options.transparent, true);
    opts.base_font_size = 18.0;
    opts.bond_line_width = 2.0;
    opts.padding = 0.05;
    drawer.draw_molecule(mol, &options.legend);
    drawer.finish_drawing();
    drawer.drawing_text()
}

/// draw a single structure to `out`, a `.png` or `.svg` path
pub fn render_molecule(
    smiles: &str,
    out: impl AsRef<Path>,
    options: &RenderOptions,
) -> RenderResult {
    let out = out.as_ref();
    let smiles = smiles.trim();
    if smiles.is_empty() {
        return RenderResult::failure(None, "Empty structure provided.");
    }
    let (mol, kept_hydrogens) = match prepare(smiles, options.remove_hs) {
        Ok(prepared) => prepared,
        Err(e) => return RenderResult::failure(Some(smiles), e.to_string()),
    };
    if let Err(e) = create_parent(out) {
        return RenderResult::failure(Some(smiles), format!("Render error: {e}"));
    }
    let Some(format) = OutputFormat::from_path(out) else {
        return RenderResult::failure(
            Some(smiles),
            "Output must end with .png or .svg",
        );
    };

    debug!("rendering {smiles} to {}", out.display());
    let res = guarded_write(out, || {
        let svg = molecule_svg(&mol, options);
        match format {
            OutputFormat::Png => write_png(&svg, out, options.png_dpi),
            OutputFormat::Svg => Ok(fs::write(out, svg)?),
        }
    });
    match res {
        Ok(()) => RenderResult::success(smiles, out, kept_hydrogens),
        Err(e) => {
            RenderResult::failure(Some(smiles), format!("Render error: {e}"))
        }
    }
}

/// `legends` stretched or cut to `n` entries
fn fit_legends(legends: &[String], n: usize) -> Vec<String> {
    if !legends.is_empty() && legends.len() != n {
        warn!(
            "{} legends for {n} structures, {} to match",
            legends.len(),
            if legends.len() < n { "padding" } else { "truncating" }
        );
    }
    let mut ret: Vec<String> = legends.iter().take(n).cloned().collect();
    ret.resize(n, String::new());
    ret
}

/// draw `smiles_list` as one panel, `options.grid.cols` structures per row.
/// blank and unparseable entries leave their cell empty
pub fn render_grid(
    smiles_list: &[String],
    out: impl AsRef<Path>,
    options: &GridOptions,
) -> RenderResult {
    let out = out.as_ref();
    if smiles_list.is_empty() {
        return RenderResult::failure(
            None,
            "No molecules provided for grid rendering.",
        );
    }
    let grid_failure =
        |message: String| RenderResult::failure(Some(GRID_SENTINEL), message);

    let mut kept_hydrogens = false;
    let mols: Vec<Option<Mol>> = smiles_list
        .iter()
        .map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            let (mol, kept) = prepare(s, options.remove_hs).ok()?;
            kept_hydrogens |= kept;
            Some(mol)
        })
        .collect();
    let legends = fit_legends(&options.legends, mols.len());

    if let Err(e) = create_parent(out) {
        return grid_failure(format!("Grid render error: {e}"));
    }
    let Some(format) = OutputFormat::from_path(out) else {
        return grid_failure("Grid output must end with .png or .svg".to_owned());
    };

    let GridSpec { rows, cols } = options.grid;
    if mols.len() > rows * cols {
        warn!(
            "{} structures do not fit a {rows}x{cols} grid, adding rows",
            mols.len()
        );
    }

    debug!("rendering {} structures to {}", mols.len(), out.display());
    let res = guarded_write(out, || {
        let draw_options = DrawOptions {
            flags: draw_flags(options.transparent, false),
            ..Default::default()
        };
        let svg =
            draw::grid_svg(&mols, cols, options.sub_size, &legends, &draw_options)?;
        match format {
            OutputFormat::Png => write_png(&svg, out, options.png_dpi),
            OutputFormat::Svg => {
                let title = options.title.trim();
                let svg = if title.is_empty() {
                    svg
                } else {
                    inject_svg_title(&svg, title, TITLE_MARGIN)
                };
                Ok(fs::write(out, svg)?)
            }
        }
    });
    match res {
        Ok(()) => RenderResult {
            kept_hydrogens,
            ..RenderResult::success(GRID_SENTINEL, out, false)
        },
        Err(e) => grid_failure(format!("Grid render error: {e}")),
    }
}

fn dimension_regexes() -> Option<&'static (Regex, Regex)> {
    static RE: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        let attr = |name: &str| {
            Regex::new(&format!(
                r#"(?:^|\s){name}\s*=\s*["'](\d+)(?:px)?["']"#
            ))
            .ok()
        };
        Some((attr("width")?, attr("height")?))
    })
    .as_ref()
}

fn prolog_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:<\?xml[^>]*\?>\s*)?(?:<!DOCTYPE[^>]*>\s*)?").ok()
    })
    .as_ref()
}

fn read_dimension(tag: &str, re: Option<&Regex>) -> Option<u32> {
    re?.captures(tag)?.get(1)?.as_str().parse().ok()
}

/// wrap `svg` in a taller document with `title` centred in the new top
/// margin. the original markup is kept as is inside a translated group.
/// without a title or an `<svg` element the input comes back unchanged
pub fn inject_svg_title(svg: &str, title: &str, extra_top: u32) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_owned();
    };
    if title.trim().is_empty() {
        return svg.to_owned();
    }
    let root = &svg[start..];
    let root = root.find('>').map_or(root, |end| &root[..end]);
    let regexes = dimension_regexes();
    let w = read_dimension(root, regexes.map(|r| &r.0)).unwrap_or(1500);
    let h = read_dimension(root, regexes.map(|r| &r.1)).unwrap_or(1000);
    let new_h = h + extra_top;

    let prolog_len = prolog_regex()
        .and_then(|re| re.find(svg))
        .map_or(0, |m| m.end());
    let inner = &svg[prolog_len..];

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" \
         height=\"{new_h}\" viewBox=\"0 0 {w} {new_h}\">\n  \
         <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" \
         font-size=\"{TITLE_FONT_SIZE}\" font-family=\"Arial\">{}</text>\n  \
         <g transform=\"translate(0,{extra_top})\">\n{inner}\n  </g>\n</svg>\n",
        f64::from(w) / 2.0,
        f64::from(extra_top) * 0.65,
        draw::escape_xml(title),
    )
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn grid(n: usize) -> Vec<String> {
        ["CCO", "c1ccccc1", "CC(=O)O", "N", "O=C=O", "C#N", "CCN"]
            .iter()
            .cycle()
            .take(n)
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn empty_structure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.svg");
        let got = render_molecule("  ", &out, &RenderOptions::default());
        assert!(!got.ok);
        assert_eq!(got.message, "Empty structure provided.");
        assert!(got.smiles.is_none());
        assert!(!out.exists());
    }

    #[test]
    fn unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.svg");
        let got = render_molecule("bogus(((", &out, &RenderOptions::default());
        assert_eq!(got.message, "could not parse the structure.");
        assert_eq!(got.smiles.as_deref(), Some("bogus((("));
        assert!(!out.exists());
    }

    #[test]
    fn bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("x.jpg");
        let got = render_molecule("CCO", &out, &RenderOptions::default());
        assert_eq!(got.message, "Output must end with .png or .svg");
        assert!(got.out_path.is_none());
        assert!(!out.exists());
        assert!(out.parent().unwrap().is_dir());

        let got = render_grid(&grid(2), dir.path().join("p.gif"), &GridOptions::default());
        assert_eq!(got.message, "Grid output must end with .png or .svg");
        assert_eq!(got.smiles.as_deref(), Some(GRID_SENTINEL));
    }

    #[test]
    fn svg_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b").join("ethanol.SVG");
        let options = RenderOptions {
            legend: "ethanol".to_owned(),
            ..Default::default()
        };
        let got = render_molecule(" CCO ", &out, &options);
        assert!(got.ok, "{}", got.message);
        assert_eq!(got.smiles.as_deref(), Some("CCO"));
        assert_eq!(got.out_path.as_deref(), Some(out.as_path()));
        assert_eq!(got.message, "OK");

        let svg = fs::read_to_string(&out).unwrap();
        let body = svg.trim_start_matches(|c| c != '\n');
        assert!(body.trim_start().starts_with("<svg"));
        assert!(svg.contains("width=\"900px\" height=\"700px\""));
        assert!(svg.contains(">ethanol</text>"));
        // transparent by default
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn opaque_background() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.svg");
        let options = RenderOptions {
            transparent: false,
            ..Default::default()
        };
        assert!(render_molecule("CCO", &out, &options).ok);
        assert!(fs::read_to_string(&out).unwrap().contains("<rect"));
    }

    #[test]
    fn deterministic_svg() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.svg");
        let b = dir.path().join("b.svg");
        let smiles = "CC(C)C[C@H](N)C(=O)O";
        assert!(render_molecule(smiles, &a, &RenderOptions::default()).ok);
        assert!(render_molecule(smiles, &b, &RenderOptions::default()).ok);
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn stereo_is_annotated() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("ala.svg");
        assert!(render_molecule("N[C@@H](C)C(=O)O", &out, &RenderOptions::default()).ok);
        assert!(fs::read_to_string(&out).unwrap().contains("(S)"));
    }

    #[test]
    fn hydrogen_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("h.svg");
        let options = RenderOptions {
            remove_hs: true,
            ..Default::default()
        };
        let got = render_molecule("[H]C([H])([H])O", &out, &options);
        assert!(got.ok);
        assert!(!got.kept_hydrogens);

        let got = render_molecule("C=[H]", &out, &options);
        assert!(got.ok);
        assert!(got.kept_hydrogens);
    }

    #[test]
    fn png_has_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.png");
        let options = RenderOptions {
            size: (200, 150),
            png_dpi: 150,
            ..Default::default()
        };
        assert!(render_molecule("c1ccccc1O", &out, &options).ok);
        let reader = png::Decoder::new(File::open(&out).unwrap())
            .read_info()
            .unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (200, 150));
        assert_eq!(info.pixel_dims.unwrap().xppu, 5906);
    }

    #[test]
    fn png_dpi_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.png");
        let options = RenderOptions {
            size: (100, 100),
            png_dpi: 0,
            ..Default::default()
        };
        assert!(render_molecule("CCO", &out, &options).ok);
        let reader = png::Decoder::new(File::open(&out).unwrap())
            .read_info()
            .unwrap();
        assert!(reader.info().pixel_dims.is_none());
    }

    #[test]
    fn failed_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.png");
        let options = RenderOptions {
            size: (0, 0),
            ..Default::default()
        };
        let got = render_molecule("CCO", &out, &options);
        assert!(!got.ok);
        assert!(got.message.starts_with("Render error: "), "{}", got.message);
        assert!(!out.exists());
    }

    #[test]
    fn panics_are_caught() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.svg");
        let res = guarded_write(&out, || {
            fs::write(&out, "partial")?;
            panic!("toolkit exploded");
        });
        assert_eq!(res.unwrap_err().to_string(), "toolkit exploded");
        assert!(!out.exists());
    }

    #[test]
    fn toolkit_failures_stay_inside() {
        assert_eq!(
            catch_panic(|| -> u8 { panic!("layout exploded") }),
            Err("layout exploded".to_owned())
        );
        assert_eq!(catch_panic(|| 7), Ok(7));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.svg");
        let got = render_molecule("[C@TH99999999999](F)(Cl)Br", &out, &RenderOptions::default());
        assert_eq!(got.message, "could not parse the structure.");
        assert!(!out.exists());
        let got = render_molecule("C(C)(C)(C)(C)C", &out, &RenderOptions::default());
        assert_eq!(got.message, "could not parse the structure.");
        let got = render_molecule("c1cccc1", &out, &RenderOptions::default());
        assert_eq!(got.message, "could not parse the structure.");
    }

    #[test]
    fn empty_grid() {
        let got = render_grid(&[], "panel.svg", &GridOptions::default());
        assert_eq!(got.message, "No molecules provided for grid rendering.");
        assert!(got.smiles.is_none());
    }

    #[test]
    fn grid_with_title() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.svg");
        let mut list = grid(4);
        list.push("bogus(((".to_owned());
        list.push(" ".to_owned());
        let options = GridOptions {
            legends: vec!["one".to_owned(), "two & three".to_owned()],
            title: " Figure 1 ".to_owned(),
            ..Default::default()
        };
        let got = render_grid(&list, &out, &options);
        assert!(got.ok, "{}", got.message);
        assert_eq!(got.smiles.as_deref(), Some(GRID_SENTINEL));

        let svg = fs::read_to_string(&out).unwrap();
        // 3 columns of 550, 2 rows of 450, plus the title margin
        assert!(svg.starts_with(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1650\" height=\"970\""
        ));
        assert!(svg.contains(">Figure 1</text>"));
        assert!(svg.contains(">two &amp; three</text>"));
    }

    #[test]
    fn overfull_grid_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.svg");
        let options = GridOptions {
            grid: GridSpec { rows: 1, cols: 2 },
            sub_size: (100, 100),
            ..Default::default()
        };
        assert!(render_grid(&grid(5), &out, &options).ok);
        let svg = fs::read_to_string(&out).unwrap();
        assert!(svg.contains("width=\"200px\" height=\"300px\""));
    }

    #[test]
    fn oversized_grid_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.svg");
        let options = GridOptions {
            grid: GridSpec { rows: 1, cols: 100_000 },
            sub_size: (100_000, 100),
            ..Default::default()
        };
        let got = render_grid(&grid(2), &out, &options);
        assert!(!got.ok);
        assert!(got.message.starts_with("Grid render error: "), "{}", got.message);
        assert!(!out.exists());
    }

    #[test]
    fn grid_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("panel.png");
        let options = GridOptions {
            sub_size: (120, 100),
            title: "ignored".to_owned(),
            ..Default::default()
        };
        assert!(render_grid(&grid(4), &out, &options).ok);
        let reader = png::Decoder::new(File::open(&out).unwrap())
            .read_info()
            .unwrap();
        assert_eq!((reader.info().width, reader.info().height), (360, 200));
    }

    #[test]
    fn legends_are_fitted() {
        let legends = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        assert_eq!(fit_legends(&legends, 2), ["a", "b"]);
        assert_eq!(fit_legends(&legends, 4), ["a", "b", "c", ""]);
        assert_eq!(fit_legends(&[], 2), ["", ""]);
    }

    #[test]
    fn title_injection() {
        let svg = "<?xml version='1.0' encoding='iso-8859-1'?>\n\
                   <svg version='1.1' width='400px' height='300px' \
                   viewBox='0 0 400 300'><rect/></svg>\n";
        let got = inject_svg_title(svg, "A < B", 70);
        assert!(got.contains("width=\"400\" height=\"370\""));
        assert!(got.contains("<text x=\"200\" y=\"45.5\""));
        assert!(got.contains(">A &lt; B</text>"));
        assert!(got.contains(&svg[svg.find("<svg").unwrap()..]));
        assert!(!got.contains("<?xml"));
        assert!(got.contains("<g transform=\"translate(0,70)\">"));
    }

    #[test]
    fn title_fallbacks() {
        let svg = "<svg><rect width=\"5\" height=\"5\"/></svg>";
        assert!(inject_svg_title(svg, "T", 70)
            .contains("width=\"1500\" height=\"1070\""));
        assert_eq!(inject_svg_title(svg, "  ", 70), svg);
        assert_eq!(inject_svg_title("<html/>", "T", 70), "<html/>");
    }

    #[test]
    fn output_format() {
        assert_eq!(OutputFormat::from_path(Path::new("a.PNG")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.svg")), Some(OutputFormat::Svg));
        assert_eq!(OutputFormat::from_path(Path::new("a")), None);
        assert_eq!(OutputFormat::Svg.to_string(), "svg");
    }
}
