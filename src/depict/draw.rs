//! SVG output for single molecules and grids of molecules.

use std::borrow::Cow;

use bitflags::bitflags;
use log::trace;
use petgraph::graph::{EdgeIndex, NodeIndex};

use super::layout::BOND_LENGTH;
use super::rings::RingInfo;
use super::stereo;
use super::{BondOrder, Ligand, Mol, Point};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DrawFlags: u8 {
        const NONE =                  0x0;
        const CLEAR_BACKGROUND =      0x1;
        const ADD_STEREO_ANNOTATION = 0x2;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawOptions {
    pub flags: DrawFlags,
    /// atom label size in pixels when the molecule is drawn at full scale.
    /// labels shrink with the drawing
    pub base_font_size: f64,
    pub bond_line_width: f64,
    /// fraction of the width and height left empty on each side
    pub padding: f64,
    pub legend_font_size: f64,
    pub background: String,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            flags: DrawFlags::CLEAR_BACKGROUND,
            base_font_size: 18.0,
            bond_line_width: 2.0,
            padding: 0.05,
            legend_font_size: 16.0,
            background: "#FFFFFF".to_owned(),
        }
    }
}

/// pixels per layout unit. small molecules are not blown up past this
const MAX_SCALE: f64 = 30.0;

/// distance between the lines of a multiple bond, as a fraction of the bond
const MULTIPLE_BOND_OFFSET: f64 = 0.18;

/// how much each end of an inner ring line is pulled in
const INNER_LINE_SHORTEN: f64 = 0.15;

/// width of the open end of a wedge, as a fraction of the bond
const WEDGE_WIDTH: f64 = 0.22;

const ANNOTATION_COLOR: &str = "#7F7F7F";

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// maps layout coordinates onto the canvas, flipping y
#[derive(Clone, Copy, Debug)]
struct Transform {
    scale: f64,
    offset: Point,
}

impl Transform {
    fn fit(coords: &[Point], origin: Point, width: f64, height: f64, padding: f64) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in coords {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        if coords.is_empty() {
            min = Point::default();
            max = Point::default();
        }
        // one bond length of slack for the labels on the outermost atoms
        let span_x = max.x - min.x + BOND_LENGTH;
        let span_y = max.y - min.y + BOND_LENGTH;
        let avail_w = (width * (1.0 - 2.0 * padding)).max(1.0);
        let avail_h = (height * (1.0 - 2.0 * padding)).max(1.0);
        let scale = (avail_w / span_x).min(avail_h / span_y).min(MAX_SCALE);

        let center = min.midpoint(max);
        let canvas_center = origin + Point::new(width / 2.0, height / 2.0);
        Self {
            scale,
            offset: Point::new(
                canvas_center.x - center.x * scale,
                canvas_center.y + center.y * scale,
            ),
        }
    }

    fn apply(&self, p: Point) -> Point {
        Point::new(self.offset.x + p.x * self.scale, self.offset.y - p.y * self.scale)
    }
}

struct AtomLabel {
    symbol: &'static str,
    hydrogens: u8,
    charge: i8,
    isotope: u16,
    hydrogens_left: bool,
}

impl AtomLabel {
    fn charge_text(&self) -> Option<String> {
        match self.charge {
            0 => None,
            1 => Some("+".to_owned()),
            -1 => Some("-".to_owned()),
            n if n > 0 => Some(format!("{n}+")),
            n => Some(format!("{}-", n.unsigned_abs())),
        }
    }
}

fn atom_label(mol: &Mol, a: NodeIndex) -> Option<AtomLabel> {
    let atom = mol.atom(a);
    let degree = mol.degree(a);
    if atom.atomic_num == 6 && degree > 0 && atom.charge == 0 && atom.isotope == 0
    {
        return None;
    }
    // hydrogens go on the side away from the bonds of terminal atoms
    let coords = mol.coords();
    let dx: f64 = mol
        .neighbors(a)
        .into_iter()
        .map(|n| coords[n.index()].x - coords[a.index()].x)
        .sum();
    Some(AtomLabel {
        symbol: atom.symbol(),
        hydrogens: atom.hydrogens,
        charge: atom.charge,
        isotope: atom.isotope,
        hydrogens_left: degree == 1 && dx > 0.1,
    })
}

/// a wedge or hash drawn from `center` toward the other end of `bond`
struct Wedge {
    bond: EdgeIndex,
    center: NodeIndex,
    hashed: bool,
}

fn det3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// pick one bond per tetrahedral centre and decide whether it points toward
/// the viewer or away so the drawing has the centre's handedness
fn wedges(mol: &Mol, rings: &RingInfo) -> Vec<Wedge> {
    let coords = mol.coords();
    let centers: Vec<NodeIndex> = mol.tetrahedral().iter().map(|t| t.center).collect();
    let mut ret: Vec<Wedge> = Vec::new();

    for t in mol.tetrahedral() {
        let c = coords[t.center.index()];
        let Some((_, chosen)) = t
            .ligands
            .iter()
            .enumerate()
            .filter_map(|(i, l)| match l {
                Ligand::Atom(n) => Some((i, *n)),
                Ligand::ImplicitH => None,
            })
            .filter(|&(_, n)| {
                mol.bond_between(t.center, n)
                    .is_some_and(|e| ret.iter().all(|w| w.bond != e))
            })
            .min_by_key(|&(i, n)| {
                (rings.is_ring_bond(t.center, n), centers.contains(&n), i)
            })
        else {
            continue;
        };
        let Some(bond) = mol.bond_between(t.center, chosen) else {
            continue;
        };

        let planar: Vec<Option<Point>> = t
            .ligands
            .iter()
            .map(|l| match l {
                Ligand::Atom(n) => Some((coords[n.index()] - c).normalized()),
                Ligand::ImplicitH => None,
            })
            .collect();
        let sum = planar
            .iter()
            .flatten()
            .fold(Point::default(), |acc, &p| acc + p);
        let vectors: Vec<[f64; 3]> = t
            .ligands
            .iter()
            .zip(&planar)
            .map(|(l, p)| match (l, p) {
                (Ligand::Atom(n), Some(p)) if *n == chosen => [p.x, p.y, 1.0],
                (_, Some(p)) => [p.x, p.y, 0.0],
                (_, None) => {
                    let h = (sum * -1.0).normalized();
                    [h.x, h.y, -1.0]
                }
            })
            .collect();
        let d = |i: usize| {
            [
                vectors[i][0] - vectors[0][0],
                vectors[i][1] - vectors[0][1],
                vectors[i][2] - vectors[0][2],
            ]
        };
        let det = det3(d(1), d(2), d(3));
        if det.abs() < 1e-6 {
            trace!("no wedge for degenerate centre {}", t.center.index());
            continue;
        }
        // looking from the first ligand, `@` runs counter-clockwise, which
        // gives a negative determinant with z toward the viewer
        let wedge_matches = (det < 0.0) == !t.clockwise;
        ret.push(Wedge {
            bond,
            center: t.center,
            hashed: !wedge_matches,
        });
    }
    ret
}

pub struct SvgDrawer {
    width: u32,
    height: u32,
    options: DrawOptions,
    body: String,
    finished: bool,
}

impl SvgDrawer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            options: DrawOptions::default(),
            body: String::new(),
            finished: false,
        }
    }

    pub fn options(&self) -> &DrawOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DrawOptions {
        &mut self.options
    }

    /// draw `mol` over the whole canvas with `legend` underneath. molecules
    /// without coordinates get a fresh layout first
    pub fn draw_molecule(&mut self, mol: &Mol, legend: &str) {
        self.draw_cell(
            Some(mol),
            legend,
            Point::default(),
            self.width as f64,
            self.height as f64,
        );
    }

    /// close the document. nothing can be drawn afterwards
    pub fn finish_drawing(&mut self) {
        if !self.finished {
            self.body.push_str("</svg>\n");
            self.finished = true;
        }
    }

    pub fn drawing_text(&self) -> String {
        let (w, h) = (self.width, self.height);
        let mut svg = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <svg version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\" \
             width=\"{w}px\" height=\"{h}px\" viewBox=\"0 0 {w} {h}\">\n"
        );
        if self.options.flags.contains(DrawFlags::CLEAR_BACKGROUND) {
            svg.push_str(&format!(
                "<rect style=\"opacity:1.0;fill:{};stroke:none\" \
                 width=\"{w}\" height=\"{h}\" x=\"0\" y=\"0\"/>\n",
                self.options.background
            ));
        }
        svg.push_str(&self.body);
        svg
    }

    fn draw_cell(
        &mut self,
        mol: Option<&Mol>,
        legend: &str,
        origin: Point,
        width: f64,
        height: f64,
    ) {
        if self.finished {
            return;
        }
        let legend_height = if legend.is_empty() {
            0.0
        } else {
            self.options.legend_font_size * 1.6
        };
        if let Some(mol) = mol {
            let mol = if mol.has_coords() {
                Cow::Borrowed(mol)
            } else {
                let mut m = mol.clone();
                m.compute_2d_coords();
                Cow::Owned(m)
            };
            let tf = Transform::fit(
                mol.coords(),
                origin,
                width,
                height - legend_height,
                self.options.padding,
            );
            self.draw_structure(&mol, &tf);
        }
        if !legend.is_empty() {
            self.body.push_str(&format!(
                "<text class=\"legend\" x=\"{:.1}\" y=\"{:.1}\" \
                 text-anchor=\"middle\" font-family=\"sans-serif\" \
                 font-size=\"{:.1}\" fill=\"#000000\">{}</text>\n",
                origin.x + width / 2.0,
                origin.y + height - legend_height * 0.35,
                self.options.legend_font_size,
                escape_xml(legend)
            ));
        }
    }

    fn draw_structure(&mut self, mol: &Mol, tf: &Transform) {
        let rings = RingInfo::sssr(mol);
        let bond_px = BOND_LENGTH * tf.scale;
        let font = (self.options.base_font_size * tf.scale / MAX_SCALE)
            .clamp(6.0, self.options.base_font_size.max(6.0));
        let labels: Vec<Option<AtomLabel>> =
            mol.atoms().map(|a| atom_label(mol, a)).collect();
        let wedges = wedges(mol, &rings);

        for e in mol.bonds() {
            let (a, b) = mol.bond_endpoints(e);
            let pa = tf.apply(mol.coords()[a.index()]);
            let pb = tf.apply(mol.coords()[b.index()]);
            let ra = if labels[a.index()].is_some() { font * 0.55 } else { 0.0 };
            let rb = if labels[b.index()].is_some() { font * 0.55 } else { 0.0 };
            let Some((pa, pb)) = shorten(pa, pb, ra, rb) else {
                continue;
            };
            let ca = mol.atom(a).color();
            let cb = mol.atom(b).color();

            if let Some(w) = wedges.iter().find(|w| w.bond == e) {
                let (from, to, color) = if w.center == a {
                    (pa, pb, ca)
                } else {
                    (pb, pa, cb)
                };
                self.wedge(from, to, bond_px * WEDGE_WIDTH / 2.0, color, w.hashed);
                continue;
            }

            let offset = bond_px * MULTIPLE_BOND_OFFSET;
            let ring_center = rings
                .bond_rings(a, b)
                .into_iter()
                .min_by_key(|&r| (rings.rings()[r].len(), r))
                .map(|r| {
                    let ring = &rings.rings()[r];
                    let sum = ring
                        .iter()
                        .fold(Point::default(), |acc, n| acc + mol.coords()[n.index()]);
                    tf.apply(sum * (1.0 / ring.len() as f64))
                });
            let normal = (pb - pa).perp().normalized();

            match (mol.bond(e).order, ring_center) {
                (BondOrder::Single, _) => self.line(pa, pb, ca, cb, false),
                (order @ (BondOrder::Double | BondOrder::Aromatic), Some(center)) => {
                    self.line(pa, pb, ca, cb, false);
                    let mid = pa.midpoint(pb);
                    let side = if dot(center - mid, normal) >= 0.0 { 1.0 } else { -1.0 };
                    let along = (pb - pa) * INNER_LINE_SHORTEN;
                    let shift = normal * (offset * side);
                    self.line(
                        pa + shift + along,
                        pb + shift - along,
                        ca,
                        cb,
                        order == BondOrder::Aromatic,
                    );
                }
                (BondOrder::Double | BondOrder::Aromatic, None) => {
                    let shift = normal * (offset / 2.0);
                    self.line(pa + shift, pb + shift, ca, cb, false);
                    self.line(pa - shift, pb - shift, ca, cb, false);
                }
                (BondOrder::Triple, _) => {
                    let shift = normal * offset;
                    self.line(pa, pb, ca, cb, false);
                    self.line(pa + shift, pb + shift, ca, cb, false);
                    self.line(pa - shift, pb - shift, ca, cb, false);
                }
            }
        }

        for a in mol.atoms() {
            if let Some(label) = &labels[a.index()] {
                let p = tf.apply(mol.coords()[a.index()]);
                self.atom_text(p, label, font, mol.atom(a).color());
            }
        }

        if self.options.flags.contains(DrawFlags::ADD_STEREO_ANNOTATION) {
            self.annotate(mol, tf, font, bond_px);
        }
    }

    fn annotate(&mut self, mol: &Mol, tf: &Transform, font: f64, bond_px: f64) {
        let size = font * 0.65;
        for (a, label) in stereo::atom_labels(mol) {
            let p = tf.apply(mol.coords()[a.index()]);
            let away = mol
                .neighbors(a)
                .into_iter()
                .map(|n| (tf.apply(mol.coords()[n.index()]) - p).normalized())
                .fold(Point::default(), |acc, v| acc - v);
            let dir = if away.length() < 1e-6 {
                Point::new(0.0, -1.0)
            } else {
                away.normalized()
            };
            let at = p + dir * (bond_px * 0.45);
            self.text(at, &format!("({label})"), size, ANNOTATION_COLOR);
        }
        for (e, label) in stereo::bond_labels(mol) {
            let (a, b) = mol.bond_endpoints(e);
            let pa = tf.apply(mol.coords()[a.index()]);
            let pb = tf.apply(mol.coords()[b.index()]);
            let at = pa.midpoint(pb) + (pb - pa).perp().normalized() * (bond_px * 0.35);
            self.text(at, &format!("({label})"), size, ANNOTATION_COLOR);
        }
    }

    fn text(&mut self, at: Point, text: &str, size: f64, color: &str) {
        self.body.push_str(&format!(
            "<text class=\"annotation\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" \
             font-family=\"sans-serif\" font-size=\"{size:.1}\" fill=\"{color}\">{}</text>\n",
            at.x,
            at.y + size * 0.35,
            escape_xml(text)
        ));
    }

    fn atom_text(&mut self, p: Point, label: &AtomLabel, font: f64, color: &str) {
        let char_w = font * 0.6;
        let small = font * 0.7;
        let half_w = char_w * label.symbol.len() as f64 / 2.0;
        let baseline = p.y + font * 0.35;
        let raised = p.y - font * 0.2;
        let attrs = format!("font-family=\"sans-serif\" fill=\"{color}\"");

        self.body.push_str(&format!(
            "<text class=\"atom\" x=\"{:.1}\" y=\"{baseline:.1}\" text-anchor=\"middle\" \
             font-size=\"{font:.1}\" {attrs}>{}</text>\n",
            p.x, label.symbol
        ));

        let mut right = p.x + half_w;
        let mut left = p.x - half_w;
        if label.hydrogens > 0 {
            let count = if label.hydrogens > 1 {
                format!(
                    "<tspan baseline-shift=\"sub\" font-size=\"{small:.1}\">{}</tspan>",
                    label.hydrogens
                )
            } else {
                String::new()
            };
            let h_w = char_w + if label.hydrogens > 1 { small * 0.6 } else { 0.0 };
            let (x, anchor) = if label.hydrogens_left {
                left -= h_w;
                (p.x - half_w, "end")
            } else {
                right += h_w;
                (p.x + half_w, "start")
            };
            self.body.push_str(&format!(
                "<text class=\"atom\" x=\"{x:.1}\" y=\"{baseline:.1}\" text-anchor=\"{anchor}\" \
                 font-size=\"{font:.1}\" {attrs}>H{count}</text>\n"
            ));
        }
        if let Some(charge) = label.charge_text() {
            self.body.push_str(&format!(
                "<text class=\"atom\" x=\"{right:.1}\" y=\"{raised:.1}\" text-anchor=\"start\" \
                 font-size=\"{small:.1}\" {attrs}>{charge}</text>\n"
            ));
        }
        if label.isotope > 0 {
            self.body.push_str(&format!(
                "<text class=\"atom\" x=\"{left:.1}\" y=\"{raised:.1}\" text-anchor=\"end\" \
                 font-size=\"{small:.1}\" {attrs}>{}</text>\n",
                label.isotope
            ));
        }
    }

    /// a straight line, each half in the colour of its atom
    fn line(&mut self, p: Point, q: Point, cp: &str, cq: &str, dashed: bool) {
        if cp == cq {
            self.segment(p, q, cp, dashed);
        } else {
            let mid = p.midpoint(q);
            self.segment(p, mid, cp, dashed);
            self.segment(mid, q, cq, dashed);
        }
    }

    fn segment(&mut self, p: Point, q: Point, color: &str, dashed: bool) {
        let dash = if dashed { ";stroke-dasharray:6,4" } else { "" };
        self.body.push_str(&format!(
            "<path class=\"bond\" d=\"M {:.1},{:.1} L {:.1},{:.1}\" \
             style=\"fill:none;stroke:{color};stroke-width:{:.1}px;\
             stroke-linecap:butt;stroke-linejoin:miter{dash}\"/>\n",
            p.x, p.y, q.x, q.y, self.options.bond_line_width
        ));
    }

    fn wedge(&mut self, from: Point, to: Point, half_width: f64, color: &str, hashed: bool) {
        let normal = (to - from).perp().normalized();
        if hashed {
            const LINES: usize = 6;
            for i in 1..=LINES {
                let t = i as f64 / LINES as f64;
                let at = from + (to - from) * t;
                let w = normal * (half_width * t);
                let (p, q) = (at + w, at - w);
                self.body.push_str(&format!(
                    "<path class=\"hash\" d=\"M {:.1},{:.1} L {:.1},{:.1}\" \
                     style=\"fill:none;stroke:{color};stroke-width:1.0px;stroke-linecap:butt\"/>\n",
                    p.x, p.y, q.x, q.y
                ));
            }
        } else {
            let (p, q) = (to + normal * half_width, to - normal * half_width);
            self.body.push_str(&format!(
                "<path class=\"wedge\" d=\"M {:.1},{:.1} L {:.1},{:.1} L {:.1},{:.1} Z\" \
                 style=\"fill:{color};fill-rule:evenodd;stroke:{color};stroke-width:0.5px\"/>\n",
                from.x, from.y, p.x, p.y, q.x, q.y
            ));
        }
    }
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// pull both ends of a bond in by the given distances, or None when nothing
/// would be left
fn shorten(p: Point, q: Point, rp: f64, rq: f64) -> Option<(Point, Point)> {
    let len = p.distance(q);
    if len <= rp + rq {
        return None;
    }
    let u = (q - p).normalized();
    Some((p + u * rp, q - u * rq))
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{cols}x{rows} cells of {cell_width}x{cell_height} pixels do not fit a canvas")]
pub struct GridTooLarge {
    pub cols: usize,
    pub rows: usize,
    pub cell_width: u32,
    pub cell_height: u32,
}

/// tile `mols` into one SVG, `mols_per_row` across, each cell `sub_size`
/// pixels. `None` entries leave their cell empty apart from the legend
pub fn grid_svg(
    mols: &[Option<Mol>],
    mols_per_row: usize,
    sub_size: (u32, u32),
    legends: &[String],
    options: &DrawOptions,
) -> Result<String, GridTooLarge> {
    let cols = mols_per_row.max(1);
    let rows = mols.len().div_ceil(cols).max(1);
    let (sw, sh) = sub_size;
    let too_large = GridTooLarge {
        cols,
        rows,
        cell_width: sw,
        cell_height: sh,
    };
    let span = |n: usize, cell: u32| {
        u32::try_from(n).ok().and_then(|n| n.checked_mul(cell))
    };
    let (Some(width), Some(height)) = (span(cols, sw), span(rows, sh)) else {
        return Err(too_large);
    };
    let mut drawer = SvgDrawer::new(width, height);
    *drawer.options_mut() = options.clone();
    for (i, mol) in mols.iter().enumerate() {
        let origin = Point::new(
            (i % cols) as f64 * sw as f64,
            (i / cols) as f64 * sh as f64,
        );
        let legend = legends.get(i).map_or("", String::as_str);
        drawer.draw_cell(mol.as_ref(), legend, origin, sw as f64, sh as f64);
    }
    drawer.finish_drawing();
    Ok(drawer.drawing_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(smiles: &str, legend: &str, flags: DrawFlags) -> String {
        let mut mol = Mol::from_smiles(smiles).unwrap();
        mol.compute_2d_coords();
        let mut drawer = SvgDrawer::new(300, 250);
        drawer.options_mut().flags = flags;
        drawer.draw_molecule(&mol, legend);
        drawer.finish_drawing();
        drawer.drawing_text()
    }

    #[test]
    fn header_and_background() {
        let got = svg("CCO", "", DrawFlags::CLEAR_BACKGROUND);
        assert!(got.starts_with("<?xml"));
        assert!(got.contains("<svg version=\"1.1\""));
        assert!(got.contains("width=\"300px\" height=\"250px\""));
        assert!(got.contains("<rect style=\"opacity:1.0;fill:#FFFFFF"));
        assert!(got.trim_end().ends_with("</svg>"));

        let clear = svg("CCO", "", DrawFlags::NONE);
        assert!(!clear.contains("<rect"));
    }

    #[test]
    fn labels_only_on_heteroatoms() {
        let got = svg("CCO", "", DrawFlags::NONE);
        assert_eq!(got.matches("class=\"atom\"").count(), 2);
        assert!(got.contains(">O</text>"));
        assert!(got.contains(">H</text>"));

        let benzene = svg("c1ccccc1", "", DrawFlags::NONE);
        assert!(!benzene.contains("class=\"atom\""));
        assert!(benzene.contains("stroke-dasharray"));
    }

    #[test]
    fn charges_and_hydrogen_counts() {
        let got = svg("C[NH3+]", "", DrawFlags::NONE);
        assert!(got.contains(">N</text>"));
        assert!(got.contains("baseline-shift=\"sub\""));
        assert!(got.contains(">+</text>"));
    }

    #[test]
    fn legend_is_escaped() {
        let got = svg("CCO", "a<b & c", DrawFlags::NONE);
        assert!(got.contains(">a&lt;b &amp; c</text>"));
    }

    #[test]
    fn stereo_annotation() {
        let flags = DrawFlags::ADD_STEREO_ANNOTATION;
        assert!(svg("N[C@@H](C)C(=O)O", "", flags).contains(">(S)</text>"));
        assert!(!svg("N[C@@H](C)C(=O)O", "", DrawFlags::NONE).contains("(S)"));
        assert!(svg("F/C=C/F", "", flags).contains(">(E)</text>"));
    }

    #[test]
    fn stereocentres_get_a_wedge() {
        let got = svg("N[C@@H](C)C(=O)O", "", DrawFlags::NONE);
        assert!(got.contains("class=\"wedge\"") || got.contains("class=\"hash\""));
        let other = svg("N[C@H](C)C(=O)O", "", DrawFlags::NONE);
        assert_ne!(
            got.contains("class=\"wedge\""),
            other.contains("class=\"wedge\"")
        );
    }

    #[test]
    fn nothing_after_finish() {
        let mol = Mol::from_smiles("CC").unwrap();
        let mut drawer = SvgDrawer::new(100, 100);
        drawer.finish_drawing();
        let before = drawer.drawing_text();
        drawer.draw_molecule(&mol, "late");
        assert_eq!(drawer.drawing_text(), before);
    }

    #[test]
    fn grid_dimensions() {
        let mols = vec![
            Mol::from_smiles("CCO").ok(),
            None,
            Mol::from_smiles("c1ccccc1").ok(),
        ];
        let legends = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let got =
            grid_svg(&mols, 2, (200, 150), &legends, &DrawOptions::default()).unwrap();
        assert!(got.contains("width=\"400px\" height=\"300px\""));
        assert_eq!(got.matches("class=\"legend\"").count(), 3);
    }

    #[test]
    fn oversized_grid() {
        let mols = vec![None, None];
        let options = DrawOptions::default();
        assert_eq!(
            grid_svg(&mols, 2, (u32::MAX / 2 + 1, 10), &[], &options),
            Err(GridTooLarge {
                cols: 2,
                rows: 1,
                cell_width: u32::MAX / 2 + 1,
                cell_height: 10,
            })
        );
    }
}
