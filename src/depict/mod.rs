//! The depiction toolkit: a molecular graph read from SMILES, 2D coordinates,
//! CIP annotation, and SVG/PNG drawing. The rest of the crate only talks to
//! this module through [Mol], [draw] and [raster].
//!
//! TODO move this to its own crate once the drawing API settles

use std::ops::{Add, Mul, Sub};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

pub mod draw;
mod element;
pub mod layout;
pub mod raster;
pub mod rings;
pub mod smiles;
pub mod stereo;
mod valence;

pub use smiles::SmilesError;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    /// angle of the vector in radians, measured counter-clockwise from +x
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn from_angle(angle: f64, length: f64) -> Self {
        Self::new(angle.cos() * length, angle.sin() * length)
    }

    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::new(1.0, 0.0)
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// the vector rotated a quarter turn counter-clockwise
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Atom {
    /// 0 for the `*` wildcard
    pub atomic_num: u8,
    pub aromatic: bool,
    /// 0 means natural abundance
    pub isotope: u16,
    pub charge: i8,
    /// implicit plus bracket hydrogens. explicit `[H]` atoms are graph nodes
    pub hydrogens: u8,
    pub bracket: bool,
}

impl Atom {
    pub fn symbol(&self) -> &'static str {
        element::symbol(self.atomic_num)
    }

    pub(crate) fn color(&self) -> &'static str {
        element::color(self.atomic_num)
    }

    /// a plain hydrogen that can be folded into its neighbor's count
    fn is_plain_hydrogen(&self) -> bool {
        self.atomic_num == 1 && self.isotope == 0 && self.charge == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// contribution to the valence of either end, with aromatic bonds counted
    /// as single
    pub(crate) fn valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bond {
    pub order: BondOrder,
}

/// One of the four groups around a tetrahedral center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ligand {
    Atom(NodeIndex),
    ImplicitH,
}

/// A tetrahedral center. `ligands` are in SMILES order; looking from the
/// first ligand the other three run counter-clockwise unless `clockwise`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tetrahedral {
    pub center: NodeIndex,
    pub ligands: [Ligand; 4],
    pub clockwise: bool,
}

/// Relative configuration of `refs` across the double `bond`.
#[derive(Clone, Debug, PartialEq)]
pub struct DoubleBondStereo {
    pub bond: EdgeIndex,
    /// (neighbor of the first double-bond atom, neighbor of the second)
    pub ends: (NodeIndex, NodeIndex),
    pub refs: (NodeIndex, NodeIndex),
    pub cis: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HydrogenError {
    #[error("hydrogen {atom} is held by a {order:?} bond")]
    NonSingleBond { atom: usize, order: BondOrder },
    #[error("atom {atom} would carry more than 255 hydrogens")]
    Overflow { atom: usize },
}

#[derive(Clone, Debug, Default)]
pub struct Mol {
    graph: UnGraph<Atom, Bond>,
    tetrahedral: Vec<Tetrahedral>,
    double_bonds: Vec<DoubleBondStereo>,
    coords: Vec<Point>,
}

impl Mol {
    /// parse `smiles` into a molecule. no coordinates are assigned; call
    /// [Mol::compute_2d_coords] before drawing
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        smiles::parse(smiles)
    }

    pub(crate) fn from_parts(
        graph: UnGraph<Atom, Bond>,
        tetrahedral: Vec<Tetrahedral>,
        double_bonds: Vec<DoubleBondStereo>,
    ) -> Self {
        Self {
            graph,
            tetrahedral,
            double_bonds,
            coords: Vec::new(),
        }
    }

    pub fn graph(&self) -> &UnGraph<Atom, Bond> {
        &self.graph
    }

    pub fn num_atoms(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_bonds(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atom(&self, idx: NodeIndex) -> &Atom {
        &self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &Bond {
        &self.graph[idx]
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// neighbors of `idx` in ascending index order
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut ret: Vec<_> = self.graph.neighbors(idx).collect();
        ret.sort();
        ret.dedup();
        ret
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> (NodeIndex, NodeIndex) {
        // every edge index handed out by this type is valid
        self.graph
            .edge_endpoints(idx)
            .unwrap_or((NodeIndex::new(0), NodeIndex::new(0)))
    }

    pub fn tetrahedral(&self) -> &[Tetrahedral] {
        &self.tetrahedral
    }

    pub fn double_bond_stereo(&self) -> &[DoubleBondStereo] {
        &self.double_bonds
    }

    /// 2D coordinates, one per atom, or an empty slice before
    /// [Mol::compute_2d_coords]
    pub fn coords(&self) -> &[Point] {
        &self.coords
    }

    pub fn has_coords(&self) -> bool {
        self.coords.len() == self.num_atoms()
    }

    pub fn compute_2d_coords(&mut self) {
        self.coords = layout::compute_2d_coords(self);
    }

    /// return a copy of `self` with plain explicit hydrogens folded into the
    /// hydrogen counts of their neighbors. hydrogens with isotopes, charges,
    /// no neighbor, a hydrogen neighbor, or more than one neighbor stay in
    /// the graph. stereo is carried over and existing coordinates are kept
    /// for the surviving atoms
    pub fn remove_hs(&self) -> Result<Mol, HydrogenError> {
        let mut removed = vec![false; self.num_atoms()];
        let mut extra_h = vec![0u32; self.num_atoms()];
        for idx in self.atoms() {
            let atom = self.atom(idx);
            if !atom.is_plain_hydrogen() {
                continue;
            }
            let edges: Vec<_> = self.graph.edges(idx).collect();
            let [edge] = edges.as_slice() else {
                continue;
            };
            let heavy = if edge.source() == idx {
                edge.target()
            } else {
                edge.source()
            };
            if self.atom(heavy).atomic_num == 1 {
                continue;
            }
            if edge.weight().order != BondOrder::Single {
                return Err(HydrogenError::NonSingleBond {
                    atom: idx.index(),
                    order: edge.weight().order,
                });
            }
            removed[idx.index()] = true;
            extra_h[heavy.index()] += 1;
        }

        if !removed.iter().any(|&r| r) {
            return Ok(self.clone());
        }

        let mut graph = UnGraph::default();
        let mut map: Vec<Option<NodeIndex>> = vec![None; self.num_atoms()];
        for idx in self.atoms() {
            if removed[idx.index()] {
                continue;
            }
            let mut atom = self.atom(idx).clone();
            let total = u32::from(atom.hydrogens) + extra_h[idx.index()];
            atom.hydrogens = u8::try_from(total)
                .map_err(|_| HydrogenError::Overflow { atom: idx.index() })?;
            map[idx.index()] = Some(graph.add_node(atom));
        }
        let mut edge_map: Vec<Option<EdgeIndex>> = vec![None; self.num_bonds()];
        for edge in self.graph.edge_references() {
            if let (Some(a), Some(b)) =
                (map[edge.source().index()], map[edge.target().index()])
            {
                edge_map[edge.id().index()] =
                    Some(graph.add_edge(a, b, edge.weight().clone()));
            }
        }

        let tetrahedral = self
            .tetrahedral
            .iter()
            .filter_map(|t| {
                let center = map[t.center.index()]?;
                let mut ligands = t.ligands;
                for lig in &mut ligands {
                    if let Ligand::Atom(n) = *lig {
                        *lig = match map[n.index()] {
                            Some(m) => Ligand::Atom(m),
                            None => Ligand::ImplicitH,
                        };
                    }
                }
                // two implicit hydrogens on one center are not a stereocenter
                let nh = ligands
                    .iter()
                    .filter(|l| matches!(l, Ligand::ImplicitH))
                    .count();
                (nh < 2).then_some(Tetrahedral {
                    center,
                    ligands,
                    clockwise: t.clockwise,
                })
            })
            .collect();

        let double_bonds = self
            .double_bonds
            .iter()
            .filter_map(|db| self.remap_double_bond(db, &map, &edge_map))
            .collect();

        let coords = if self.coords.len() == self.num_atoms() {
            self.coords
                .iter()
                .enumerate()
                .filter(|(i, _)| !removed[*i])
                .map(|(_, p)| *p)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Mol {
            graph,
            tetrahedral,
            double_bonds,
            coords,
        })
    }

    /// carry a double bond's configuration over to the hydrogen-free graph,
    /// swapping a removed reference hydrogen for the other substituent on the
    /// same end
    fn remap_double_bond(
        &self,
        db: &DoubleBondStereo,
        map: &[Option<NodeIndex>],
        edge_map: &[Option<EdgeIndex>],
    ) -> Option<DoubleBondStereo> {
        let bond = edge_map[db.bond.index()]?;
        let mut cis = db.cis;
        let mut pick = |end: NodeIndex, other: NodeIndex, r: NodeIndex| {
            if let Some(m) = map[r.index()] {
                return Some(m);
            }
            let alt = self
                .neighbors(end)
                .into_iter()
                .find(|&n| n != other && n != r && map[n.index()].is_some())?;
            cis = !cis;
            map[alt.index()]
        };
        let left = pick(db.ends.0, db.ends.1, db.refs.0)?;
        let right = pick(db.ends.1, db.ends.0, db.refs.1)?;
        Some(DoubleBondStereo {
            bond,
            ends: (map[db.ends.0.index()]?, map[db.ends.1.index()]?),
            refs: (left, right),
            cis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_explicit_hydrogens() {
        let mol = Mol::from_smiles("[H]OC([H])([H])[H]").unwrap();
        assert_eq!(mol.num_atoms(), 6);
        let stripped = mol.remove_hs().unwrap();
        assert_eq!(stripped.num_atoms(), 2);
        assert_eq!(stripped.num_bonds(), 1);
        let hs: Vec<u8> =
            stripped.atoms().map(|a| stripped.atom(a).hydrogens).collect();
        assert_eq!(hs, vec![1, 3]);
    }

    #[test]
    fn remove_hs_keeps_special_hydrogens() {
        // deuterium and molecular hydrogen are left alone
        let mol = Mol::from_smiles("[2H]C.[H][H]").unwrap();
        let stripped = mol.remove_hs().unwrap();
        assert_eq!(stripped.num_atoms(), 4);
    }

    #[test]
    fn remove_hs_rejects_multiple_bond_to_hydrogen() {
        let mol = Mol::from_smiles("[H]=C").unwrap();
        assert!(matches!(
            mol.remove_hs(),
            Err(HydrogenError::NonSingleBond { atom: 0, .. })
        ));
    }

    #[test]
    fn remove_hs_preserves_tetrahedral_stereo() {
        let mol = Mol::from_smiles("N[C@@]([H])(C)C(=O)O").unwrap();
        let stripped = mol.remove_hs().unwrap();
        let t = &stripped.tetrahedral()[0];
        assert_eq!(t.ligands[1], Ligand::ImplicitH);
        assert!(t.clockwise);
    }

    #[test]
    fn remove_hs_keeps_coordinates_of_heavy_atoms() {
        let mut mol = Mol::from_smiles("[H]C([H])([H])O").unwrap();
        mol.compute_2d_coords();
        let o = mol.coords()[4];
        let stripped = mol.remove_hs().unwrap();
        assert_eq!(stripped.coords().len(), 2);
        assert_eq!(stripped.coords()[1], o);
    }

    #[test]
    fn remove_hs_swaps_double_bond_reference() {
        // cis hydrogen on the left is the same as trans methyl
        let mol = Mol::from_smiles(r"[H]/C(C)=C\F").unwrap();
        assert!(mol.double_bond_stereo()[0].cis);
        let stripped = mol.remove_hs().unwrap();
        let db = &stripped.double_bond_stereo()[0];
        assert!(!db.cis);
        assert_eq!(stripped.atom(db.refs.0).atomic_num, 6);
    }
}
