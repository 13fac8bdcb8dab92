//! CIP labels for drawing. Ranking walks the hierarchical digraph sphere by
//! sphere, comparing atomic numbers only, with duplicate atoms for multiple
//! bonds and ring closures. That is enough for the usual depiction cases but
//! it is not a full implementation of the sequence rules; anything still tied
//! after the walk gets no label.

use std::cmp::Ordering;
use std::fmt::Display;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::{BondOrder, Ligand, Mol};

/// spheres explored before two branches are declared equal
const MAX_SPHERES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipLabel {
    R,
    S,
    E,
    Z,
}

impl Display for CipLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CipLabel::R => "R",
            CipLabel::S => "S",
            CipLabel::E => "E",
            CipLabel::Z => "Z",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug)]
struct Node {
    /// None for hydrogens and duplicate atoms, which have no children
    atom: Option<NodeIndex>,
    z: u8,
    ancestors: Vec<NodeIndex>,
}

impl Node {
    fn terminal(z: u8) -> Self {
        Self {
            atom: None,
            z,
            ancestors: Vec::new(),
        }
    }

    fn root(mol: &Mol, ligand: Ligand, center: NodeIndex) -> Self {
        match ligand {
            Ligand::Atom(a) => Self {
                atom: Some(a),
                z: mol.atom(a).atomic_num,
                ancestors: vec![center],
            },
            Ligand::ImplicitH => Self::terminal(1),
        }
    }

    /// children sorted by descending atomic number
    fn children(&self, mol: &Mol) -> Vec<Node> {
        let Some(x) = self.atom else {
            return Vec::new();
        };
        let parent = self.ancestors.last().copied();
        let mut ret = Vec::new();
        for edge in mol.graph().edges(x) {
            let y = if edge.source() == x {
                edge.target()
            } else {
                edge.source()
            };
            let z = mol.atom(y).atomic_num;
            let duplicates = match edge.weight().order {
                BondOrder::Double => 1,
                BondOrder::Triple => 2,
                BondOrder::Single | BondOrder::Aromatic => 0,
            };
            if Some(y) != parent {
                if self.ancestors.contains(&y) {
                    // ring closure
                    ret.push(Node::terminal(z));
                    continue;
                }
                let mut ancestors = self.ancestors.clone();
                ancestors.push(x);
                ret.push(Node {
                    atom: Some(y),
                    z,
                    ancestors,
                });
            }
            ret.extend((0..duplicates).map(|_| Node::terminal(z)));
        }
        ret.extend((0..mol.atom(x).hydrogens).map(|_| Node::terminal(1)));
        ret.sort_by(|a, b| b.z.cmp(&a.z));
        ret
    }
}

fn compare_branches(mol: &Mol, a: &Node, b: &Node) -> Ordering {
    if a.z != b.z {
        return a.z.cmp(&b.z);
    }
    let mut level_a = vec![a.clone()];
    let mut level_b = vec![b.clone()];
    for _ in 0..MAX_SPHERES {
        let next_a: Vec<Vec<Node>> =
            level_a.iter().map(|n| n.children(mol)).collect();
        let next_b: Vec<Vec<Node>> =
            level_b.iter().map(|n| n.children(mol)).collect();
        for i in 0..next_a.len().max(next_b.len()) {
            let za: Vec<u8> = next_a
                .get(i)
                .map(|s| s.iter().map(|n| n.z).collect())
                .unwrap_or_default();
            let zb: Vec<u8> = next_b
                .get(i)
                .map(|s| s.iter().map(|n| n.z).collect())
                .unwrap_or_default();
            match za.cmp(&zb) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        level_a = next_a.into_iter().flatten().collect();
        level_b = next_b.into_iter().flatten().collect();
        if level_a.is_empty() && level_b.is_empty() {
            break;
        }
    }
    Ordering::Equal
}

/// indices of `ligands` from highest to lowest priority, or None on a tie
fn rank(mol: &Mol, center: NodeIndex, ligands: &[Ligand]) -> Option<Vec<usize>> {
    let nodes: Vec<Node> =
        ligands.iter().map(|&l| Node::root(mol, l, center)).collect();
    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            if compare_branches(mol, &nodes[i], &nodes[j]) == Ordering::Equal {
                return None;
            }
        }
    }
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|&i, &j| compare_branches(mol, &nodes[j], &nodes[i]));
    Some(order)
}

fn is_even_permutation(perm: &[usize]) -> bool {
    let mut inversions = 0;
    for i in 0..perm.len() {
        for j in i + 1..perm.len() {
            if perm[i] > perm[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 0
}

/// R/S labels for every tetrahedral centre whose ligands can be ranked
pub fn atom_labels(mol: &Mol) -> Vec<(NodeIndex, CipLabel)> {
    let mut ret = Vec::new();
    for t in mol.tetrahedral() {
        let Some(order) = rank(mol, t.center, &t.ligands) else {
            continue;
        };
        // `@` on [lowest, highest, second, third] is R
        let perm = [order[3], order[0], order[1], order[2]];
        let r = is_even_permutation(&perm) != t.clockwise;
        ret.push((t.center, if r { CipLabel::R } else { CipLabel::S }));
    }
    ret
}

/// E/Z labels for every double bond with a `/` `\` configuration
pub fn bond_labels(mol: &Mol) -> Vec<(EdgeIndex, CipLabel)> {
    let mut ret = Vec::new();
    for db in mol.double_bond_stereo() {
        let (a, b) = db.ends;
        let (ref_a, ref_b) = db.refs;
        let (Some(top_a), Some(top_b)) =
            (highest_substituent(mol, a, b), highest_substituent(mol, b, a))
        else {
            continue;
        };
        // flip once for each side where the reference is not the top ranked
        let same_side = db.cis ^ (top_a != ref_a) ^ (top_b != ref_b);
        ret.push((db.bond, if same_side { CipLabel::Z } else { CipLabel::E }));
    }
    ret
}

/// highest ranked neighbor of `end` other than `other`. implicit hydrogens
/// take part in the ranking but are never returned
fn highest_substituent(
    mol: &Mol,
    end: NodeIndex,
    other: NodeIndex,
) -> Option<NodeIndex> {
    let mut ligands: Vec<Ligand> = mol
        .neighbors(end)
        .into_iter()
        .filter(|&n| n != other)
        .map(Ligand::Atom)
        .collect();
    ligands.extend((0..mol.atom(end).hydrogens).map(|_| Ligand::ImplicitH));
    if ligands.len() == 1 {
        return match ligands[0] {
            Ligand::Atom(a) => Some(a),
            Ligand::ImplicitH => None,
        };
    }
    let order = rank(mol, end, &ligands)?;
    match ligands[order[0]] {
        Ligand::Atom(a) => Some(a),
        Ligand::ImplicitH => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_label(smiles: &str) -> Option<CipLabel> {
        let mol = Mol::from_smiles(smiles).unwrap();
        atom_labels(&mol).first().map(|&(_, l)| l)
    }

    fn bond_label(smiles: &str) -> Option<CipLabel> {
        let mol = Mol::from_smiles(smiles).unwrap();
        bond_labels(&mol).first().map(|&(_, l)| l)
    }

    #[test]
    fn alanine() {
        assert_eq!(atom_label("N[C@@H](C)C(=O)O"), Some(CipLabel::S));
        assert_eq!(atom_label("N[C@H](C)C(=O)O"), Some(CipLabel::R));
    }

    #[test]
    fn butanol() {
        assert_eq!(atom_label("CC[C@@H](C)O"), Some(CipLabel::R));
        assert_eq!(atom_label("CC[C@H](C)O"), Some(CipLabel::S));
    }

    #[test]
    fn explicit_hydrogen_ligand() {
        let mol = Mol::from_smiles("[H][C@@](N)(C)C(=O)O").unwrap();
        let stripped = mol.remove_hs().unwrap();
        assert_eq!(
            atom_labels(&mol).first().map(|&(_, l)| l),
            atom_labels(&stripped).first().map(|&(_, l)| l),
        );
    }

    #[test]
    fn ties_give_no_label() {
        assert_eq!(atom_label("C[C@H](C)O"), None);
        assert_eq!(bond_label("C/C(C)=C/F"), None);
    }

    #[test]
    fn double_bonds() {
        assert_eq!(bond_label("F/C=C/F"), Some(CipLabel::E));
        assert_eq!(bond_label(r"F/C=C\F"), Some(CipLabel::Z));
        // fluorine outranks the marked methyl on the left end
        assert_eq!(bond_label(r"C/C(F)=C/C"), Some(CipLabel::Z));
        assert_eq!(bond_label("FC=CF"), None);
    }

    #[test]
    fn label_text() {
        assert_eq!(CipLabel::R.to_string(), "R");
        assert_eq!(CipLabel::Z.to_string(), "Z");
    }
}
