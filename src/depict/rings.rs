//! Smallest set of smallest rings, from Horton candidate cycles reduced to
//! an independent basis over GF(2).

use std::collections::VecDeque;

use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;

use super::Mol;

#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<NodeIndex>>,
}

impl RingInfo {
    pub fn sssr(mol: &Mol) -> Self {
        let expected = expected_ring_count(mol);
        if expected == 0 {
            return Self::default();
        }

        let num_edges = mol.num_bonds();
        let mut basis: Vec<Vec<u64>> = Vec::with_capacity(expected);
        let mut rings = Vec::with_capacity(expected);
        for ring in candidates(mol) {
            if rings.len() >= expected {
                break;
            }
            let bv = edge_bitvector(mol, &ring, num_edges);
            if try_add_to_basis(&mut basis, bv) {
                rings.push(ring);
            }
        }

        Self { rings }
    }

    /// rings in path order: consecutive atoms are bonded, and so are the
    /// last and the first
    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }

    pub fn num_rings(&self) -> usize {
        self.rings.len()
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring.contains(&atom))
    }

    pub fn is_ring_bond(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.rings.iter().any(|ring| ring_has_bond(ring, a, b))
    }

    /// indices into [Self::rings] of the rings containing the bond `a`-`b`
    pub fn bond_rings(&self, a: NodeIndex, b: NodeIndex) -> Vec<usize> {
        self.rings
            .iter()
            .enumerate()
            .filter(|(_, ring)| ring_has_bond(ring, a, b))
            .map(|(i, _)| i)
            .collect()
    }
}

/// flags each atom that belongs to at least one ring
pub fn ring_atoms(mol: &Mol) -> Vec<bool> {
    let info = RingInfo::sssr(mol);
    let mut ret = vec![false; mol.num_atoms()];
    for ring in info.rings() {
        for a in ring {
            ret[a.index()] = true;
        }
    }
    ret
}

/// the cyclomatic number `E - V + C`
pub fn expected_ring_count(mol: &Mol) -> usize {
    let c = connected_components(mol.graph());
    (mol.num_bonds() + c).saturating_sub(mol.num_atoms())
}

fn ring_has_bond(ring: &[NodeIndex], a: NodeIndex, b: NodeIndex) -> bool {
    let len = ring.len();
    (0..len).any(|i| {
        let j = (i + 1) % len;
        (ring[i] == a && ring[j] == b) || (ring[i] == b && ring[j] == a)
    })
}

/// BFS distances and predecessors from `source`
fn bfs(mol: &Mol, source: NodeIndex) -> (Vec<u32>, Vec<Option<NodeIndex>>) {
    let n = mol.num_atoms();
    let mut dist = vec![u32::MAX; n];
    let mut pred = vec![None; n];
    let mut queue = VecDeque::new();
    dist[source.index()] = 0;
    queue.push_back(source);
    while let Some(x) = queue.pop_front() {
        for y in mol.neighbors(x) {
            if dist[y.index()] == u32::MAX {
                dist[y.index()] = dist[x.index()] + 1;
                pred[y.index()] = Some(x);
                queue.push_back(y);
            }
        }
    }
    (dist, pred)
}

/// path from `root` to `target` following the BFS tree rooted at `root`
fn path_to(
    pred: &[Option<NodeIndex>],
    root: NodeIndex,
    target: NodeIndex,
) -> Vec<NodeIndex> {
    let mut path = vec![target];
    let mut cur = target;
    while cur != root {
        match pred[cur.index()] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Horton's candidate set: for every atom `w` and bond `u`-`v`, the cycle
/// made of the shortest paths `w..u`, `w..v` and the bond, when the two paths
/// only meet at `w`.
fn candidates(mol: &Mol) -> Vec<Vec<NodeIndex>> {
    let trees: Vec<_> = mol.atoms().map(|w| bfs(mol, w)).collect();
    let mut ret = Vec::new();

    for e in mol.bonds() {
        let (u, v) = mol.bond_endpoints(e);
        for w in mol.atoms() {
            let (dist, pred) = &trees[w.index()];
            if dist[u.index()] == u32::MAX || dist[v.index()] == u32::MAX {
                continue;
            }
            let size = dist[u.index()] as usize + dist[v.index()] as usize + 1;
            if size < 3 {
                continue;
            }
            let path_u = path_to(pred, w, u);
            let path_v = path_to(pred, w, v);
            if path_u[1..].iter().any(|a| path_v[1..].contains(a)) {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            ret.push(normalize(&ring));
        }
    }

    ret.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    ret.dedup();
    ret
}

/// rotate so the lowest index comes first, walking toward its lower
/// neighbor
fn normalize(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    let len = ring.len();
    let start = (0..len).min_by_key(|&i| ring[i]).unwrap_or(0);
    let next = ring[(start + 1) % len];
    let prev = ring[(start + len - 1) % len];
    if next <= prev {
        (0..len).map(|i| ring[(start + i) % len]).collect()
    } else {
        (0..len).map(|i| ring[(start + len - i) % len]).collect()
    }
}

fn edge_bitvector(mol: &Mol, ring: &[NodeIndex], num_edges: usize) -> Vec<u64> {
    let mut bv = vec![0u64; num_edges.div_ceil(64)];
    let len = ring.len();
    for i in 0..len {
        if let Some(e) = mol.bond_between(ring[i], ring[(i + 1) % len]) {
            let idx = e.index();
            bv[idx / 64] ^= 1u64 << (idx % 64);
        }
    }
    bv
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .rev()
        .find(|(_, &w)| w != 0)
        .map(|(i, &w)| i * 64 + 63 - w.leading_zeros() as usize)
}

/// gaussian elimination over GF(2). the basis is kept with distinct leading
/// bits; returns whether `bv` was independent and got added
fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, mut bv: Vec<u64>) -> bool {
    loop {
        let Some(lead) = leading_bit(&bv) else {
            return false;
        };
        match basis.iter().find(|b| leading_bit(b) == Some(lead)) {
            Some(b) => {
                for (w, bw) in bv.iter_mut().zip(b) {
                    *w ^= bw;
                }
            }
            None => {
                basis.push(bv);
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_sizes(smiles: &str) -> Vec<usize> {
        let mol = Mol::from_smiles(smiles).unwrap();
        let mut sizes: Vec<_> =
            RingInfo::sssr(&mol).rings().iter().map(Vec::len).collect();
        sizes.sort();
        sizes
    }

    #[test]
    fn acyclic() {
        assert!(ring_sizes("CCCC").is_empty());
    }

    #[test]
    fn single_rings() {
        assert_eq!(ring_sizes("c1ccccc1"), vec![6]);
        assert_eq!(ring_sizes("C1CC1"), vec![3]);
    }

    #[test]
    fn fused_spiro_and_bridged() {
        assert_eq!(ring_sizes("c1ccc2ccccc2c1"), vec![6, 6]);
        assert_eq!(ring_sizes("C1CCC2(CC1)CCCC2"), vec![5, 6]);
        assert_eq!(ring_sizes("C1CC2CCC1C2"), vec![5, 5]);
        // cubane
        assert_eq!(ring_sizes("C12C3C4C1C5C2C3C45"), vec![4, 4, 4, 4, 4]);
    }

    #[test]
    fn rings_are_in_path_order() {
        let mol = Mol::from_smiles("C1CC2CCC1C2").unwrap();
        for ring in RingInfo::sssr(&mol).rings() {
            for i in 0..ring.len() {
                let j = (i + 1) % ring.len();
                assert!(mol.bond_between(ring[i], ring[j]).is_some());
            }
        }
    }

    #[test]
    fn ring_membership() {
        let mol = Mol::from_smiles("c1ccccc1CC").unwrap();
        assert_eq!(
            ring_atoms(&mol),
            vec![true, true, true, true, true, true, false, false]
        );
        let info = RingInfo::sssr(&mol);
        assert!(info.is_ring_bond(NodeIndex::new(0), NodeIndex::new(5)));
        assert!(!info.is_ring_bond(NodeIndex::new(5), NodeIndex::new(6)));
    }
}
