//! Deterministic 2D coordinate generation.
//!
//! Ring systems are laid down whole as regular polygons the first time the
//! walk reaches them. Fused, spiro and bridged rings are attached to the part
//! of the system already placed. Everything else grows outward from placed
//! atoms: chains zig-zag, sp centres stay linear, and branches share the
//! largest free angle around their parent. Disconnected components are put
//! side by side, left to right in atom order.

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use petgraph::graph::NodeIndex;

use super::rings::RingInfo;
use super::{BondOrder, Mol, Point};

pub const BOND_LENGTH: f64 = 1.5;

/// horizontal space between disconnected components
const COMPONENT_GAP: f64 = 2.0 * BOND_LENGTH;

const DEG_30: f64 = PI / 6.0;
const DEG_60: f64 = PI / 3.0;
const DEG_120: f64 = 2.0 * PI / 3.0;

pub fn compute_2d_coords(mol: &Mol) -> Vec<Point> {
    let mut layout = Layout::new(mol);
    let mut coords = vec![Point::default(); mol.num_atoms()];
    let mut offset_x = 0.0;

    for component in components(mol) {
        layout.place_component(component[0]);
        let pts: Vec<Point> = component
            .iter()
            .map(|a| layout.pos[a.index()].unwrap_or_default())
            .collect();
        let (min, max) = bounds(&pts);
        let shift = Point::new(offset_x - min.x, -(min.y + max.y) / 2.0);
        for (a, p) in component.iter().zip(pts) {
            coords[a.index()] = p + shift;
        }
        offset_x += max.x - min.x + COMPONENT_GAP;
    }

    coords
}

/// connected components in order of their lowest atom, atoms sorted
fn components(mol: &Mol) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; mol.num_atoms()];
    let mut ret = Vec::new();
    for start in mol.atoms() {
        if seen[start.index()] {
            continue;
        }
        seen[start.index()] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(a) = queue.pop_front() {
            for b in mol.neighbors(a) {
                if !seen[b.index()] {
                    seen[b.index()] = true;
                    component.push(b);
                    queue.push_back(b);
                }
            }
        }
        component.sort();
        ret.push(component);
    }
    ret
}

fn bounds(pts: &[Point]) -> (Point, Point) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in pts {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    if pts.is_empty() {
        (Point::default(), Point::default())
    } else {
        (min, max)
    }
}

/// circumradius of a regular polygon with `n` sides of [BOND_LENGTH]
fn ring_radius(n: usize) -> f64 {
    BOND_LENGTH / (2.0 * (PI / n as f64).sin())
}

/// wrap an angle into (-PI, PI]
fn wrap(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

struct Layout<'a> {
    mol: &'a Mol,
    rings: Vec<Vec<NodeIndex>>,
    /// ring indices per ring system, smallest rings first
    systems: Vec<Vec<usize>>,
    atom_system: Vec<Option<usize>>,
    system_placed: Vec<bool>,
    pos: Vec<Option<Point>>,
}

impl<'a> Layout<'a> {
    fn new(mol: &'a Mol) -> Self {
        let rings = RingInfo::sssr(mol).rings().to_vec();

        // union rings that share an atom
        let mut parent: Vec<usize> = (0..rings.len()).collect();
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }
        for i in 0..rings.len() {
            for j in i + 1..rings.len() {
                if rings[i].iter().any(|a| rings[j].contains(a)) {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[rj.max(ri)] = ri.min(rj);
                    }
                }
            }
        }

        let mut systems: Vec<Vec<usize>> = Vec::new();
        let mut root_to_system = vec![None; rings.len()];
        let mut atom_system = vec![None; mol.num_atoms()];
        for i in 0..rings.len() {
            let root = find(&mut parent, i);
            let sys = *root_to_system[root].get_or_insert_with(|| {
                systems.push(Vec::new());
                systems.len() - 1
            });
            systems[sys].push(i);
            for a in &rings[i] {
                atom_system[a.index()] = Some(sys);
            }
        }

        Self {
            mol,
            system_placed: vec![false; systems.len()],
            rings,
            systems,
            atom_system,
            pos: vec![None; mol.num_atoms()],
        }
    }

    fn placed(&self, a: NodeIndex) -> Option<Point> {
        self.pos[a.index()]
    }

    fn place_component(&mut self, start: NodeIndex) {
        let mut queue = VecDeque::new();
        match self.atom_system[start.index()] {
            Some(sys) => {
                self.place_system(sys, None);
                queue.extend(self.system_atoms(sys));
            }
            None => {
                self.pos[start.index()] = Some(Point::default());
                queue.push_back(start);
            }
        }

        while let Some(a) = queue.pop_front() {
            let Some(pa) = self.placed(a) else {
                continue;
            };
            let unplaced: Vec<NodeIndex> = self
                .mol
                .neighbors(a)
                .into_iter()
                .filter(|&b| self.placed(b).is_none())
                .collect();
            if unplaced.is_empty() {
                continue;
            }
            let angles = self.substituent_angles(a, unplaced.len());
            for (b, angle) in unplaced.into_iter().zip(angles) {
                if self.placed(b).is_some() {
                    continue;
                }
                self.pos[b.index()] =
                    Some(pa + Point::from_angle(angle, BOND_LENGTH));
                match self.atom_system[b.index()] {
                    Some(sys) if !self.system_placed[sys] => {
                        self.place_system(sys, Some((b, angle)));
                        queue.extend(self.system_atoms(sys));
                    }
                    _ => queue.push_back(b),
                }
            }
        }
    }

    fn system_atoms(&self, sys: usize) -> Vec<NodeIndex> {
        let mut atoms: Vec<NodeIndex> = self.systems[sys]
            .iter()
            .flat_map(|&r| self.rings[r].iter().copied())
            .collect();
        atoms.sort();
        atoms.dedup();
        atoms
    }

    /// directions for `k` new neighbors of the placed atom `a`
    fn substituent_angles(&self, a: NodeIndex, k: usize) -> Vec<f64> {
        let pa = self.placed(a).unwrap_or_default();
        let placed: Vec<NodeIndex> = self
            .mol
            .neighbors(a)
            .into_iter()
            .filter(|&n| self.placed(n).is_some())
            .collect();

        match placed.as_slice() {
            [] if k <= 3 => {
                (0..k).map(|j| -DEG_30 + DEG_120 * j as f64).collect()
            }
            [] => (0..k).map(|j| TAU * j as f64 / k as f64).collect(),
            [p] if k == 1 && self.atom_system[a.index()].is_none() => {
                let pp = self.placed(*p).unwrap_or_default();
                let forward = (pa - pp).angle();
                if self.is_linear(a) {
                    return vec![forward];
                }
                let left = forward - DEG_60;
                let right = forward + DEG_60;
                // zig-zag away from the grandparent
                let grandparent = self
                    .mol
                    .neighbors(*p)
                    .into_iter()
                    .find(|&g| g != a && self.placed(g).is_some())
                    .and_then(|g| self.placed(g));
                let angle = match grandparent {
                    Some(g) => {
                        let dl = (pa + Point::from_angle(left, BOND_LENGTH))
                            .distance(g);
                        let dr = (pa + Point::from_angle(right, BOND_LENGTH))
                            .distance(g);
                        if dl > dr + 1e-9 {
                            left
                        } else {
                            right
                        }
                    }
                    None => right,
                };
                vec![angle]
            }
            _ => self.gap_angles(a, k),
        }
    }

    /// spread `k` directions evenly over the largest free angle around `a`
    fn gap_angles(&self, a: NodeIndex, k: usize) -> Vec<f64> {
        let pa = self.placed(a).unwrap_or_default();
        let mut angles: Vec<f64> = self
            .mol
            .neighbors(a)
            .into_iter()
            .filter_map(|n| self.placed(n))
            .map(|p| (p - pa).angle().rem_euclid(TAU))
            .collect();
        if angles.is_empty() {
            return (0..k).map(|j| TAU * j as f64 / k as f64).collect();
        }
        angles.sort_by(f64::total_cmp);

        let mut start = angles[0];
        let mut size = 0.0;
        for i in 0..angles.len() {
            let next = angles.get(i + 1).copied().unwrap_or(angles[0] + TAU);
            let gap = next - angles[i];
            if gap > size + 1e-9 {
                start = angles[i];
                size = gap;
            }
        }
        (1..=k)
            .map(|j| start + size * j as f64 / (k + 1) as f64)
            .collect()
    }

    /// two neighbors held by a triple bond or by two double bonds
    fn is_linear(&self, a: NodeIndex) -> bool {
        if self.mol.degree(a) != 2 {
            return false;
        }
        let orders: Vec<BondOrder> = self
            .mol
            .graph()
            .edges(a)
            .map(|e| e.weight().order)
            .collect();
        orders.contains(&BondOrder::Triple)
            || orders.iter().filter(|&&o| o == BondOrder::Double).count() == 2
    }

    /// lay out every ring of `sys`. with an anchor, the ring atom `b` is
    /// already placed and was reached along `angle`
    fn place_system(&mut self, sys: usize, anchor: Option<(NodeIndex, f64)>) {
        let ring_ids = self.systems[sys].clone();
        let Some(&first) = (match anchor {
            Some((b, _)) => ring_ids
                .iter()
                .filter(|&&r| self.rings[r].contains(&b))
                .min_by_key(|&&r| (self.rings[r].len(), r)),
            None => ring_ids.iter().min_by_key(|&&r| (self.rings[r].len(), r)),
        }) else {
            return;
        };

        let ring = self.rings[first].clone();
        let radius = ring_radius(ring.len());
        let (center, start, start_angle) = match anchor {
            Some((b, angle)) => {
                let pb = self.placed(b).unwrap_or_default();
                let idx = ring.iter().position(|&a| a == b).unwrap_or(0);
                (pb + Point::from_angle(angle, radius), idx, angle + PI)
            }
            None => (Point::default(), 0, FRAC_PI_2),
        };
        self.place_polygon(&ring, center, radius, start, start_angle);

        let mut done = vec![first];
        loop {
            let next = ring_ids
                .iter()
                .filter(|r| !done.contains(r))
                .map(|&r| {
                    let n = self.rings[r]
                        .iter()
                        .filter(|&&a| self.placed(a).is_some())
                        .count();
                    (n, r)
                })
                .filter(|&(n, _)| n > 0)
                .max_by_key(|&(n, r)| (n, Reverse(r)));
            let Some((_, r)) = next else {
                break;
            };
            self.place_ring(sys, r);
            done.push(r);
        }

        self.system_placed[sys] = true;
    }

    /// walk `ring` from index `start` counter-clockwise around `center`,
    /// leaving already placed atoms alone
    fn place_polygon(
        &mut self,
        ring: &[NodeIndex],
        center: Point,
        radius: f64,
        start: usize,
        start_angle: f64,
    ) {
        let n = ring.len();
        for i in 0..n {
            let a = ring[(start + i) % n];
            if self.pos[a.index()].is_none() {
                let angle = start_angle + TAU * i as f64 / n as f64;
                self.pos[a.index()] =
                    Some(center + Point::from_angle(angle, radius));
            }
        }
    }

    /// attach ring `r` to the placed part of ring system `sys`
    fn place_ring(&mut self, sys: usize, r: usize) {
        let ring = self.rings[r].clone();
        let n = ring.len();
        let placed: Vec<bool> =
            ring.iter().map(|&a| self.placed(a).is_some()).collect();
        let count = placed.iter().filter(|&&p| p).count();
        if count == n {
            return;
        }

        if count == 1 {
            // spiro: grow the ring into the largest free angle
            let Some(idx) = placed.iter().position(|&p| p) else {
                return;
            };
            let s = ring[idx];
            let ps = self.placed(s).unwrap_or_default();
            let angle = self.gap_angles(s, 1)[0];
            let radius = ring_radius(n);
            let center = ps + Point::from_angle(angle, radius);
            self.place_polygon(&ring, center, radius, idx, angle + PI);
            return;
        }

        let centroid = {
            let pts: Vec<Point> = self
                .system_atoms(sys)
                .into_iter()
                .filter_map(|a| self.placed(a))
                .collect();
            let sum = pts.iter().fold(Point::default(), |acc, &p| acc + p);
            sum * (1.0 / pts.len().max(1) as f64)
        };

        // runs of unplaced atoms, each bounded by two placed atoms
        let Some(first) = placed.iter().position(|&p| p) else {
            return;
        };
        let mut runs = Vec::new();
        let mut run = Vec::new();
        let mut prev = ring[first];
        for j in 1..=n {
            let a = ring[(first + j) % n];
            if placed[(first + j) % n] {
                if !run.is_empty() {
                    runs.push((prev, std::mem::take(&mut run), a));
                }
                prev = a;
            } else {
                run.push(a);
            }
        }

        for (s, run, t) in runs {
            self.place_arc(s, &run, t, centroid);
        }
    }

    /// place `run` on a circular arc from `s` to `t` bulging away from
    /// `centroid`
    fn place_arc(
        &mut self,
        s: NodeIndex,
        run: &[NodeIndex],
        t: NodeIndex,
        centroid: Point,
    ) {
        let ps = self.placed(s).unwrap_or_default();
        let pt = self.placed(t).unwrap_or_default();
        let m = run.len();
        let half = ps.distance(pt) / 2.0;
        let radius = ring_radius(m + 2).max(half);
        let mid = ps.midpoint(pt);
        let normal = (pt - ps).perp().normalized();
        let side = if dot(mid - centroid, normal) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let offset = (radius * radius - half * half).max(0.0).sqrt();
        let center = mid + normal * (offset * side);

        let phi_s = (ps - center).angle();
        let phi_t = (pt - center).angle();
        let short = wrap(phi_t - phi_s);
        let long = if short > 0.0 { short - TAU } else { short + TAU };
        let arc_mid = |sweep: f64| {
            center + Point::from_angle(phi_s + sweep / 2.0, radius)
        };
        let sweep = if arc_mid(long).distance(centroid)
            >= arc_mid(short).distance(centroid)
        {
            long
        } else {
            short
        };

        for (j, &a) in run.iter().enumerate() {
            let angle = phi_s + sweep * (j + 1) as f64 / (m + 1) as f64;
            self.pos[a.index()] =
                Some(center + Point::from_angle(angle, radius));
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn coords(smiles: &str) -> (Mol, Vec<Point>) {
        let mol = Mol::from_smiles(smiles).unwrap();
        let coords = compute_2d_coords(&mol);
        (mol, coords)
    }

    fn assert_bond_lengths(mol: &Mol, coords: &[Point], epsilon: f64) {
        for e in mol.bonds() {
            let (a, b) = mol.bond_endpoints(e);
            assert_abs_diff_eq!(
                coords[a.index()].distance(coords[b.index()]),
                BOND_LENGTH,
                epsilon = epsilon
            );
        }
    }

    fn min_separation(coords: &[Point]) -> f64 {
        let mut min = f64::INFINITY;
        for i in 0..coords.len() {
            for j in i + 1..coords.len() {
                min = min.min(coords[i].distance(coords[j]));
            }
        }
        min
    }

    #[test]
    fn chain_zig_zags() {
        let (mol, c) = coords("CCCCCC");
        assert_bond_lengths(&mol, &c, 1e-9);
        // every bond angle is 120 degrees
        for i in 1..5 {
            let a = (c[i - 1] - c[i]).angle();
            let b = (c[i + 1] - c[i]).angle();
            assert_abs_diff_eq!(wrap(a - b).abs(), DEG_120, epsilon = 1e-9);
        }
        // and the chain runs horizontally
        assert_abs_diff_eq!(c[0].y, c[2].y, epsilon = 1e-9);
        assert_abs_diff_eq!(c[1].y, c[3].y, epsilon = 1e-9);
    }

    #[test]
    fn triple_bond_is_linear() {
        let (_, c) = coords("CC#CC");
        let a = (c[1] - c[2]).angle();
        let b = (c[3] - c[2]).angle();
        assert_abs_diff_eq!(wrap(a - b).abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn benzene_is_regular() {
        let (mol, c) = coords("c1ccccc1");
        assert_bond_lengths(&mol, &c, 1e-9);
        let center = c.iter().fold(Point::default(), |acc, &p| acc + p) * (1.0 / 6.0);
        for p in &c {
            assert_abs_diff_eq!(p.distance(center), BOND_LENGTH, epsilon = 1e-9);
        }
    }

    #[test]
    fn fused_rings() {
        let (mol, c) = coords("c1ccc2ccccc2c1");
        assert_bond_lengths(&mol, &c, 1e-9);
        assert!(min_separation(&c) > 0.9 * BOND_LENGTH);
    }

    #[test]
    fn spiro_rings() {
        let (mol, c) = coords("C1CCC2(CC1)CCCC2");
        assert_bond_lengths(&mol, &c, 1e-9);
        assert!(min_separation(&c) > 0.5 * BOND_LENGTH);
    }

    #[test]
    fn substituted_ring() {
        let (mol, c) = coords("Cc1ccc(O)cc1CC(=O)O");
        assert_bond_lengths(&mol, &c, 1e-9);
        assert!(min_separation(&c) > 0.5 * BOND_LENGTH);
    }

    #[test]
    fn bridged_rings_get_finite_coordinates() {
        let (mol, c) = coords("C1CC2CCC1C2");
        assert_eq!(c.len(), mol.num_atoms());
        assert!(c.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(min_separation(&c) > 0.1);
    }

    #[test]
    fn components_side_by_side() {
        let (_, c) = coords("CCO.[Na+].c1ccccc1");
        // ethanol, then sodium, then benzene, left to right
        let max_x = |r: std::ops::Range<usize>| {
            c[r].iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
        };
        let min_x = |r: std::ops::Range<usize>| {
            c[r].iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
        };
        assert!(max_x(0..3) < min_x(3..4));
        assert!(max_x(3..4) < min_x(4..10));
        assert_abs_diff_eq!(c[3].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn layout_is_deterministic() {
        let (_, a) = coords("CC(C)(C)c1ccc2c(c1)OCO2");
        let (_, b) = coords("CC(C)(C)c1ccc2c(c1)OCO2");
        assert_eq!(a, b);
    }
}
