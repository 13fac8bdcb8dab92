//! Sanity checks run once hydrogens are known: no atom may exceed its
//! largest default valence, and every aromatic system needs a Kekulé form.

use log::debug;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::smiles::SmilesError;
use super::{element, Atom, Bond, BondOrder};

/// search steps allowed per aromatic system before it is accepted unchecked
const MATCH_BUDGET: usize = 100_000;

/// bond orders around `a`, aromatic bonds counted as single
fn explicit_valence(graph: &UnGraph<Atom, Bond>, a: NodeIndex) -> u8 {
    graph
        .edges(a)
        .map(|e| e.weight().order.valence())
        .fold(0, u8::saturating_add)
}

/// reject uncharged atoms bonded past their largest default valence.
/// elements without default valences are not checked
pub(crate) fn check_valences(graph: &UnGraph<Atom, Bond>) -> Result<(), SmilesError> {
    for a in graph.node_indices() {
        let atom = &graph[a];
        if atom.charge != 0 {
            continue;
        }
        let Some(&max) = element::default_valences(atom.atomic_num).last() else {
            continue;
        };
        let mut valence = explicit_valence(graph, a);
        if atom.bracket {
            valence = valence.saturating_add(atom.hydrogens);
        }
        if valence > max {
            return Err(SmilesError::Valence {
                atom: a.index(),
                valence,
                max,
            });
        }
    }
    Ok(())
}

/// whether aromatic atom `a` still needs a double bond inside its ring
fn needs_double(graph: &UnGraph<Atom, Bond>, a: NodeIndex) -> bool {
    let atom = &graph[a];
    let used = explicit_valence(graph, a).saturating_add(atom.hydrogens);
    let charge = i16::from(atom.charge);
    let target = element::default_valences(atom.atomic_num)
        .iter()
        .map(|&v| i16::from(v) + charge)
        .filter(|&v| v > 0)
        .find(|&v| v >= i16::from(used));
    match target {
        Some(t) => {
            let gap = t - i16::from(used);
            gap == 1 || (gap == 2 && atom.hydrogens == 0 && atom.charge != 0)
        }
        None => false,
    }
}

/// every aromatic atom that needs a double bond must get exactly one,
/// shared with an aromatic neighbor that also needs one
pub(crate) fn check_kekule(graph: &UnGraph<Atom, Bond>) -> Result<(), SmilesError> {
    let n = graph.node_count();
    let mut candidates = vec![false; n];
    for a in graph.node_indices() {
        candidates[a.index()] = graph[a].aromatic && needs_double(graph, a);
    }
    let adjacency: Vec<Vec<usize>> = graph
        .node_indices()
        .map(|a| {
            graph
                .edges(a)
                .filter(|e| e.weight().order == BondOrder::Aromatic)
                .map(|e| {
                    if e.source() == a {
                        e.target().index()
                    } else {
                        e.source().index()
                    }
                })
                .filter(|&b| candidates[b])
                .collect()
        })
        .collect();

    let mut partner: Vec<Option<usize>> = vec![None; n];
    let mut budget = MATCH_BUDGET;
    match pair_up(&adjacency, &candidates, &mut partner, 0, &mut budget) {
        Ok(()) => Ok(()),
        Err(Unmatched::Atom(atom)) => Err(SmilesError::Kekulize { atom }),
        Err(Unmatched::OutOfBudget) => {
            debug!("gave up kekulizing after {MATCH_BUDGET} steps");
            Ok(())
        }
    }
}

enum Unmatched {
    Atom(usize),
    OutOfBudget,
}

/// backtracking perfect matching over the candidates from `from` onward
fn pair_up(
    adjacency: &[Vec<usize>],
    candidates: &[bool],
    partner: &mut [Option<usize>],
    from: usize,
    budget: &mut usize,
) -> Result<(), Unmatched> {
    let Some(a) = (from..candidates.len())
        .find(|&i| candidates[i] && partner[i].is_none())
    else {
        return Ok(());
    };
    for &b in &adjacency[a] {
        if partner[b].is_some() {
            continue;
        }
        if *budget == 0 {
            return Err(Unmatched::OutOfBudget);
        }
        *budget -= 1;
        partner[a] = Some(b);
        partner[b] = Some(a);
        match pair_up(adjacency, candidates, partner, a + 1, budget) {
            Ok(()) => return Ok(()),
            Err(Unmatched::OutOfBudget) => return Err(Unmatched::OutOfBudget),
            Err(Unmatched::Atom(_)) => {
                partner[a] = None;
                partner[b] = None;
            }
        }
    }
    Err(Unmatched::Atom(a))
}
