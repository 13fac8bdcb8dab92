//! SMILES reader. Tokenizes the string, wires atoms and bonds together in a
//! single pass, then fills in implicit hydrogens and stereo descriptors.

use std::collections::BTreeMap;

use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

use super::{
    element, rings, valence, Atom, Bond, BondOrder, DoubleBondStereo, Ligand, Mol,
    Tetrahedral,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    EmptyInput,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("invalid element '{text}' at position {pos}")]
    InvalidElement { pos: usize, text: String },
    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },
    #[error("invalid isotope at position {pos}")]
    InvalidIsotope { pos: usize },
    #[error("invalid charge at position {pos}")]
    InvalidCharge { pos: usize },
    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },
    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u16 },
    #[error("invalid ring bond {digit} at position {pos}")]
    InvalidRingBond { digit: u16, pos: usize },
    #[error("conflicting bond types on ring closure {digit}")]
    RingBondConflict { digit: u16 },
    #[error("bond at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },
    #[error("non-ring atom {atom} marked aromatic")]
    NonRingAromatic { atom: usize },
    #[error("invalid chirality class at position {pos}")]
    InvalidChirality { pos: usize },
    #[error("atom {atom} has valence {valence}, more than {max} allowed")]
    Valence { atom: usize, valence: u8, max: u8 },
    #[error("cannot kekulize aromatic atom {atom}")]
    Kekulize { atom: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondToken {
    Single,
    Double,
    Triple,
    Aromatic,
    Up,
    Down,
}

impl BondToken {
    fn as_char(self) -> char {
        match self {
            BondToken::Single => '-',
            BondToken::Double => '=',
            BondToken::Triple => '#',
            BondToken::Aromatic => ':',
            BondToken::Up => '/',
            BondToken::Down => '\\',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chirality {
    None,
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, PartialEq)]
struct AtomToken {
    atomic_num: u8,
    aromatic: bool,
    isotope: u16,
    chirality: Chirality,
    hcount: u8,
    charge: i8,
    bracket: bool,
}

impl AtomToken {
    fn organic(atomic_num: u8, aromatic: bool) -> Self {
        Self {
            atomic_num,
            aromatic,
            isotope: 0,
            chirality: Chirality::None,
            hcount: 0,
            charge: 0,
            bracket: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(AtomToken),
    Bond(BondToken, usize),
    Ring { digit: u16, pos: usize },
    Open(usize),
    Close(usize),
    Dot(usize),
}

/// parse `input` into a [Mol]. surrounding whitespace is ignored
pub fn parse(input: &str) -> Result<Mol, SmilesError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenize(trimmed)?;
    build(&tokens)
}

fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let pos = i;
        let ch = chars[i];
        i += 1;
        let token = match ch {
            '[' => {
                let (atom, next) = bracket_atom(&chars, pos)?;
                i = next;
                Token::Atom(atom)
            }
            'B' if chars.get(i) == Some(&'r') => {
                i += 1;
                Token::Atom(AtomToken::organic(35, false))
            }
            'C' if chars.get(i) == Some(&'l') => {
                i += 1;
                Token::Atom(AtomToken::organic(17, false))
            }
            'B' => Token::Atom(AtomToken::organic(5, false)),
            'C' => Token::Atom(AtomToken::organic(6, false)),
            'N' => Token::Atom(AtomToken::organic(7, false)),
            'O' => Token::Atom(AtomToken::organic(8, false)),
            'P' => Token::Atom(AtomToken::organic(15, false)),
            'S' => Token::Atom(AtomToken::organic(16, false)),
            'F' => Token::Atom(AtomToken::organic(9, false)),
            'I' => Token::Atom(AtomToken::organic(53, false)),
            '*' => Token::Atom(AtomToken::organic(0, false)),
            'b' => Token::Atom(AtomToken::organic(5, true)),
            'c' => Token::Atom(AtomToken::organic(6, true)),
            'n' => Token::Atom(AtomToken::organic(7, true)),
            'o' => Token::Atom(AtomToken::organic(8, true)),
            'p' => Token::Atom(AtomToken::organic(15, true)),
            's' => Token::Atom(AtomToken::organic(16, true)),
            '-' => Token::Bond(BondToken::Single, pos),
            '=' => Token::Bond(BondToken::Double, pos),
            '#' => Token::Bond(BondToken::Triple, pos),
            ':' => Token::Bond(BondToken::Aromatic, pos),
            '/' => Token::Bond(BondToken::Up, pos),
            '\\' => Token::Bond(BondToken::Down, pos),
            '(' => Token::Open(pos),
            ')' => Token::Close(pos),
            '.' => Token::Dot(pos),
            '%' => {
                let digits: Option<Vec<u32>> = chars
                    .get(i..i + 2)
                    .map(|ds| ds.iter().filter_map(|d| d.to_digit(10)).collect());
                match digits.as_deref() {
                    Some([d1, d2]) => {
                        i += 2;
                        Token::Ring {
                            digit: (d1 * 10 + d2) as u16,
                            pos,
                        }
                    }
                    _ => return Err(SmilesError::UnexpectedChar { pos, ch }),
                }
            }
            d @ '0'..='9' => Token::Ring {
                digit: d.to_digit(10).unwrap_or_default() as u16,
                pos,
            },
            ch => return Err(SmilesError::UnexpectedChar { pos, ch }),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn bracket_atom(
    chars: &[char],
    start: usize,
) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;
    let unclosed = SmilesError::UnclosedBracket { pos: start };

    let mut isotope: u16 = 0;
    while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
        isotope = isotope
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: i })?;
        i += 1;
    }

    let (atomic_num, aromatic) = bracket_element(chars, &mut i)?;

    let mut chirality = Chirality::None;
    if chars.get(i) == Some(&'@') {
        i += 1;
        chirality = Chirality::CounterClockwise;
        if chars.get(i) == Some(&'@') {
            i += 1;
            chirality = Chirality::Clockwise;
        } else if chars.get(i).is_some_and(|c| c.is_ascii_uppercase())
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_uppercase())
        {
            // @TH1/@TH2 are spelled-out @/@@; the other classes are skipped
            let class: String = chars[i..i + 2].iter().collect();
            let class_pos = i;
            i += 2;
            let mut n: u32 = 0;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                n = n
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(d))
                    .ok_or(SmilesError::InvalidChirality { pos: class_pos })?;
                i += 1;
            }
            chirality = match (class.as_str(), n) {
                ("TH", 1) => Chirality::CounterClockwise,
                ("TH", 2) => Chirality::Clockwise,
                _ => Chirality::None,
            };
        }
    }

    let mut hcount = 0;
    if chars.get(i) == Some(&'H') {
        i += 1;
        hcount = 1;
        if let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            hcount = d as u8;
            i += 1;
        }
    }

    let charge = bracket_charge(chars, &mut i)?;

    if chars.get(i) == Some(&':') {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    if chars.get(i) != Some(&']') {
        return Err(unclosed);
    }

    Ok((
        AtomToken {
            atomic_num,
            aromatic,
            isotope,
            chirality,
            hcount,
            charge,
            bracket: true,
        },
        i + 1,
    ))
}

fn bracket_element(
    chars: &[char],
    i: &mut usize,
) -> Result<(u8, bool), SmilesError> {
    let pos = *i;
    let first = *chars.get(pos).ok_or(SmilesError::UnclosedBracket {
        pos: pos.saturating_sub(1),
    })?;
    let second = chars.get(pos + 1).copied();

    if first == '*' {
        *i += 1;
        return Ok((0, false));
    }

    if first.is_ascii_lowercase() {
        if let Some(s) = second {
            let pair: String = [first, s].iter().collect();
            if let Some(n) = ["se", "as", "te"]
                .contains(&pair.as_str())
                .then(|| element::atomic_number(&capitalize(&pair)))
                .flatten()
            {
                *i += 2;
                return Ok((n, true));
            }
        }
        if let Some(n) = ['b', 'c', 'n', 'o', 'p', 's']
            .contains(&first)
            .then(|| element::atomic_number(&first.to_ascii_uppercase().to_string()))
            .flatten()
        {
            *i += 1;
            return Ok((n, true));
        }
    }

    if first.is_ascii_uppercase() {
        if let Some(s) = second.filter(char::is_ascii_lowercase) {
            let pair: String = [first, s].iter().collect();
            if let Some(n) = element::atomic_number(&pair) {
                *i += 2;
                return Ok((n, false));
            }
        }
        if let Some(n) = element::atomic_number(&first.to_string()) {
            *i += 1;
            return Ok((n, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos,
        text: first.to_string(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn bracket_charge(chars: &[char], i: &mut usize) -> Result<i8, SmilesError> {
    let pos = *i;
    let sign: i8 = match chars.get(pos) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let symbol = chars[pos];
    *i += 1;

    let mut magnitude: i8 = 1;
    if chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
        magnitude = 0;
        while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as i8))
                .ok_or(SmilesError::InvalidCharge { pos })?;
            *i += 1;
        }
    } else {
        while chars.get(*i) == Some(&symbol) {
            magnitude = magnitude
                .checked_add(1)
                .ok_or(SmilesError::InvalidCharge { pos })?;
            *i += 1;
        }
    }
    Ok(sign * magnitude)
}

struct PendingAtom {
    token: AtomToken,
    /// whether the atom was bonded to the previous atom when it was read
    has_preceding: bool,
    /// neighbors in SMILES order. ring openings reserve a slot that is filled
    /// in when the ring closes
    neighbors: Vec<Option<usize>>,
}

struct RawBond {
    from: usize,
    to: usize,
    token: Option<BondToken>,
}

fn build(tokens: &[Token]) -> Result<Mol, SmilesError> {
    let mut atoms: Vec<PendingAtom> = Vec::new();
    let mut bonds: Vec<RawBond> = Vec::new();
    let mut branches: Vec<(usize, usize)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending: Option<(BondToken, usize)> = None;
    // digit -> (atom, bond token, neighbor slot)
    let mut open_rings: BTreeMap<u16, (usize, Option<BondToken>, usize)> =
        BTreeMap::new();

    for token in tokens {
        match token {
            Token::Atom(tok) => {
                let idx = atoms.len();
                let mut atom = PendingAtom {
                    token: tok.clone(),
                    has_preceding: false,
                    neighbors: Vec::new(),
                };
                if let Some(prev) = current {
                    bonds.push(RawBond {
                        from: prev,
                        to: idx,
                        token: pending.take().map(|(b, _)| b),
                    });
                    atoms[prev].neighbors.push(Some(idx));
                    atom.neighbors.push(Some(prev));
                    atom.has_preceding = true;
                } else if let Some((_, pos)) = pending {
                    return Err(SmilesError::DanglingBond { pos });
                }
                atoms.push(atom);
                current = Some(idx);
            }
            Token::Bond(b, pos) => {
                if current.is_none() || pending.is_some() {
                    return Err(SmilesError::UnexpectedChar {
                        pos: *pos,
                        ch: b.as_char(),
                    });
                }
                pending = Some((*b, *pos));
            }
            Token::Ring { digit, pos } => {
                let digit = *digit;
                let pos = *pos;
                let cur =
                    current.ok_or(SmilesError::InvalidRingBond { digit, pos })?;
                let bond = pending.take().map(|(b, _)| b);
                if let Some((other, other_bond, slot)) =
                    open_rings.remove(&digit)
                {
                    let duplicate = bonds.iter().any(|rb| {
                        (rb.from == other && rb.to == cur)
                            || (rb.from == cur && rb.to == other)
                    });
                    if other == cur || duplicate {
                        return Err(SmilesError::InvalidRingBond { digit, pos });
                    }
                    let token = match (other_bond, bond) {
                        (None, None) => None,
                        (Some(b), None) | (None, Some(b)) => Some(b),
                        (Some(a), Some(b)) if a == b => Some(a),
                        _ => return Err(SmilesError::RingBondConflict { digit }),
                    };
                    bonds.push(RawBond {
                        from: other,
                        to: cur,
                        token,
                    });
                    atoms[other].neighbors[slot] = Some(cur);
                    atoms[cur].neighbors.push(Some(other));
                } else {
                    let slot = atoms[cur].neighbors.len();
                    atoms[cur].neighbors.push(None);
                    open_rings.insert(digit, (cur, bond, slot));
                }
            }
            Token::Open(pos) => {
                if let Some((_, p)) = pending {
                    return Err(SmilesError::DanglingBond { pos: p });
                }
                let cur =
                    current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                branches.push((cur, *pos));
            }
            Token::Close(pos) => {
                if let Some((_, p)) = pending {
                    return Err(SmilesError::DanglingBond { pos: p });
                }
                let (atom, _) = branches
                    .pop()
                    .ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                current = Some(atom);
            }
            Token::Dot(_) => {
                if let Some((_, p)) = pending {
                    return Err(SmilesError::DanglingBond { pos: p });
                }
                current = None;
            }
        }
    }

    if let Some((_, pos)) = pending {
        return Err(SmilesError::DanglingBond { pos });
    }
    if let Some(&(_, pos)) = branches.last() {
        return Err(SmilesError::UnmatchedParen { pos });
    }
    if let Some(&digit) = open_rings.keys().next() {
        return Err(SmilesError::UnclosedRing { digit });
    }

    let mut graph = UnGraph::with_capacity(atoms.len(), bonds.len());
    for pa in &atoms {
        let t = &pa.token;
        graph.add_node(Atom {
            atomic_num: t.atomic_num,
            aromatic: t.aromatic,
            isotope: t.isotope,
            charge: t.charge,
            hydrogens: t.hcount,
            bracket: t.bracket,
        });
    }
    for rb in &bonds {
        let order = match rb.token {
            Some(BondToken::Single | BondToken::Up | BondToken::Down) => {
                BondOrder::Single
            }
            Some(BondToken::Double) => BondOrder::Double,
            Some(BondToken::Triple) => BondOrder::Triple,
            Some(BondToken::Aromatic) => BondOrder::Aromatic,
            None if atoms[rb.from].token.aromatic
                && atoms[rb.to].token.aromatic =>
            {
                BondOrder::Aromatic
            }
            None => BondOrder::Single,
        };
        graph.add_edge(
            NodeIndex::new(rb.from),
            NodeIndex::new(rb.to),
            Bond { order },
        );
    }

    fill_implicit_hydrogens(&mut graph, &atoms);
    valence::check_valences(&graph)?;
    valence::check_kekule(&graph)?;

    let tetrahedral = tetrahedral_centers(&atoms);
    let double_bonds = double_bond_stereo(&graph, &bonds);
    let mol = Mol::from_parts(graph, tetrahedral, double_bonds);

    let in_ring = rings::ring_atoms(&mol);
    if let Some(atom) = mol
        .atoms()
        .find(|&a| mol.atom(a).aromatic && !in_ring[a.index()])
    {
        return Err(SmilesError::NonRingAromatic { atom: atom.index() });
    }

    Ok(mol)
}

fn fill_implicit_hydrogens(
    graph: &mut UnGraph<Atom, Bond>,
    atoms: &[PendingAtom],
) {
    for (i, pa) in atoms.iter().enumerate() {
        if pa.token.bracket {
            continue;
        }
        let idx = NodeIndex::new(i);
        let used: u8 = graph
            .edges(idx)
            .map(|e| e.weight().order.valence())
            .fold(0, u8::saturating_add);
        let valences = element::default_valences(pa.token.atomic_num);
        // aromatic atoms only take their lowest valence, one unit of which
        // goes to the ring
        let hydrogens = if pa.token.aromatic {
            valences
                .first()
                .map_or(0, |v| v.saturating_sub(used.saturating_add(1)))
        } else {
            valences
                .iter()
                .find(|&&v| v >= used)
                .map_or(0, |v| v - used)
        };
        graph[idx].hydrogens = hydrogens;
    }
}

fn tetrahedral_centers(atoms: &[PendingAtom]) -> Vec<Tetrahedral> {
    let mut ret = Vec::new();
    for (i, pa) in atoms.iter().enumerate() {
        if pa.token.chirality == Chirality::None {
            continue;
        }
        let mut ligands: Vec<Ligand> = pa
            .neighbors
            .iter()
            .flatten()
            .map(|&n| Ligand::Atom(NodeIndex::new(n)))
            .collect();
        // an implicit hydrogen comes right after the preceding atom
        if pa.token.hcount == 1 {
            let at = usize::from(pa.has_preceding).min(ligands.len());
            ligands.insert(at, Ligand::ImplicitH);
        }
        match <[Ligand; 4]>::try_from(ligands) {
            Ok(ligands) => ret.push(Tetrahedral {
                center: NodeIndex::new(i),
                ligands,
                clockwise: pa.token.chirality == Chirality::Clockwise,
            }),
            Err(ligands) => debug!(
                "ignoring chirality on atom {i} with {} ligands",
                ligands.len()
            ),
        }
    }
    ret
}

/// find the first `/` or `\` bond on `end` that does not lead to `other`,
/// returning the neighbor and whether it points up when the bond is read
/// toward the double bond (left side) or away from it (right side)
fn directional_neighbor(
    bonds: &[RawBond],
    end: usize,
    other: usize,
    left: bool,
) -> Option<(usize, bool)> {
    bonds.iter().find_map(|rb| {
        let up = match rb.token {
            Some(BondToken::Up) => true,
            Some(BondToken::Down) => false,
            _ => return None,
        };
        let (neighbor, written_from_end) = if rb.from == end && rb.to != other {
            (rb.to, true)
        } else if rb.to == end && rb.from != other {
            (rb.from, false)
        } else {
            return None;
        };
        let as_written = written_from_end != left;
        Some((neighbor, if as_written { up } else { !up }))
    })
}

fn double_bond_stereo(
    graph: &UnGraph<Atom, Bond>,
    bonds: &[RawBond],
) -> Vec<DoubleBondStereo> {
    let mut ret = Vec::new();
    for (e, rb) in bonds.iter().enumerate() {
        if graph[EdgeIndex::new(e)].order != BondOrder::Double {
            continue;
        }
        let left = directional_neighbor(bonds, rb.from, rb.to, true);
        let right = directional_neighbor(bonds, rb.to, rb.from, false);
        if let (Some((l, l_up)), Some((r, r_up))) = (left, right) {
            ret.push(DoubleBondStereo {
                bond: EdgeIndex::new(e),
                ends: (NodeIndex::new(rb.from), NodeIndex::new(rb.to)),
                refs: (NodeIndex::new(l), NodeIndex::new(r)),
                cis: l_up != r_up,
            });
        }
    }
    ret
}
