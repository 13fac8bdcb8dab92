//! Just enough of the periodic table for reading SMILES and drawing labels.

/// Symbols indexed by atomic number. Index 0 is the SMILES wildcard `*`.
static SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt",
    "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

pub(crate) fn atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS.iter().position(|&s| s == symbol).map(|n| n as u8)
}

pub(crate) fn symbol(atomic_num: u8) -> &'static str {
    SYMBOLS.get(atomic_num as usize).copied().unwrap_or("?")
}

/// Valences used to fill in implicit hydrogens on organic-subset atoms.
/// Anything else gets no implicit hydrogens.
pub(crate) fn default_valences(atomic_num: u8) -> &'static [u8] {
    match atomic_num {
        5 => &[3],
        6 => &[4],
        7 => &[3],
        8 => &[2],
        15 => &[3, 5],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

/// Colour used for an element's label and its half of each bond.
pub(crate) fn color(atomic_num: u8) -> &'static str {
    match atomic_num {
        7 => "#0000FF",
        8 => "#FF0000",
        9 => "#33CCCC",
        15 => "#FF7F00",
        16 => "#CCCC00",
        17 => "#00CC00",
        35 => "#7F4C19",
        53 => "#A01EEF",
        5 => "#FFB5B5",
        _ => "#000000",
    }
}
