use std::collections::HashMap;

/// Element symbols, indexed by Z. Index 0 is the neutron.
pub const SYMBOLS: [&str; 119] = [
    "n", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

lazy_static! {
    static ref Z_BY_SYMBOL: HashMap<&'static str, usize> = {
        let mut map = HashMap::new();
        for (z, symbol) in SYMBOLS.iter().enumerate().skip(1) {
            map.insert(*symbol, z);
        }
        map
    };
}

pub fn symbol(z: usize) -> &'static str {
    SYMBOLS.get(z).copied().unwrap_or("?")
}

/// Z of an element symbol. Plain atomic numbers are accepted too.
pub fn find_z(name: &str) -> Option<usize> {
    let name = name.trim();
    if let Some(z) = Z_BY_SYMBOL.get(name) {
        return Some(*z);
    }
    match name.parse::<usize>() {
        Ok(z) if z >= 1 && z < SYMBOLS.len() => Some(z),
        _ => None,
    }
}
