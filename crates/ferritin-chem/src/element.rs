//! Element lookup and valence tables.
use pdbtbx::Element;

pub const HYDROGEN: u8 = 1;
pub const BORON: u8 = 5;
pub const CARBON: u8 = 6;
pub const NITROGEN: u8 = 7;
pub const OXYGEN: u8 = 8;
pub const PHOSPHORUS: u8 = 15;
pub const SULFUR: u8 = 16;
pub const SELENIUM: u8 = 34;
pub const TELLURIUM: u8 = 52;

/// Atomic number for an element symbol such as `C`, `Cl` or `se` (case-insensitive).
pub fn atomic_number(symbol: &str) -> Option<u8> {
    (1..=118usize)
        .find(|&z| Element::new(z).is_some_and(|e| e.symbol().eq_ignore_ascii_case(symbol)))
        .map(|z| z as u8)
}

/// Element symbol, e.g. `Cl` for 17.
pub fn symbol(atomic_number: u8) -> String {
    match Element::new(atomic_number as usize) {
        Some(e) => {
            let mut chars = e.symbol().chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        }
        None => "*".to_string(),
    }
}

/// Nominal isotope mass number used for isotope invariants.
pub fn nominal_mass(atomic_number: u8) -> u16 {
    #[rustfmt::skip]
    let mass = match atomic_number {
        1 => 1, 5 => 11, 6 => 12, 7 => 14, 8 => 16, 9 => 19,
        14 => 28, 15 => 31, 16 => 32, 17 => 35, 34 => 79, 35 => 80, 53 => 127,
        z => 2 * z as u16,
    };
    mass
}

/// Atoms that may be written without brackets.
pub fn is_organic_subset(atomic_number: u8) -> bool {
    matches!(atomic_number, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
}

/// Atoms that may be written as bare lowercase aromatic symbols.
pub fn is_aromatic_organic(atomic_number: u8) -> bool {
    matches!(atomic_number, 5 | 6 | 7 | 8 | 15 | 16)
}

/// Valences used to derive implicit hydrogens of organic subset atoms.
#[rustfmt::skip]
pub fn default_valences(atomic_number: u8) -> &'static [u8] {
    match atomic_number {
        5 => &[3],
        6 => &[4],
        7 | 15 => &[3, 5],
        8 => &[2],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

/// Permitted total valences of a neutral element. Charged atoms are looked up
/// through their isoelectronic neighbour (`N+` like `C`, `O-` like `F`).
#[rustfmt::skip]
pub fn allowed_valences(atomic_number: u8) -> &'static [u8] {
    match atomic_number {
        1 => &[1],
        5 => &[3],
        6 | 14 => &[4],
        7 => &[3],
        8 => &[2],
        9 => &[1],
        15 | 33 => &[3, 5, 7],
        16 | 34 | 52 => &[2, 4, 6],
        17 | 35 => &[1],
        53 => &[1, 3, 5],
        _ => &[],
    }
}

/// Maximum valence permitted for an atom with the given charge, if the element is checked.
pub fn max_valence(atomic_number: u8, charge: i8) -> Option<u8> {
    let effective = atomic_number as i16 - charge as i16;
    if !(1..=118).contains(&effective) {
        return None;
    }
    // only shift within the same period
    if period(effective as u8) != period(atomic_number) {
        return None;
    }
    allowed_valences(effective as u8).iter().copied().max()
}

fn period(atomic_number: u8) -> u8 {
    match atomic_number {
        0..=2 => 1,
        3..=10 => 2,
        11..=18 => 3,
        19..=36 => 4,
        37..=54 => 5,
        _ => 6,
    }
}
