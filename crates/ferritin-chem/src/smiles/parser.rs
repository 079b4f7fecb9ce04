//! SMILES reader.
//!
//! Builds the raw molecule graph. Aromatic bonds are stored as aromatic
//! single bonds until [`crate::sanitize`] assigns a Kekulé structure.
use crate::element;
use crate::error::{ChemError, Result};
use crate::molecule::{Atom, BondOrder, BondStereo, Molecule, StereoRef, Tetrahedral};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BondSymbol {
    order: BondOrder,
    aromatic: bool,
    /// `/` is +1, `\` is -1
    direction: Option<i8>,
}

impl BondSymbol {
    fn from_char(c: char) -> Option<Self> {
        let (order, aromatic, direction) = match c {
            '-' => (BondOrder::Single, false, None),
            '=' => (BondOrder::Double, false, None),
            '#' => (BondOrder::Triple, false, None),
            '$' => (BondOrder::Quadruple, false, None),
            ':' => (BondOrder::Single, true, None),
            '/' => (BondOrder::Single, false, Some(1)),
            '\\' => (BondOrder::Single, false, Some(-1)),
            _ => return None,
        };
        Some(Self {
            order,
            aromatic,
            direction,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRef {
    Atom(usize),
    Implicit,
    Ring(u16),
}

struct RingOpening {
    atom: usize,
    bond: Option<BondSymbol>,
    position: usize,
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    mol: Molecule,
    refs: Vec<Vec<PendingRef>>,
    chirality: Vec<Option<bool>>,
    // (atom written first, sign) for every directional bond
    directions: Vec<Option<(usize, i8)>>,
    input: &'a str,
}

/// Parse a SMILES string into an unsanitized molecule.
///
/// Parsing stops at the first whitespace, anything after it is a title.
pub fn parse(smiles: &str) -> Result<Molecule> {
    let text = smiles.split_whitespace().next().unwrap_or("");
    if text.is_empty() {
        return Err(ChemError::parse(0, "empty SMILES"));
    }
    if let Some(position) = text.find(|c: char| !c.is_ascii()) {
        return Err(ChemError::parse(position, "non-ASCII character"));
    }
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        mol: Molecule::new(),
        refs: Vec::new(),
        chirality: Vec::new(),
        directions: Vec::new(),
        input: text,
    };
    parser.read()?;
    parser.finish()
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ChemError {
        ChemError::parse(self.pos, message)
    }

    fn read(&mut self) -> Result<()> {
        let mut prev: Option<usize> = None;
        let mut pending: Option<BondSymbol> = None;
        let mut branches: Vec<usize> = Vec::new();
        let mut rings: BTreeMap<u16, RingOpening> = BTreeMap::new();

        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    let Some(atom) = prev else {
                        return Err(self.error("branch opened before any atom"));
                    };
                    if pending.is_some() {
                        return Err(self.error("bond symbol before branch"));
                    }
                    branches.push(atom);
                    self.pos += 1;
                }
                ')' => {
                    let Some(atom) = branches.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    if pending.is_some() {
                        return Err(self.error("bond symbol at the end of a branch"));
                    }
                    prev = Some(atom);
                    self.pos += 1;
                }
                '.' => {
                    if prev.is_none() || pending.is_some() || !branches.is_empty() {
                        return Err(self.error("unexpected '.'"));
                    }
                    prev = None;
                    self.pos += 1;
                }
                '0'..='9' | '%' => {
                    let Some(atom) = prev else {
                        return Err(self.error("ring closure before any atom"));
                    };
                    let start = self.pos;
                    let number = self.ring_number()?;
                    let bond = pending.take();
                    match rings.remove(&number) {
                        Some(open) => self.close_ring(open, atom, bond, number)?,
                        None => {
                            self.refs[atom].push(PendingRef::Ring(number));
                            rings.insert(
                                number,
                                RingOpening {
                                    atom,
                                    bond,
                                    position: start,
                                },
                            );
                        }
                    }
                }
                c if BondSymbol::from_char(c).is_some() => {
                    if prev.is_none() {
                        return Err(self.error(format!("bond '{c}' without a preceding atom")));
                    }
                    if pending.is_some() {
                        return Err(self.error("two consecutive bond symbols"));
                    }
                    pending = BondSymbol::from_char(c);
                    self.pos += 1;
                }
                _ => {
                    let start = self.pos;
                    let (atom, chirality) = self.atom()?;
                    let idx = self.mol.add_atom(atom);
                    self.refs.push(Vec::new());
                    self.chirality.push(chirality);
                    if let Some(p) = prev {
                        self.connect(p, idx, pending.take(), start)?;
                        self.refs[p].push(PendingRef::Atom(idx));
                        self.refs[idx].push(PendingRef::Atom(p));
                    }
                    if self.mol.atom(idx).hydrogens > 0 {
                        self.refs[idx].push(PendingRef::Implicit);
                    }
                    prev = Some(idx);
                }
            }
        }

        if pending.is_some() {
            return Err(self.error("SMILES ends with a bond symbol"));
        }
        if !branches.is_empty() {
            return Err(self.error("unclosed branch"));
        }
        if let Some((number, open)) = rings.iter().next() {
            return Err(ChemError::parse(
                open.position,
                format!("unclosed ring bond {number}"),
            ));
        }
        Ok(())
    }

    fn ring_number(&mut self) -> Result<u16> {
        if self.peek() == Some('%') {
            let digits: Option<u16> = match (self.peek_at(1), self.peek_at(2)) {
                (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit() => {
                    Some((a as u16 - '0' as u16) * 10 + (b as u16 - '0' as u16))
                }
                _ => None,
            };
            let number = digits.ok_or_else(|| self.error("'%' must be followed by two digits"))?;
            self.pos += 3;
            Ok(number)
        } else {
            let number = self
                .peek()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| self.error("expected ring closure digit"))?;
            self.pos += 1;
            Ok(number as u16)
        }
    }

    fn close_ring(
        &mut self,
        open: RingOpening,
        atom: usize,
        bond: Option<BondSymbol>,
        number: u16,
    ) -> Result<()> {
        if open.atom == atom {
            return Err(self.error("ring bond from an atom to itself"));
        }
        let symbol = match (open.bond, bond) {
            (Some(a), Some(b)) if a.order != b.order || a.aromatic != b.aromatic => {
                return Err(self.error(format!("conflicting bond symbols for ring bond {number}")))
            }
            (Some(a), _) => Some(a),
            (None, b) => b,
        };
        // directions on ring closures are not used for stereo
        let symbol = symbol.map(|s| BondSymbol {
            direction: None,
            ..s
        });
        self.connect(open.atom, atom, symbol, self.pos)?;
        if let Some(slot) = self.refs[open.atom]
            .iter_mut()
            .find(|r| **r == PendingRef::Ring(number))
        {
            *slot = PendingRef::Atom(atom);
        }
        self.refs[atom].push(PendingRef::Atom(open.atom));
        Ok(())
    }

    fn connect(
        &mut self,
        first: usize,
        second: usize,
        symbol: Option<BondSymbol>,
        position: usize,
    ) -> Result<()> {
        if self.mol.bond_between(first, second).is_some() {
            return Err(ChemError::parse(position, "duplicate bond between two atoms"));
        }
        let (order, aromatic, direction) = match symbol {
            Some(s) => (s.order, s.aromatic, s.direction),
            None => {
                let aromatic = self.mol.atom(first).aromatic && self.mol.atom(second).aromatic;
                (BondOrder::Single, aromatic, None)
            }
        };
        self.mol.add_bond(first, second, order, aromatic);
        self.directions.push(direction.map(|d| (first, d)));
        Ok(())
    }

    fn atom(&mut self) -> Result<(Atom, Option<bool>)> {
        match self.peek() {
            Some('[') => self.bracket_atom(),
            Some(_) => Ok((self.organic_atom()?, None)),
            None => Err(self.error("expected an atom")),
        }
    }

    fn organic_atom(&mut self) -> Result<Atom> {
        let c = self.peek().ok_or_else(|| self.error("expected an atom"))?;
        let input = self.input;
        let (symbol, len, aromatic) = match (c, self.peek_at(1)) {
            ('C', Some('l')) => ("Cl", 2, false),
            ('B', Some('r')) => ("Br", 2, false),
            ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I', _) => (&input[self.pos..self.pos + 1], 1, false),
            ('b' | 'c' | 'n' | 'o' | 'p' | 's', _) => (&input[self.pos..self.pos + 1], 1, true),
            ('*', _) => return Err(self.error("wildcard atoms are not supported")),
            _ => return Err(self.error(format!("unexpected character '{c}'"))),
        };
        let atomic_number =
            element::atomic_number(symbol).ok_or_else(|| ChemError::UnknownElement(symbol.to_string()))?;
        self.pos += len;
        Ok(Atom {
            aromatic,
            ..Atom::new(atomic_number)
        })
    }

    fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }

    fn bracket_atom(&mut self) -> Result<(Atom, Option<bool>)> {
        self.pos += 1;
        let isotope = match self.number() {
            Some(n) => Some(u16::try_from(n).map_err(|_| self.error("isotope out of range"))?),
            None => None,
        };

        let (atomic_number, aromatic) = self.bracket_symbol()?;

        let mut chirality = None;
        if self.peek() == Some('@') {
            self.pos += 1;
            let clockwise = if self.peek() == Some('@') {
                self.pos += 1;
                true
            } else if self.peek() == Some('T') && self.peek_at(1) == Some('H') {
                self.pos += 2;
                match self.number() {
                    Some(1) => false,
                    Some(2) => true,
                    _ => return Err(self.error("expected @TH1 or @TH2")),
                }
            } else if matches!(self.peek(), Some('A' | 'O' | 'S' | 'T')) {
                return Err(self.error("only tetrahedral chirality is supported"));
            } else {
                false
            };
            chirality = Some(clockwise);
        }

        let mut hydrogens = 0u8;
        if self.peek() == Some('H') {
            self.pos += 1;
            hydrogens = match self.number() {
                Some(n) => u8::try_from(n).map_err(|_| self.error("hydrogen count out of range"))?,
                None => 1,
            };
        }

        let mut charge = 0i32;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            let unit = if sign == '+' { 1 } else { -1 };
            self.pos += 1;
            if let Some(n) = self.number() {
                charge = unit * n as i32;
            } else {
                charge = unit;
                while self.peek() == Some(sign) {
                    charge += unit;
                    self.pos += 1;
                }
            }
        }
        let charge = i8::try_from(charge)
            .ok()
            .filter(|c| c.abs() <= 15)
            .ok_or_else(|| self.error("charge out of range"))?;

        if self.peek() == Some(':') {
            self.pos += 1;
            // atom classes are read and discarded
            if self.number().is_none() {
                return Err(self.error("expected atom class"));
            }
        }

        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;

        let atom = Atom {
            isotope,
            charge,
            hydrogens,
            aromatic,
            bracket: true,
            ..Atom::new(atomic_number)
        };
        Ok((atom, chirality))
    }

    fn bracket_symbol(&mut self) -> Result<(u8, bool)> {
        let Some(c) = self.peek() else {
            return Err(self.error("unterminated bracket atom"));
        };
        if c == '*' {
            return Err(self.error("wildcard atoms are not supported"));
        }
        if c.is_ascii_lowercase() {
            for symbol in ["se", "as", "te"] {
                if self.input[self.pos..].starts_with(symbol) {
                    self.pos += 2;
                    return self.lookup(symbol).map(|z| (z, true));
                }
            }
            if matches!(c, 'b' | 'c' | 'n' | 'o' | 'p' | 's') {
                self.pos += 1;
                return self.lookup(&c.to_string()).map(|z| (z, true));
            }
            return Err(self.error(format!("unexpected '{c}' in bracket atom")));
        }
        if !c.is_ascii_uppercase() {
            return Err(self.error(format!("unexpected '{c}' in bracket atom")));
        }
        if let Some(second) = self.peek_at(1).filter(|s| s.is_ascii_lowercase()) {
            let two: String = [c, second].iter().collect();
            if let Some(z) = element::atomic_number(&two) {
                self.pos += 2;
                return Ok((z, false));
            }
        }
        self.pos += 1;
        self.lookup(&c.to_string()).map(|z| (z, false))
    }

    fn lookup(&self, symbol: &str) -> Result<u8> {
        element::atomic_number(symbol).ok_or_else(|| ChemError::UnknownElement(symbol.to_string()))
    }

    fn finish(mut self) -> Result<Molecule> {
        for idx in 0..self.mol.num_atoms() {
            let Some(clockwise) = self.chirality[idx] else {
                continue;
            };
            let mut refs: Vec<StereoRef> = self.refs[idx]
                .iter()
                .filter_map(|r| match r {
                    PendingRef::Atom(a) => Some(StereoRef::Atom(*a)),
                    PendingRef::Implicit => Some(StereoRef::Implicit),
                    PendingRef::Ring(_) => None,
                })
                .collect();
            if refs.len() == 3 && !refs.contains(&StereoRef::Implicit) {
                // lone pair sits where an implicit hydrogen would
                let has_prev = matches!(self.refs[idx].first(), Some(PendingRef::Atom(p)) if *p < idx);
                refs.insert(usize::from(has_prev), StereoRef::Implicit);
            }
            if let Ok(refs) = <[StereoRef; 4]>::try_from(refs) {
                self.mol.atom_mut(idx).chirality = Some(Tetrahedral { refs, clockwise });
            }
        }

        for bond_idx in 0..self.mol.num_bonds() {
            let bond = self.mol.bond(bond_idx).clone();
            if bond.order != BondOrder::Double || bond.aromatic {
                continue;
            }
            let begin = self.end_direction(bond.begin, bond_idx);
            let end = self.end_direction(bond.end, bond_idx);
            if let (Some((ra, sa)), Some((rb, sb))) = (begin, end) {
                self.mol.bond_mut(bond_idx).stereo = if sa != sb {
                    BondStereo::Trans(ra, rb)
                } else {
                    BondStereo::Cis(ra, rb)
                };
            }
        }
        Ok(self.mol)
    }

    /// First directional bond on `atom` other than `double`, as
    /// `(neighbor, side)` where the side is seen from `atom`.
    fn end_direction(&self, atom: usize, double: usize) -> Option<(usize, i8)> {
        self.mol
            .neighbors(atom)
            .iter()
            .filter(|(_, bond)| *bond != double)
            .find_map(|(nbr, bond)| {
                let (first, sign) = self.directions[*bond]?;
                let side = if first == *nbr { sign } else { -sign };
                Some((*nbr, side))
            })
    }
}
