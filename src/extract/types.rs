//! Iteration domains and derived-data flags

use bitflags::bitflags;

/// Mesh element kind an extractor iterates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    Looptri,
    Poly,
    Ledge,
    Lvert,
}

impl Domain {
    /// Scan order of one extraction run.
    pub const ORDER: [Domain; 4] = [Domain::Looptri, Domain::Poly, Domain::Ledge, Domain::Lvert];

    pub fn flag(self) -> IterDomain {
        match self {
            Domain::Looptri => IterDomain::LOOPTRI,
            Domain::Poly => IterDomain::POLY,
            Domain::Ledge => IterDomain::LEDGE,
            Domain::Lvert => IterDomain::LVERT,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Domain::Looptri => "looptri",
            Domain::Poly => "poly",
            Domain::Ledge => "ledge",
            Domain::Lvert => "lvert",
        }
    }
}

bitflags! {
    /// Set of iteration domains.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct IterDomain: u8 {
        const LOOPTRI = 1 << 0;
        const POLY = 1 << 1;
        const LEDGE = 1 << 2;
        const LVERT = 1 << 3;
    }
}

impl IterDomain {
    pub fn domains(self) -> impl Iterator<Item = Domain> {
        Domain::ORDER.into_iter().filter(move |d| self.contains(d.flag()))
    }
}

bitflags! {
    /// Derived arrays the render data must provide.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DataFlags: u8 {
        const LOOPTRI = 1 << 0;
        const POLY_NOR = 1 << 1;
        const LOOP_NOR = 1 << 2;
        const VERT_NOR = 1 << 3;
        const LOOSE_GEOM = 1 << 4;
        /// Per-material triangle ranges
        const MAT_OFFSETS = 1 << 5;
    }
}

/// Representation the extraction reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtractType {
    /// Edit-mode BMesh
    BMesh,
    /// Evaluated mesh mapped back to the original through origindex layers
    Mapped,
    /// Evaluated mesh
    Mesh,
}

impl ExtractType {
    /// Whether the mesh callbacks (rather than the BMesh ones) are used.
    pub fn is_mesh(self) -> bool {
        self != ExtractType::BMesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_order() {
        let all = IterDomain::all().domains().collect::<Vec<_>>();
        assert_eq!(all, Domain::ORDER.to_vec());
        let some = (IterDomain::LVERT | IterDomain::LOOPTRI).domains().collect::<Vec<_>>();
        assert_eq!(some, vec![Domain::Looptri, Domain::Lvert]);
    }
}
