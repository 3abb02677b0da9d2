use crate::core::basis::{Basis, ChooseBasis};

/// Replays a fixed list of bases, wrapping around when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedBases {
    script: Vec<Basis>,
}

impl ScriptedBases {
    pub fn new(script: Vec<Basis>) -> Self {
        Self { script }
    }

    /// Round `i` uses `first` when `pick(i)` holds and `other` otherwise.
    pub fn from_fn(
        total_rounds: usize,
        first: Basis,
        other: Basis,
        pick: impl Fn(usize) -> bool,
    ) -> Self {
        Self::new(
            (0..total_rounds)
                .map(|i| if pick(i) { first } else { other })
                .collect(),
        )
    }
}

impl ChooseBasis for ScriptedBases {
    fn choose_basis(&mut self, round_index: usize) -> Basis {
        if self.script.is_empty() {
            return Basis::Z;
        }
        self.script[round_index % self.script.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_and_wraps() {
        let mut bases = ScriptedBases::new(vec![Basis::X, Basis::Z, Basis::Z]);
        let drawn: Vec<_> = (0..5).map(|i| bases.choose_basis(i)).collect();
        assert_eq!(drawn, vec![Basis::X, Basis::Z, Basis::Z, Basis::X, Basis::Z]);
    }

    #[test]
    fn test_from_fn() {
        let mut bases = ScriptedBases::from_fn(4, Basis::Z, Basis::X, |i| i < 2);
        assert_eq!(bases.choose_basis(1), Basis::Z);
        assert_eq!(bases.choose_basis(2), Basis::X);
    }
}
