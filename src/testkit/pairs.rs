use crate::core::basis::Basis;
use crate::core::errors::MeasurementFailure;
use crate::protocols::bbm92::Role;
use crate::source::PairSource;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Correlated outcomes for both parties, shared through a ledger.
///
/// Whoever measures a round first fixes a random bit for it. The other party
/// reads the same bit when it measured in the same basis and a fresh random bit
/// otherwise. Bob's outcome is then flipped on tampered rounds and, with the
/// configured probability, on any round.
#[derive(Debug, Clone)]
pub struct EntangledPairs {
    ledger: Arc<Mutex<Ledger>>,
}

#[derive(Debug)]
struct Ledger {
    rng: StdRng,
    noise: f64,
    tampered: BTreeSet<usize>,
    measured: HashMap<usize, (Basis, bool)>,
}

impl EntangledPairs {
    pub fn new(seed: u64) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger {
                rng: StdRng::seed_from_u64(seed),
                noise: 0.0,
                tampered: BTreeSet::new(),
                measured: HashMap::new(),
            })),
        }
    }

    /// Flips each of Bob's outcomes with probability `p`, clamped to [0, 1].
    pub fn with_noise(self, p: f64) -> Self {
        self.ledger.lock().noise = p.clamp(0.0, 1.0);
        self
    }

    /// Always flips Bob's outcome on the given rounds.
    pub fn with_tampered_rounds(self, rounds: impl IntoIterator<Item = usize>) -> Self {
        self.ledger.lock().tampered.extend(rounds);
        self
    }

    /// Alice's and Bob's ends of the pair stream.
    pub fn halves(&self) -> (PairHalf, PairHalf) {
        (self.half(Role::Alice), self.half(Role::Bob))
    }

    fn half(&self, role: Role) -> PairHalf {
        PairHalf {
            role,
            ledger: Arc::clone(&self.ledger),
            fail_at: None,
        }
    }
}

/// One party's end of an [`EntangledPairs`] stream.
#[derive(Debug)]
pub struct PairHalf {
    role: Role,
    ledger: Arc<Mutex<Ledger>>,
    fail_at: Option<usize>,
}

impl PairHalf {
    /// Makes the measurement of `round_index` fail.
    pub fn failing_at(mut self, round_index: usize) -> Self {
        self.fail_at = Some(round_index);
        self
    }
}

impl PairSource for PairHalf {
    fn measure(&mut self, round_index: usize, basis: Basis) -> Result<bool, MeasurementFailure> {
        if self.fail_at == Some(round_index) {
            return Err(MeasurementFailure {
                round_index,
                reason: "detector did not fire".to_string(),
            });
        }

        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        let prior = ledger.measured.get(&round_index).copied();
        let shared = match prior {
            Some((first_basis, bit)) if first_basis == basis => bit,
            Some(_) => ledger.rng.random(),
            None => {
                let bit = ledger.rng.random();
                ledger.measured.insert(round_index, (basis, bit));
                bit
            }
        };

        if self.role == Role::Alice {
            return Ok(shared);
        }
        let flipped =
            ledger.tampered.contains(&round_index) || ledger.rng.random_bool(ledger.noise);
        Ok(shared ^ flipped)
    }
}
