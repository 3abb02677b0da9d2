pub mod basis;
pub mod errors;
pub mod round;
pub mod utils;

pub use basis::{Basis, ChooseBasis, RandomBasisSelector};
pub use round::{BasisAnnouncement, RawSequence, Round, RoundRecorder};
