//! Domain collaborators used by the tools.
//!
//! - [`clock`]: injectable time source
//! - [`zones`]: IANA zone lookup, offsets and DST transitions
//! - [`calendar`]: religious and traditional calendar conversion
//! - [`astronomy`]: sun and moon events and positions

pub mod astronomy;
pub mod calendar;
pub mod clock;
pub mod zones;

pub use clock::{Clock, FixedClock, SystemClock};
