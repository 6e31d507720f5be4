//! Naming rules of the organized library.
//!
//! Organized files live in `/<YYYY>/<MM>[/<DD>]` directories and are named
//! `<YYYY>_<MM>_<DD>_<HH:MM:SS>_<NNNN>.<ext>`, where `NNNN` is a per-prefix
//! sequence number that disambiguates files captured in the same second.
//!
//! - [`DateMatcher`] extracts a capture timestamp from a file name.
//! - [`allocate_sequence`] picks the next free `NNNN` for a prefix.
//! - [`layout`] holds the predicates and formatters for the canonical layout.

mod date;
mod error;
pub mod layout;
mod sequence;

pub use date::{DateFormat, DateMatcher, DEFAULT_DATE_FORMATS};
pub use error::NamingError;
pub use sequence::allocate_sequence;
