//! Map records exchanged with the persistence layer.

mod record;

pub use record::{MapRecord, ReferenceColors};
