pub mod enums;
pub mod objects;
pub mod realtime_json;
pub mod serde_helpers;

pub use enums::*;
pub use objects::*;
