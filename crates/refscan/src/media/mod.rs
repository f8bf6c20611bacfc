pub mod formats;
pub mod reference;

pub use formats::{LocatorEncoding, ReferenceKind};
pub use reference::{BaseContext, MediaReference, ResolvedReference};
