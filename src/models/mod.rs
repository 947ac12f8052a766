pub mod content;
pub mod location;

pub use content::*;
pub use location::*;
