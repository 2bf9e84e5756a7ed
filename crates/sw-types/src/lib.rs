pub mod errors;
pub mod flags;
pub mod random_state;
pub mod space;
pub mod trial;

pub use errors::*;
pub use flags::*;
pub use random_state::*;
pub use space::*;
pub use trial::*;
