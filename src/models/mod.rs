mod attachment;
mod component;
mod embed;
mod flags;
mod mentions;
mod message;
mod payload;

pub use attachment::*;
pub use component::*;
pub use embed::*;
pub use flags::*;
pub use mentions::*;
pub use message::*;
pub use payload::*;
