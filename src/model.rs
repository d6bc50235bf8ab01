pub mod layout;
pub mod tab;

pub use layout::{Group, Layout};
pub use tab::{KeyMinter, TabDescriptor};
