pub mod artifact;
pub mod user;

pub use artifact::{parse_targets, Artifact, Backend, StoredObject};
pub use user::User;
