pub mod ip;

pub use ip::{client_identity, client_identity_from};
