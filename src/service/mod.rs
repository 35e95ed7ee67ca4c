pub mod certificate;
pub mod connection;
pub mod credential_loader;
pub mod identity;
pub mod load;
pub mod remote;
