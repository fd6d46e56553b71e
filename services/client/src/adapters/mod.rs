pub mod http_store;
pub mod identity;

pub use http_store::HttpProfileStore;
pub use identity::LocalIdentityProvider;
