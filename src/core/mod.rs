pub mod credentials;
pub mod models;
pub mod settings;
pub mod store;
