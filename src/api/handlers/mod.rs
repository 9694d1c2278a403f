pub mod admin;
pub mod payments;
pub mod pedidos;
pub mod purchases;
pub mod public;
pub mod settings;
