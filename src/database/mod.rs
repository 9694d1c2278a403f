pub mod messages;
pub mod orders;
pub mod pedidos;
pub mod purchases;
pub mod settings;
pub mod sqlx;
