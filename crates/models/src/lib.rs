//! Request/record payloads shared by the service and HTTP layers.

pub mod item;
pub mod user;

pub use item::Item;
pub use user::User;
