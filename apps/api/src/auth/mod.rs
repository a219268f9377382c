pub mod handlers;
pub mod origin;
pub mod register;
pub mod store;
pub mod token;
pub mod verify;
