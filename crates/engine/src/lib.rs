pub mod binder;
pub mod document;
pub mod editor;
pub mod events;
pub mod history;
pub mod ids;
pub mod node;
pub mod session;
