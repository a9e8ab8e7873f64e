pub mod actions;
pub mod ai;
pub mod api;
pub mod conversation;
pub mod resolver;

#[cfg(test)]
pub(crate) mod mock;
