//! Murmur library exports: the chat core, the adapter contract and the widget components.

pub mod adapter;
pub mod core;
pub mod ui;

#[cfg(test)]
pub mod test_support;
