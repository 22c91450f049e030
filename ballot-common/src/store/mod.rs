//! Define a generic way to store data with the [Store Adapters][adapter].
//!
//! Typed stores built on top of them wrap an adapter in a lock and expose domain operations.

pub mod adapter;
