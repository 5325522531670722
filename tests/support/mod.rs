//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod catalog;
pub mod socket_guard;
