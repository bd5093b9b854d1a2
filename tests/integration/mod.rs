//! Integration tests for tagship
//!
//! The end-to-end tests drive the real binary against throwaway git
//! repositories, a loopback HTTP server and shell stand-ins for the signing
//! and release tools.

mod helpers;

#[cfg(unix)]
mod test_ship;
