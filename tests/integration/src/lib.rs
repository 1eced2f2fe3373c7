//! Integration test support
//!
//! Spawns real SockJS servers on ephemeral ports and provides the clients
//! the protocol tests drive them with.
