//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below drives the notification facade against recording
//! mock ports. No speech service, desktop or vehicle link is needed.

mod facade_tests;
mod link_tests;
mod mock_ports;
mod periodic_tests;
