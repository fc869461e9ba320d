//! vehicle-voice: spoken status announcements for vehicle telemetry.
//!
//! Turns a stream of vehicle events (arming, mode changes, battery level,
//! link health, mission progress) into short spoken announcements, plus an
//! optional periodic status digest.

pub mod announcer;
pub mod api;
pub mod battery;
pub mod config;
pub mod events;
pub mod facade;
pub mod history;
pub mod link;
pub mod mode;
pub mod notifier;
pub mod prefs;
pub mod scheduler;
pub mod speech;
pub mod telemetry;
pub mod translator;
pub mod vehicle;
