//! Live vehicle telemetry.
//!
//! The telemetry source owns the write side of [`SharedVehicle`]; the
//! notification core only ever takes [`VehicleSnapshot`] copies.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::mode::FlightMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub armed: bool,
    pub mode: FlightMode,
    /// Remaining battery, percent (0-100).
    pub battery_remaining: f64,
    pub battery_voltage: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Airspeed in m/s.
    pub airspeed: f64,
    pub rssi: i32,
    pub failsafe: bool,
    pub failsafe_reason: String,
    /// GPS fix type as reported by the autopilot (2 = 2D, 3 = 3D).
    pub gps_fix: u8,
    pub current_waypoint: u16,
}

/// Cheaply clonable handle to the vehicle's current telemetry.
#[derive(Debug, Clone, Default)]
pub struct SharedVehicle {
    inner: Arc<RwLock<VehicleSnapshot>>,
}

impl SharedVehicle {
    pub fn new(snapshot: VehicleSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut VehicleSnapshot) -> R) -> R {
        let mut snapshot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut snapshot)
    }

    /// Whether two handles point at the same vehicle.
    pub fn same_vehicle(&self, other: &SharedVehicle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
