//! ArduPilot flight modes.
//!
//! ArduPilot reports the active mode as a frame-specific `custom_mode`
//! number in HEARTBEAT. [`FlightMode::from_custom_mode`] decodes it and
//! [`FlightMode::spoken_name`] gives the phrase used in announcements.

use std::fmt;

use serde::Serialize;

/// Airframe family, which decides how `custom_mode` is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frame {
    FixedWing,
    Rotor,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlightMode {
    FixedWingManual,
    FixedWingCircle,
    FixedWingStabilize,
    FixedWingTraining,
    FixedWingAcro,
    FixedWingFlyByWireA,
    FixedWingFlyByWireB,
    FixedWingCruise,
    FixedWingAutotune,
    FixedWingAuto,
    FixedWingRtl,
    FixedWingLoiter,
    FixedWingGuided,

    RotorStabilize,
    RotorAcro,
    RotorAltHold,
    RotorAuto,
    RotorGuided,
    RotorLoiter,
    RotorRtl,
    RotorCircle,
    RotorPosition,
    RotorLand,
    RotorOfLoiter,
    RotorDrift,
    RotorSport,
    RotorFlip,
    RotorAutotune,
    RotorPosHold,

    /// A mode number outside the known tables.
    Unknown(u32),
}

impl Default for FlightMode {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl FlightMode {
    pub fn from_custom_mode(frame: Frame, custom_mode: u32) -> Self {
        match frame {
            Frame::FixedWing => match custom_mode {
                0 => Self::FixedWingManual,
                1 => Self::FixedWingCircle,
                2 => Self::FixedWingStabilize,
                3 => Self::FixedWingTraining,
                4 => Self::FixedWingAcro,
                5 => Self::FixedWingFlyByWireA,
                6 => Self::FixedWingFlyByWireB,
                7 => Self::FixedWingCruise,
                8 => Self::FixedWingAutotune,
                10 => Self::FixedWingAuto,
                11 => Self::FixedWingRtl,
                12 => Self::FixedWingLoiter,
                15 => Self::FixedWingGuided,
                n => Self::Unknown(n),
            },
            Frame::Rotor => match custom_mode {
                0 => Self::RotorStabilize,
                1 => Self::RotorAcro,
                2 => Self::RotorAltHold,
                3 => Self::RotorAuto,
                4 => Self::RotorGuided,
                5 => Self::RotorLoiter,
                6 => Self::RotorRtl,
                7 => Self::RotorCircle,
                8 => Self::RotorPosition,
                9 => Self::RotorLand,
                10 => Self::RotorOfLoiter,
                11 => Self::RotorDrift,
                13 => Self::RotorSport,
                14 => Self::RotorFlip,
                15 => Self::RotorAutotune,
                16 => Self::RotorPosHold,
                n => Self::Unknown(n),
            },
            Frame::Other => Self::Unknown(custom_mode),
        }
    }

    /// The mode's declared display name, as a ground station lists it.
    pub fn name(&self) -> String {
        let name = match self {
            Self::FixedWingManual => "Manual",
            Self::FixedWingCircle => "Circle",
            Self::FixedWingStabilize => "Stabilize",
            Self::FixedWingTraining => "Training",
            Self::FixedWingAcro => "Acro",
            Self::FixedWingFlyByWireA => "FBW A",
            Self::FixedWingFlyByWireB => "FBW B",
            Self::FixedWingCruise => "Cruise",
            Self::FixedWingAutotune => "Autotune",
            Self::FixedWingAuto => "Auto",
            Self::FixedWingRtl => "RTL",
            Self::FixedWingLoiter => "Loiter",
            Self::FixedWingGuided => "Guided",
            Self::RotorStabilize => "Stabilize",
            Self::RotorAcro => "Acro",
            Self::RotorAltHold => "Alt Hold",
            Self::RotorAuto => "Auto",
            Self::RotorGuided => "Guided",
            Self::RotorLoiter => "Loiter",
            Self::RotorRtl => "RTL",
            Self::RotorCircle => "Circle",
            Self::RotorPosition => "Position",
            Self::RotorLand => "Land",
            Self::RotorOfLoiter => "OF Loiter",
            Self::RotorDrift => "Drift",
            Self::RotorSport => "Sport",
            Self::RotorFlip => "Flip",
            Self::RotorAutotune => "Autotune",
            Self::RotorPosHold => "PosHold",
            Self::Unknown(n) => return format!("Unknown {n}"),
        };
        name.to_string()
    }

    /// Name used in "Mode ..." announcements. Abbreviated modes get a
    /// phrase that reads well aloud; the rest use their display name.
    pub fn spoken_name(&self) -> String {
        match self {
            Self::FixedWingFlyByWireA => "Fly by wire A".into(),
            Self::FixedWingFlyByWireB => "Fly by wire B".into(),
            Self::RotorAcro => "Acrobatic".into(),
            Self::RotorAltHold => "Altitude hold".into(),
            Self::RotorPosition => "Position hold".into(),
            Self::FixedWingRtl | Self::RotorRtl => "Return to home".into(),
            other => other.name(),
        }
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
