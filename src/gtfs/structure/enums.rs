//! Enumerations used by the GTFS static row types (`objects.rs`). Values and
//! numeric codes follow the GTFS static reference at <https://gtfs.org/reference/static/>.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// What kind of GTFS static entity an object represents. Used for error
/// messages and log lines, not part of any GTFS column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Agency,
    Stop,
    Route,
    Trip,
    StopTime,
    Calendar,
    CalendarDate,
    Shape,
    Fare,
    Pathway,
    Transfer,
    FeedInfo,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ObjectType::Agency => "agency",
            ObjectType::Stop => "stop",
            ObjectType::Route => "route",
            ObjectType::Trip => "trip",
            ObjectType::StopTime => "stop_time",
            ObjectType::Calendar => "calendar",
            ObjectType::CalendarDate => "calendar_date",
            ObjectType::Shape => "shape",
            ObjectType::Fare => "fare",
            ObjectType::Pathway => "pathway",
            ObjectType::Transfer => "transfer",
            ObjectType::FeedInfo => "feed_info",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum LocationType {
    #[default]
    StopOrPlatform = 0,
    Station = 1,
    EntranceOrExit = 2,
    GenericNode = 3,
    BoardingArea = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableTram = 5,
    AerialLift = 6,
    Funicular = 7,
    Trolleybus = 11,
    Monorail = 12,
    Other(u16),
}

impl<'de> Deserialize<'de> for RouteType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code: u16 = Deserialize::deserialize(deserializer)?;
        Ok(RouteType::from(code))
    }
}

impl Serialize for RouteType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(u16::from(*self))
    }
}

impl From<u16> for RouteType {
    fn from(code: u16) -> Self {
        match code {
            0 => RouteType::Tram,
            1 => RouteType::Subway,
            2 => RouteType::Rail,
            3 => RouteType::Bus,
            4 => RouteType::Ferry,
            5 => RouteType::CableTram,
            6 => RouteType::AerialLift,
            7 => RouteType::Funicular,
            11 => RouteType::Trolleybus,
            12 => RouteType::Monorail,
            other => RouteType::Other(other),
        }
    }
}

impl From<RouteType> for u16 {
    fn from(rt: RouteType) -> u16 {
        match rt {
            RouteType::Tram => 0,
            RouteType::Subway => 1,
            RouteType::Rail => 2,
            RouteType::Bus => 3,
            RouteType::Ferry => 4,
            RouteType::CableTram => 5,
            RouteType::AerialLift => 6,
            RouteType::Funicular => 7,
            RouteType::Trolleybus => 11,
            RouteType::Monorail => 12,
            RouteType::Other(code) => code,
        }
    }
}

impl Default for RouteType {
    fn default() -> Self {
        RouteType::Bus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum Availability {
    #[default]
    NoInfo = 0,
    Available = 1,
    NotAvailable = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum BikesAllowedType {
    #[default]
    NoInfo = 0,
    Allowed = 1,
    NotAllowed = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum ContinuousPickupDropOff {
    Continuous = 0,
    #[default]
    None = 1,
    PhoneAgency = 2,
    AskDriver = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum PickupDropOffType {
    #[default]
    RegularlyScheduled = 0,
    NoPickupDropOff = 1,
    PhoneAgency = 2,
    CoordinateWithDriver = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum TimepointType {
    Approximate = 0,
    #[default]
    Exact = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum DirectionType {
    Outbound = 0,
    Inbound = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum Exception {
    Added = 1,
    Deleted = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum TransferType {
    #[default]
    Recommended = 0,
    Timed = 1,
    MinimumTime = 2,
    NotPossible = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum PathwayMode {
    Walkway = 1,
    Stairs = 2,
    MovingSidewalk = 3,
    Escalator = 4,
    Elevator = 5,
    FareGate = 6,
    ExitGate = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum PathwayDirectionType {
    Unidirectional = 0,
    Bidirectional = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum PaymentMethod {
    OnBoard = 0,
    BeforeBoarding = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum Transfers {
    NoTransfer = 0,
    OneTransfer = 1,
    TwoTransfers = 2,
    Unlimited = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum ExactTimes {
    FrequencyBased = 0,
    ScheduleBased = 1,
}
