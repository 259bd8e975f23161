pub mod checkin;
pub mod event;
pub mod reservation;
pub mod staff;
pub mod ticket;

use thiserror::Error;

pub use checkin::{CheckInRecord, CheckInSummary};
pub use event::{Event, NewEvent};
pub use reservation::{Reservation, ReservationStatus};
pub use staff::{NewStaffMember, StaffCredential, StaffMember, StaffPatch, StaffRole, StaffSession};
pub use ticket::{
    Availability, IssuedTicket, NewTicketType, TicketCategory, TicketStatus, TicketType,
};

/// Raised when a persisted enum column holds a value this build does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements the text round trip used by the database columns and query strings.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;
