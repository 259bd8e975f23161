pub mod catalog;
pub mod checkin;
pub mod inventory;
pub mod issuer;
pub mod notifier;
pub mod staff;

pub use catalog::{TicketCatalog, TicketTypeView};
pub use checkin::{CheckInValidator, TicketValidation, ValidationStatus};
pub use inventory::{spawn_expiry_sweeper, Confirmation, InventoryLedger};
pub use issuer::PurchaseIssuer;
pub use notifier::{CredentialNotifier, LogNotifier};
pub use staff::StaffDirectory;
