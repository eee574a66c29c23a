pub mod booking;
pub mod directory;
pub mod slot;

pub use booking::{Booking, BookingStatus};
pub use directory::{Dealer, Vehicle};
pub use slot::Slot;
