pub mod models;
pub mod error;
pub mod seats;
pub mod changes;
pub mod ledger;
pub mod manager;
pub mod memory;

pub use models::{Booking, BookingStatus, BookingUpdate, CreateBooking, SeatQuery};
pub use error::{BookingError, BookingResult};
pub use changes::ChangeHandler;
pub use ledger::{BookingStore, BookingTx, SeatScope};
pub use manager::{BookingManager, BookingOutcome};
pub use memory::MemoryStore;
