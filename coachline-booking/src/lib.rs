pub mod finance;
pub mod ledger;
pub mod lifecycle;
pub mod listeners;
pub mod recurring;
pub mod settlement;

pub use finance::FeeSplit;
pub use ledger::SlotLedger;
pub use lifecycle::{BookingLifecycle, BookingReceipt, CreateBookingRequest};
pub use listeners::{PayoutListener, SeriesProgressListener};
pub use recurring::{
    CancelReport, ConflictPreview, CreateSeriesRequest, GenerationReport, PreviewRequest,
    RecurringEngine, SeriesCreation, SeriesPattern,
};
