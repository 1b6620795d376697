pub mod enums;
pub mod error;
pub mod money;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{InstrumentType, OrderExpiry, OrderSide, OrderStatus};
pub use error::CoreError;
pub use money::MinorUnits;
pub use structs::{
    Holding, InstrumentSummary, OrderAck, OrderRequest, OrderSnapshot, OrderTicket, Quote,
    SpaceSummary, VenueStatus,
};
