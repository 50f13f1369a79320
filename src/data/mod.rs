pub mod branch;
pub mod flight_data;
pub mod types;
pub mod warnings;

pub use branch::FlightDataBranch;
pub use flight_data::{FlightData, FlightSummary};
pub use types::{CustomDataType, DataTypeCatalog, FlightDataType};
pub use warnings::{Warning, WarningSet};
