//! Adventure turn sheets: generation, scanning and response processing.

mod error;
mod header;
mod inventory_management;
mod location_choice;
mod print;
mod processor;
mod scan_upload;
pub mod templates;

pub use error::TurnSheetError;
pub use inventory_management::InventoryManagementProcessor;
pub use location_choice::LocationChoiceProcessor;
pub use print::PrintTurnSheet;
pub use processor::{
    DocumentFormat, SheetContext, SheetRecipient, TurnSheetProcessor, TurnSheetProcessors,
    TurnSheetServices,
};
pub use scan_upload::ScanTurnSheetUpload;
