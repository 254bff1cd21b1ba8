//! Value objects - Immutable objects defined by their attributes

mod equipment_slot;
mod game_config;
mod game_type;
mod scan_data;
mod sheet_data;
mod sheet_type;

pub use equipment_slot::EquipmentSlot;
pub use game_config::GameConfig;
pub use game_type::GameType;
pub use scan_data::{
    EquipAction, InventoryManagementScanData, InventoryPlan, LocationChoiceScanData,
};
pub use sheet_data::{
    EquipmentSlots, EquippedItem, InventoryItem, InventoryManagementSheetData,
    LocationChoiceSheetData, LocationItem, LocationOption, TurnSheetHeader,
};
pub use sheet_type::SheetType;
