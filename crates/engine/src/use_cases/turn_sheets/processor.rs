//! The sheet processor registry.
//!
//! One processor per adventure sheet type. Dispatch is a `match` on
//! [`SheetType`], so adding a sheet type means adding a variant here and the
//! compiler points at every place that has to handle it.

use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use playbymail_domain::{
    Account, AccountUser, Character, CharacterInstance, Game, GameInstance, GameTurnSheet,
    SheetType,
};

use super::error::TurnSheetError;
use super::inventory_management::InventoryManagementProcessor;
use super::location_choice::LocationChoiceProcessor;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::{DocumentRendererPort, ImageExtractionPort};
use crate::infrastructure::turn_sheet_code::TurnSheetCodec;

/// External collaborators shared by every processor.
pub struct TurnSheetServices {
    pub renderer: Arc<dyn DocumentRendererPort>,
    pub extractor: Arc<dyn ImageExtractionPort>,
    pub codec: TurnSheetCodec,
}

impl TurnSheetServices {
    pub fn new(
        renderer: Arc<dyn DocumentRendererPort>,
        extractor: Arc<dyn ImageExtractionPort>,
        codec: TurnSheetCodec,
    ) -> Self {
        Self {
            renderer,
            extractor,
            codec,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Html,
    Pdf,
}

impl FromStr for DocumentFormat {
    type Err = TurnSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(DocumentFormat::Html),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(TurnSheetError::invalid_sheet_data(format!(
                "unknown document format: {}",
                other
            ))),
        }
    }
}

/// Who a new sheet is printed for.
#[derive(Debug, Clone)]
pub struct SheetRecipient {
    pub character: Character,
    pub account: Account,
    pub user: AccountUser,
}

/// Everything a processor needs to build the next sheet for one character.
#[derive(Debug, Clone, Copy)]
pub struct SheetContext<'a> {
    pub game: &'a Game,
    pub instance: &'a GameInstance,
    pub recipient: &'a SheetRecipient,
}

pub enum TurnSheetProcessor {
    LocationChoice(LocationChoiceProcessor),
    InventoryManagement(InventoryManagementProcessor),
}

impl TurnSheetProcessor {
    pub fn sheet_type(&self) -> SheetType {
        match self {
            Self::LocationChoice(_) => SheetType::LocationChoice,
            Self::InventoryManagement(_) => SheetType::InventoryManagement,
        }
    }

    pub async fn generate_turn_sheet(
        &self,
        format: DocumentFormat,
        sheet_data: &Value,
    ) -> Result<Vec<u8>, TurnSheetError> {
        match self {
            Self::LocationChoice(p) => p.generate_turn_sheet(format, sheet_data).await,
            Self::InventoryManagement(p) => p.generate_turn_sheet(format, sheet_data).await,
        }
    }

    pub async fn scan_turn_sheet(
        &self,
        sheet_data: &Value,
        image: &[u8],
    ) -> Result<Value, TurnSheetError> {
        match self {
            Self::LocationChoice(p) => p.scan_turn_sheet(sheet_data, image).await,
            Self::InventoryManagement(p) => p.scan_turn_sheet(sheet_data, image).await,
        }
    }

    pub async fn process_turn_sheet_response(
        &self,
        model: &mut Model,
        instance: &GameInstance,
        character: &mut CharacterInstance,
        sheet: &GameTurnSheet,
    ) -> Result<(), TurnSheetError> {
        check_sheet_type(self.sheet_type(), sheet)?;
        match self {
            Self::LocationChoice(p) => {
                p.process_turn_sheet_response(model, instance, character, sheet)
                    .await
            }
            Self::InventoryManagement(p) => {
                p.process_turn_sheet_response(model, instance, character, sheet)
                    .await
            }
        }
    }

    pub async fn create_next_turn_sheet(
        &self,
        model: &mut Model,
        ctx: SheetContext<'_>,
        character: &CharacterInstance,
    ) -> Result<GameTurnSheet, TurnSheetError> {
        match self {
            Self::LocationChoice(p) => p.create_next_turn_sheet(model, ctx, character).await,
            Self::InventoryManagement(p) => p.create_next_turn_sheet(model, ctx, character).await,
        }
    }
}

/// The adventure sheet processors, looked up by sheet type.
pub struct TurnSheetProcessors {
    location_choice: TurnSheetProcessor,
    inventory_management: TurnSheetProcessor,
}

impl TurnSheetProcessors {
    pub fn new(services: Arc<TurnSheetServices>) -> Self {
        Self {
            location_choice: TurnSheetProcessor::LocationChoice(LocationChoiceProcessor::new(
                Arc::clone(&services),
            )),
            inventory_management: TurnSheetProcessor::InventoryManagement(
                InventoryManagementProcessor::new(services),
            ),
        }
    }

    pub fn get(&self, sheet_type: SheetType) -> &TurnSheetProcessor {
        match sheet_type {
            SheetType::LocationChoice => &self.location_choice,
            SheetType::InventoryManagement => &self.inventory_management,
        }
    }

    pub fn by_name(&self, sheet_type: &str) -> Result<&TurnSheetProcessor, TurnSheetError> {
        let sheet_type: SheetType = sheet_type.parse()?;
        Ok(self.get(sheet_type))
    }

    /// Processors in the order a character's sheets are generated and applied.
    pub fn in_order(&self) -> impl Iterator<Item = &TurnSheetProcessor> {
        SheetType::all().iter().map(|sheet_type| self.get(*sheet_type))
    }
}

// =============================================================================
// Helpers shared by the processors
// =============================================================================

pub(super) fn check_sheet_type(
    expected: SheetType,
    sheet: &GameTurnSheet,
) -> Result<(), TurnSheetError> {
    if sheet.sheet_type() != expected {
        return Err(TurnSheetError::WrongSheetType {
            expected,
            actual: sheet.sheet_type(),
        });
    }
    Ok(())
}

pub(super) fn parse_sheet_data<T: DeserializeOwned>(value: &Value) -> Result<T, TurnSheetError> {
    serde_json::from_value(value.clone())
        .map_err(|e| TurnSheetError::invalid_sheet_data(e.to_string()))
}

pub(super) fn to_sheet_value<T: serde::Serialize>(data: &T) -> Result<Value, TurnSheetError> {
    serde_json::to_value(data).map_err(|e| TurnSheetError::invalid_sheet_data(e.to_string()))
}

/// The sheet's scanned response as JSON text, ready for the scan-data parsers.
pub(super) fn scanned_json(sheet: &GameTurnSheet) -> Result<String, TurnSheetError> {
    sheet
        .scanned_data()
        .map(Value::to_string)
        .ok_or_else(|| {
            TurnSheetError::invalid_scan_data(format!("turn sheet {} has not been scanned", sheet.id()))
        })
}

/// Pull the JSON object out of a model answer, tolerating code fences and chatter.
pub(super) fn extract_json_object(text: &str) -> Result<String, TurnSheetError> {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(text[start..=end].to_string()),
        _ => Err(TurnSheetError::invalid_scan_data(format!(
            "expected a JSON object, got: {}",
            text.chars().take(120).collect::<String>()
        ))),
    }
}

pub(super) async fn render_document(
    services: &TurnSheetServices,
    format: DocumentFormat,
    html: String,
) -> Result<Vec<u8>, TurnSheetError> {
    match format {
        DocumentFormat::Html => Ok(html.into_bytes()),
        DocumentFormat::Pdf => Ok(services.renderer.render_pdf(&html).await?),
    }
}
