//! Location choice: the player picks one path out of their current location.

use std::sync::Arc;

use serde_json::{json, Value};

use playbymail_domain::{
    CharacterInstance, GameInstance, GameTurnSheet, GameTurnSheetId, LocationChoiceScanData,
    LocationChoiceSheetData, LocationOption, SheetType,
};

use super::error::TurnSheetError;
use super::header::build_header;
use super::processor::{
    extract_json_object, parse_sheet_data, render_document, scanned_json, to_sheet_value,
    DocumentFormat, SheetContext, TurnSheetServices,
};
use super::templates::location_choice_html;
use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::StructuredExtractionRequest;

const TITLE: &str = "Choose Your Path";
const DESCRIPTION: &str = "Where will you go next?";
const INSTRUCTIONS: &str = "Mark exactly one path. Leave every other box empty.";

const SCAN_INSTRUCTIONS: &str = "This is a play-by-mail turn sheet on which the player \
chooses where to travel. Find the single path whose box the player marked and report its \
location_id from the context. Report an empty list if no box is marked.";

pub struct LocationChoiceProcessor {
    services: Arc<TurnSheetServices>,
}

impl LocationChoiceProcessor {
    pub fn new(services: Arc<TurnSheetServices>) -> Self {
        Self { services }
    }

    fn sheet_html(sheet_data: &Value) -> Result<(LocationChoiceSheetData, String), TurnSheetError> {
        let mut data: LocationChoiceSheetData = parse_sheet_data(sheet_data)?;
        data.header.validate()?;
        data.header = data.header.with_defaults(TITLE, DESCRIPTION, INSTRUCTIONS);
        let html = location_choice_html(&data);
        Ok((data, html))
    }

    pub async fn generate_turn_sheet(
        &self,
        format: DocumentFormat,
        sheet_data: &Value,
    ) -> Result<Vec<u8>, TurnSheetError> {
        let (_, html) = Self::sheet_html(sheet_data)?;
        render_document(&self.services, format, html).await
    }

    pub async fn scan_turn_sheet(
        &self,
        sheet_data: &Value,
        image: &[u8],
    ) -> Result<Value, TurnSheetError> {
        let (data, html) = Self::sheet_html(sheet_data)?;
        let template = self.services.renderer.render_png(&html).await?;

        let mut context = vec![format!("Current location: {}", data.location_name)];
        context.extend(data.location_options.iter().map(|option| {
            format!(
                "Path \"{}\" has location_id {}",
                option.location_link_name, option.location_id
            )
        }));

        let request = StructuredExtractionRequest {
            instructions: SCAN_INSTRUCTIONS.to_string(),
            context,
            template_image: Some(template),
            filled_image: image.to_vec(),
            schema: json!({ "choices": ["<location_id>"] }),
        };
        let answer = self.services.extractor.extract_structured(&request).await?;

        let scan = LocationChoiceScanData::from_json(&extract_json_object(&answer)?)?;
        scan.validate_against(&data)?;
        to_sheet_value(&scan)
    }

    pub async fn process_turn_sheet_response(
        &self,
        model: &mut Model,
        instance: &GameInstance,
        character: &mut CharacterInstance,
        sheet: &GameTurnSheet,
    ) -> Result<(), TurnSheetError> {
        let data: LocationChoiceSheetData = parse_sheet_data(sheet.sheet_data())?;
        let scan = LocationChoiceScanData::from_json(&scanned_json(sheet)?)?;
        let destination = scan.validate_against(&data)?;

        let target = model.get_location_instance(destination).await.map_err(|e| {
            if e.is_not_found() {
                TurnSheetError::invalid_choice(format!("location {} does not exist", destination))
            } else {
                e.into()
            }
        })?;
        if target.game_instance_id != instance.id() {
            return Err(TurnSheetError::invalid_choice(format!(
                "location {} belongs to another game instance",
                destination
            )));
        }

        let from = character.current_location_instance_id;
        character.move_to(target.id, model.now());
        model.update_character_instance(character).await?;

        tracing::debug!(
            character_instance_id = %character.id,
            from = %from,
            to = %target.id,
            "Character moved"
        );
        Ok(())
    }

    pub async fn create_next_turn_sheet(
        &self,
        model: &mut Model,
        ctx: SheetContext<'_>,
        character: &CharacterInstance,
    ) -> Result<GameTurnSheet, TurnSheetError> {
        let here = model
            .get_location_instance(character.current_location_instance_id)
            .await?;
        let location = model.get_location(here.location_id).await?;
        let exits = model.list_location_exits(&here).await?;

        let sheet_id = GameTurnSheetId::new();
        let data = LocationChoiceSheetData {
            header: build_header(&self.services.codec, ctx, sheet_id).with_defaults(
                TITLE,
                DESCRIPTION,
                INSTRUCTIONS,
            ),
            location_name: location.name,
            location_description: location.description,
            location_options: exits
                .into_iter()
                .map(|exit| LocationOption {
                    location_id: exit.destination.id,
                    location_link_name: exit.link.name,
                    location_link_description: exit.link.description,
                })
                .collect(),
        };

        let sheet = GameTurnSheet::new(
            ctx.game.id,
            ctx.instance.id(),
            ctx.recipient.account.id,
            ctx.instance.current_turn(),
            SheetType::LocationChoice,
            to_sheet_value(&data)?,
            model.now(),
        )
        .with_id(sheet_id);
        model.create_adventure_turn_sheet(&sheet, character.id).await?;
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockDocumentRendererPort, MockImageExtractionPort};
    use crate::infrastructure::turn_sheet_code::TurnSheetCodec;
    use playbymail_domain::{LocationInstanceId, TurnSheetHeader};

    fn sheet_data(options: &[LocationInstanceId]) -> Value {
        let data = LocationChoiceSheetData {
            header: TurnSheetHeader {
                game_name: "Caves".into(),
                game_type: "adventure".into(),
                turn_number: 3,
                ..Default::default()
            },
            location_name: "Entrance".into(),
            location_description: String::new(),
            location_options: options
                .iter()
                .enumerate()
                .map(|(i, id)| LocationOption {
                    location_id: *id,
                    location_link_name: format!("Path {}", i),
                    location_link_description: String::new(),
                })
                .collect(),
        };
        serde_json::to_value(data).unwrap()
    }

    fn processor(extractor: MockImageExtractionPort) -> LocationChoiceProcessor {
        let mut renderer = MockDocumentRendererPort::new();
        renderer
            .expect_render_png()
            .returning(|_| Ok(b"blank".to_vec()));
        LocationChoiceProcessor::new(Arc::new(TurnSheetServices::new(
            Arc::new(renderer),
            Arc::new(extractor),
            TurnSheetCodec::new("test"),
        )))
    }

    #[tokio::test]
    async fn scan_returns_canonical_choice() {
        let chosen = LocationInstanceId::new();
        let answer = format!("```json\n{{\"choices\": [\"{}\"]}}\n```", chosen);
        let mut extractor = MockImageExtractionPort::new();
        extractor
            .expect_extract_structured()
            .withf(|request| {
                request.template_image.as_deref() == Some(b"blank".as_slice())
                    && request.context.iter().any(|line| line.contains("Path 0"))
            })
            .times(1)
            .returning(move |_| Ok(answer.clone()));

        let data = sheet_data(&[LocationInstanceId::new(), chosen]);
        let scanned = processor(extractor)
            .scan_turn_sheet(&data, b"filled")
            .await
            .unwrap();
        assert_eq!(scanned, json!({ "choices": [chosen.to_string()] }));
    }

    #[tokio::test]
    async fn scan_rejects_unoffered_locations() {
        let mut extractor = MockImageExtractionPort::new();
        let stray = LocationInstanceId::new();
        extractor
            .expect_extract_structured()
            .returning(move |_| Ok(format!("{{\"choices\": [\"{}\"]}}", stray)));

        let data = sheet_data(&[LocationInstanceId::new()]);
        let err = processor(extractor)
            .scan_turn_sheet(&data, b"filled")
            .await
            .unwrap_err();
        assert!(matches!(err, TurnSheetError::InvalidChoice(_)));
    }

    #[tokio::test]
    async fn generate_html_fills_defaults_and_is_stable() {
        let processor = processor(MockImageExtractionPort::new());
        let data = sheet_data(&[LocationInstanceId::new()]);
        let first = processor
            .generate_turn_sheet(DocumentFormat::Html, &data)
            .await
            .unwrap();
        let second = processor
            .generate_turn_sheet(DocumentFormat::Html, &data)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(String::from_utf8(first).unwrap().contains(TITLE));
    }

    #[tokio::test]
    async fn generate_requires_a_game_name() {
        let processor = processor(MockImageExtractionPort::new());
        let mut data = sheet_data(&[]);
        data["game_name"] = json!("");
        let err = processor
            .generate_turn_sheet(DocumentFormat::Html, &data)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnSheetError::Domain(_)));
    }
}
