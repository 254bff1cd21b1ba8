//! HTML templates for printed turn sheets.
//!
//! Templates are pure functions of the sheet data: the same input always renders
//! the same bytes. The blank sheet sent to the vision model as the template image
//! is this same HTML.

use playbymail_domain::{
    EquipmentSlot, InventoryManagementSheetData, LocationChoiceSheetData, TurnSheetHeader,
};

const BOX: &str = "&#9744;";

const STYLE: &str = "body{font-family:Georgia,serif;margin:24px;color:#111}\
h1{font-size:22px;margin:0 0 4px}\
.meta{font-size:12px;color:#444;margin-bottom:12px}\
.code{font-family:monospace;font-size:11px;word-break:break-all;border:1px solid #999;padding:4px}\
table{border-collapse:collapse;width:100%;margin:8px 0}\
td,th{border:1px solid #777;padding:4px 6px;font-size:13px;text-align:left}\
.box{font-size:18px;text-align:center;width:48px}\
.instructions{font-style:italic;margin:8px 0}";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{}</style></head><body>\n{}</body></html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn header_html(header: &TurnSheetHeader) -> String {
    let deadline = header
        .turn_sheet_deadline
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "<h1>{}</h1>\n\
         <div class=\"meta\">{} &middot; Turn {} &middot; {} &lt;{}&gt; &middot; Return by {}</div>\n\
         <h2>{}</h2>\n<p>{}</p>\n<p class=\"instructions\">{}</p>\n",
        escape_html(&header.game_name),
        escape_html(&header.game_type),
        header.turn_number,
        escape_html(&header.account_name),
        escape_html(&header.account_email),
        deadline,
        escape_html(&header.turn_sheet_title),
        escape_html(&header.turn_sheet_description),
        escape_html(&header.turn_sheet_instructions),
    )
}

fn code_html(header: &TurnSheetHeader) -> String {
    format!(
        "<p>Sheet code:</p>\n<div class=\"code\">{}</div>\n",
        escape_html(&header.turn_sheet_code)
    )
}

pub fn location_choice_html(data: &LocationChoiceSheetData) -> String {
    let mut body = header_html(&data.header);
    body.push_str(&format!(
        "<h3>You are at {}</h3>\n<p>{}</p>\n",
        escape_html(&data.location_name),
        escape_html(&data.location_description)
    ));

    body.push_str("<table>\n<tr><th class=\"box\">Go</th><th>Path</th><th>Description</th></tr>\n");
    for option in &data.location_options {
        body.push_str(&format!(
            "<tr><td class=\"box\">{}</td><td>{}</td><td>{}</td></tr>\n",
            BOX,
            escape_html(&option.location_link_name),
            escape_html(&option.location_link_description)
        ));
    }
    if data.location_options.is_empty() {
        body.push_str("<tr><td colspan=\"3\">There is no way out of here.</td></tr>\n");
    }
    body.push_str("</table>\n");
    body.push_str(&code_html(&data.header));

    page(&data.header.turn_sheet_title, &body)
}

pub fn inventory_management_html(data: &InventoryManagementSheetData) -> String {
    let mut body = header_html(&data.header);
    body.push_str(&format!(
        "<h3>{} at {}</h3>\n<p>Carrying {} of {} items.</p>\n",
        escape_html(&data.character_name),
        escape_html(&data.current_location_name),
        data.inventory_count,
        data.inventory_capacity
    ));

    body.push_str("<h3>Equipped</h3>\n<table>\n");
    for slot in EquipmentSlot::all() {
        let occupant = data
            .equipment_slots
            .get(*slot)
            .map(|item| escape_html(&item.name))
            .unwrap_or_else(|| "&mdash;".to_string());
        body.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            slot.display_name(),
            occupant
        ));
    }
    body.push_str("</table>\n");

    body.push_str(
        "<h3>Carried</h3>\n<table>\n<tr><th>Item</th><th class=\"box\">Drop</th>\
         <th class=\"box\">Unequip</th><th class=\"box\">Equip</th><th>Slot</th></tr>\n",
    );
    for item in &data.current_inventory {
        let unequip = if item.is_equipped { BOX } else { "" };
        let equip = if item.can_be_equipped && !item.is_equipped {
            BOX
        } else {
            ""
        };
        let slot = item
            .equipment_slot
            .or(item.allowed_slot)
            .map(|s| s.display_name())
            .unwrap_or("");
        body.push_str(&format!(
            "<tr><td>{}</td><td class=\"box\">{}</td><td class=\"box\">{}</td>\
             <td class=\"box\">{}</td><td>{}</td></tr>\n",
            escape_html(&item.name),
            BOX,
            unequip,
            equip,
            slot
        ));
    }
    body.push_str("</table>\n");

    body.push_str(
        "<h3>Here</h3>\n<table>\n<tr><th>Item</th><th class=\"box\">Pick up</th>\
         <th class=\"box\">Equip</th><th>Slot</th></tr>\n",
    );
    for item in &data.location_items {
        let equip = if item.can_be_equipped { BOX } else { "" };
        let slot = item.allowed_slot.map(|s| s.display_name()).unwrap_or("");
        body.push_str(&format!(
            "<tr><td>{}</td><td class=\"box\">{}</td><td class=\"box\">{}</td><td>{}</td></tr>\n",
            escape_html(&item.name),
            BOX,
            equip,
            slot
        ));
    }
    body.push_str("</table>\n");
    body.push_str(&code_html(&data.header));

    page(&data.header.turn_sheet_title, &body)
}
