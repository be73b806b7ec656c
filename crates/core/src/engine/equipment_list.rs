use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::equipment::{EquipmentConfiguration, ForkliftSize, TrailerType};
use crate::errors::DomainError;

/// Opening line item of every equipment list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearLine {
    GearTruck,
    #[default]
    GearTruckAndTrailer,
}

impl GearLine {
    pub fn label(self) -> &'static str {
        match self {
            Self::GearTruck => "Gear truck",
            Self::GearTruckAndTrailer => "Gear truck and trailer",
        }
    }
}

impl FromStr for GearLine {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gear_truck" => Ok(Self::GearTruck),
            "gear_truck_and_trailer" => Ok(Self::GearTruckAndTrailer),
            other => {
                Err(DomainError::UnknownOption { field: "gear_line", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquipmentListOptions {
    pub gear_line: GearLine,
    /// Render a single unpaired Rolldeck as "and a Rolldeck" instead of
    /// "Rolldeck trailer".
    pub rolldeck_phrase: bool,
}

impl Default for EquipmentListOptions {
    fn default() -> Self {
        Self { gear_line: GearLine::default(), rolldeck_phrase: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LineItem {
    text: String,
    lone_rolldeck: bool,
}

impl LineItem {
    fn plain(text: String) -> Self {
        Self { text, lone_rolldeck: false }
    }
}

/// Builds the ordered, de-duplicated equipment line items.
///
/// Order is gear line, trailers, forklifts, then tractors. With more than one
/// trailer or tractor row, tractor `i` is folded into trailer `i`
/// ("Stepdeck with 4-axel tractor"). Repeated items collapse into "(Qty: N)".
pub fn equipment_items(
    equipment: &EquipmentConfiguration,
    options: &EquipmentListOptions,
) -> Vec<String> {
    let mut items = vec![LineItem::plain(options.gear_line.label().to_string())];

    let paired = equipment.trailers.len() > 1 || equipment.tractors.len() > 1;
    let mut paired_tractors = 0;
    for (index, trailer) in equipment.trailers.iter().enumerate() {
        match equipment.tractors.get(index).filter(|_| paired) {
            Some(tractor) => {
                items.push(LineItem::plain(format!("{trailer} with {tractor} tractor")));
                paired_tractors += 1;
            }
            None => items.push(LineItem {
                text: format!("{trailer} trailer"),
                lone_rolldeck: *trailer == TrailerType::Rolldeck,
            }),
        }
    }

    items.extend(equipment.forklifts.iter().map(|forklift| LineItem::plain(forklift_item(forklift))));

    items.extend(
        equipment
            .tractors
            .iter()
            .skip(paired_tractors)
            .map(|tractor| LineItem::plain(format!("{tractor} tractor"))),
    );

    count_items(items)
        .into_iter()
        .map(|(item, quantity)| match quantity {
            1 if item.lone_rolldeck && options.rolldeck_phrase => "and a Rolldeck".to_string(),
            1 => item.text,
            _ => format!("{} (Qty: {quantity})", item.text),
        })
        .collect()
}

pub fn format_equipment_list(items: &[String]) -> String {
    items.join(", ")
}

fn forklift_item(forklift: &ForkliftSize) -> String {
    if forklift.is_counterbalance() {
        format!("{forklift} forklift")
    } else {
        forklift.to_string()
    }
}

fn count_items(items: Vec<LineItem>) -> Vec<(LineItem, usize)> {
    let mut counted: Vec<(LineItem, usize)> = Vec::with_capacity(items.len());
    for item in items {
        match counted.iter_mut().find(|(existing, _)| existing.text == item.text) {
            Some((_, quantity)) => *quantity += 1,
            None => counted.push((item, 1)),
        }
    }
    counted
}
