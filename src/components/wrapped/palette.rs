use serde::Serialize;
use std::collections::BTreeMap;

/// Category used for events without a color id
pub const DEFAULT_COLOR_KEY: &str = "default";

/// Neutral gray for the default and unknown categories
pub const DEFAULT_HEX: &str = "#9e9e9e";

pub const DEFAULT_NAME: &str = "Default";

/// One Google Calendar event color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteColor {
    pub id: &'static str,
    pub hex_color: &'static str,
    pub name: &'static str,
}

/// The fixed event color table, ids "1" to "11"
pub const PALETTE: [PaletteColor; 11] = [
    PaletteColor { id: "1", hex_color: "#7986cb", name: "Lavender" },
    PaletteColor { id: "2", hex_color: "#33b679", name: "Sage" },
    PaletteColor { id: "3", hex_color: "#8e24aa", name: "Grape" },
    PaletteColor { id: "4", hex_color: "#e67c73", name: "Flamingo" },
    PaletteColor { id: "5", hex_color: "#f6bf26", name: "Banana" },
    PaletteColor { id: "6", hex_color: "#f4511e", name: "Tangerine" },
    PaletteColor { id: "7", hex_color: "#039be5", name: "Peacock" },
    PaletteColor { id: "8", hex_color: "#616161", name: "Graphite" },
    PaletteColor { id: "9", hex_color: "#3f51b5", name: "Blueberry" },
    PaletteColor { id: "10", hex_color: "#0b8043", name: "Basil" },
    PaletteColor { id: "11", hex_color: "#d60000", name: "Tomato" },
];

/// Look up a palette entry by id
pub fn find(color_id: &str) -> Option<&'static PaletteColor> {
    PALETTE.iter().find(|color| color.id == color_id)
}

/// Whether `color_id` names one of the palette colors
pub fn is_event_color(color_id: &str) -> bool {
    find(color_id).is_some()
}

/// Hex color for a category, gray for "default" and unknown ids
pub fn hex_for(key: &str) -> &'static str {
    find(key).map(|c| c.hex_color).unwrap_or(DEFAULT_HEX)
}

/// Display name for a category, "Default" for "default" and unknown ids
pub fn name_for(key: &str) -> &'static str {
    find(key).map(|c| c.name).unwrap_or(DEFAULT_NAME)
}

/// Parallel arrays for the pie chart, ordered by descending hours
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub keys: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

impl ChartData {
    /// Sort categories by descending hours and resolve names and colors
    pub fn from_breakdown(breakdown: &BTreeMap<String, f64>) -> Self {
        let mut entries: Vec<(&String, f64)> = breakdown.iter().map(|(k, v)| (k, *v)).collect();
        // Stable, so equal totals keep key order
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut chart = ChartData::default();
        for (key, hours) in entries {
            chart.keys.push(key.clone());
            chart.labels.push(name_for(key).to_string());
            chart.values.push(hours);
            chart.colors.push(hex_for(key).to_string());
        }
        chart
    }

    /// Show the "default" slice in the user's chosen fallback color
    pub fn with_default_color(mut self, default_color_id: Option<&str>) -> Self {
        let Some(color) = default_color_id.and_then(find) else {
            return self;
        };
        for (key, hex) in self.keys.iter().zip(self.colors.iter_mut()) {
            if key == DEFAULT_COLOR_KEY {
                *hex = color.hex_color.to_string();
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
