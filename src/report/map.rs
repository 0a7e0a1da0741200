use _model::Provider;
use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::{artifacts::LabeledPoint, compare::ComparisonTable, distance::METRES_PER_FOOT};

use super::{escape, map_color, KNOWN_COLOR, NO_MATCH_COLOR};

const TEMPLATE: &str = include_str!("map.html");

// metres, drawn where the provider has no distance
const NO_MATCH_RADIUS: f64 = 250.0;

#[derive(Debug, Clone, Copy)]
pub struct MapView {
    /// `[latitude, longitude]`; the mean of every marker when `None`.
    pub center: Option<[f64; 2]>,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub color: String,
    /// Circle radius in metres, `None` for a fixed-size point.
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub label: String,
    pub markers: Vec<Marker>,
}

impl Layer {
    pub fn points(label: &str, color: &str, points: &[LabeledPoint]) -> Self {
        Self {
            label: label.to_string(),
            markers: points
                .iter()
                .map(|x| Marker {
                    lat: x.coordinate.latitude,
                    lon: x.coordinate.longitude,
                    name: x.name.clone(),
                    color: color.to_string(),
                    radius: None,
                })
                .collect(),
        }
    }
}

/// A provider's results over the known points.
pub fn point_map(
    view: MapView,
    provider: Provider,
    results: &[LabeledPoint],
    known: &[LabeledPoint],
) -> Result<String> {
    render(
        view,
        &format!("{provider} results and known locations"),
        &[
            Layer::points(provider.name(), map_color(provider), results),
            Layer::points("Known", KNOWN_COLOR, known),
        ],
    )
}

/// Known locations sized by how far off `provider` was. Rows the provider
/// has no distance for are flagged with a fixed black circle.
pub fn bubble_map(view: MapView, table: &ComparisonTable, provider: Provider) -> Result<String> {
    let distances = table.distances(provider).unwrap_or_default();
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for (row, distance) in table.rows.iter().zip(distances) {
        let marker = |color: &str, radius: f64| Marker {
            lat: row.known_coordinate.latitude,
            lon: row.known_coordinate.longitude,
            name: row.name.clone(),
            color: color.to_string(),
            radius: Some(radius),
        };
        match distance {
            Some(feet) => matched.push(marker(map_color(provider), feet * METRES_PER_FOOT)),
            None => missing.push(marker(NO_MATCH_COLOR, NO_MATCH_RADIUS)),
        }
    }

    render(
        view,
        &format!("{provider} distance from known locations"),
        &[
            Layer {
                label: format!("{provider} distance"),
                markers: matched,
            },
            Layer {
                label: "No match".to_string(),
                markers: missing,
            },
        ],
    )
}

fn render(view: MapView, title: &str, layers: &[Layer]) -> Result<String> {
    let center = view.center.unwrap_or_else(|| mean_center(layers));
    let view = json!({ "center": center, "zoom": view.zoom });

    Ok(TEMPLATE
        .replace("__TITLE__", &escape(title))
        .replace("__VIEW__", &script_json(&view)?)
        .replace("__LAYERS__", &script_json(&layers)?))
}

fn mean_center(layers: &[Layer]) -> [f64; 2] {
    let markers: Vec<_> = layers.iter().flat_map(|x| &x.markers).collect();
    if markers.is_empty() {
        return [0.0, 0.0];
    }
    let n = markers.len() as f64;
    [
        markers.iter().map(|x| x.lat).sum::<f64>() / n,
        markers.iter().map(|x| x.lon).sum::<f64>() / n,
    ]
}

// keeps a "</script>" inside the data from ending the script block
fn script_json<T: Serialize + ?Sized>(x: &T) -> Result<String> {
    Ok(serde_json::to_string(x)?.replace("</", "<\\/"))
}
