//! Visual artifacts. These only read the comparison table and point sets.

use _model::Provider;

mod boxplot;
mod map;

pub use boxplot::boxplot;
pub use map::{bubble_map, point_map, MapView};

pub const KNOWN_COLOR: &str = "#5b396b";
pub const NO_MATCH_COLOR: &str = "black";

/// Marker color on the maps.
pub fn map_color(provider: Provider) -> &'static str {
    match provider {
        Provider::Nominatim => "orange",
        Provider::Google => "green",
        Provider::ArcGis => "red",
        Provider::Bing => "blue",
    }
}

/// Box fill on the distance chart.
pub fn plot_color(provider: Provider) -> &'static str {
    match provider {
        Provider::Nominatim => "darkorange",
        Provider::Google => "lawngreen",
        Provider::ArcGis => "red",
        Provider::Bing => "deepskyblue",
    }
}

fn escape(x: &str) -> String {
    x.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
