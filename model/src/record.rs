use crate::{Coordinate, Provider};

/// One row of the source table. Created once during ingestion and only read
/// afterwards; `id` is the join key every later stage refers back to.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressRecord {
    pub id: u32,
    pub name: String,
    pub address: String,
    pub known_coordinate: Option<Coordinate>,
}

/// Outcome of geocoding one record with one provider. `coordinate` is `None`
/// when the provider could not resolve the address.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeResult {
    pub record_id: u32,
    pub provider: Provider,
    pub coordinate: Option<Coordinate>,
}

impl GeocodeResult {
    pub fn succeeded(&self) -> bool {
        self.coordinate.is_some()
    }
}
