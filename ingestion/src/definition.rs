use serde::{Deserialize, Serialize};
use wayfinder_core::model::{Connection, Location, Product};

/// Source catalog as authored by venue operators:
/// `{"lines": [...], "products": [...], "connections": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogDefinition {
    #[serde(default)]
    pub lines: Vec<LineDef>,
    #[serde(default)]
    pub products: Vec<ProductDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    pub line_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDef {
    pub source: u64,
    pub target: u64,
    pub distance: f32,
    pub direction: String,
}

impl CatalogDefinition {
    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn locations(&self) -> Vec<Location> {
        self.lines
            .iter()
            .map(|l| Location::new(l.id, &l.name, &l.description))
            .collect()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products
            .iter()
            .map(|p| Product::new(p.id, &p.name, &p.description, p.price, p.line_id))
            .collect()
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.connections
            .iter()
            .map(|c| Connection::new(c.source, c.target, c.distance, &c.direction))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_maps_line_ids_onto_products() {
        let def = CatalogDefinition::parse_json(
            r#"{
                "lines": [{"id": 1, "name": "Produce", "description": "Fruit"}],
                "products": [{"id": 4, "name": "Apples", "price": 0.5, "line_id": 1}],
                "connections": [{"source": 0, "target": 1, "distance": 12.5, "direction": "North"}]
            }"#,
        )
        .unwrap();

        assert_eq!(def.locations()[0].name, "Produce");
        let products = def.products();
        assert_eq!(products[0].location_id, 1);
        assert_eq!(products[0].description, "");
        assert_eq!(def.connections()[0], Connection::new(0, 1, 12.5, "North"));
    }

    #[test]
    fn parse_json_tolerates_missing_sections() {
        let def = CatalogDefinition::parse_json("{}").unwrap();
        assert_eq!(def, CatalogDefinition::default());
    }
}
