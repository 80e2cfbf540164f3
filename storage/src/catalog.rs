use std::collections::HashMap;
use thiserror::Error;
use wayfinder_core::model::{EntityType, Location, Product};

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("duplicate location id {0}")]
    DuplicateLocation(u64),
    #[error("duplicate product id {0}")]
    DuplicateProduct(u64),
    #[error("product {product_id} references unknown location {location_id}")]
    DanglingProduct { product_id: u64, location_id: u64 },
}

/// Read-only locations and products, kept in storage order.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    locations: Vec<Location>,
    products: Vec<Product>,
    location_pos: HashMap<u64, usize>,
    product_pos: HashMap<u64, usize>,
}

impl CatalogStore {
    /// Validates id uniqueness and the product → location foreign key.
    pub fn new(locations: Vec<Location>, products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut location_pos = HashMap::with_capacity(locations.len());
        for (pos, location) in locations.iter().enumerate() {
            if location_pos.insert(location.id, pos).is_some() {
                return Err(CatalogError::DuplicateLocation(location.id));
            }
        }

        let mut product_pos = HashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            if !location_pos.contains_key(&product.location_id) {
                return Err(CatalogError::DanglingProduct {
                    product_id: product.id,
                    location_id: product.location_id,
                });
            }
            if product_pos.insert(product.id, pos).is_some() {
                return Err(CatalogError::DuplicateProduct(product.id));
            }
        }

        Ok(Self {
            locations,
            products,
            location_pos,
            product_pos,
        })
    }

    pub fn location(&self, id: u64) -> Option<&Location> {
        self.location_pos.get(&id).map(|pos| &self.locations[*pos])
    }

    pub fn product(&self, id: u64) -> Option<&Product> {
        self.product_pos.get(&id).map(|pos| &self.products[*pos])
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Case-insensitive exact name lookup.
    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        let needle = name.trim().to_lowercase();
        self.locations
            .iter()
            .find(|location| location.name.to_lowercase() == needle)
    }

    pub fn products_at(&self, location_id: u64) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(move |product| product.location_id == location_id)
    }

    /// Name and description of an embedded entity.
    pub fn describe(&self, entity_type: EntityType, id: u64) -> Option<(&str, &str)> {
        match entity_type {
            EntityType::Location => self
                .location(id)
                .map(|l| (l.name.as_str(), l.description.as_str())),
            EntityType::Product => self
                .product(id)
                .map(|p| (p.name.as_str(), p.description.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CatalogStore {
        CatalogStore::new(
            vec![
                Location::new(0, "Entrance", "Main doors"),
                Location::new(1, "Produce", "Fresh fruit and vegetables"),
            ],
            vec![Product::new(10, "Organic Bananas", "Fair trade", 1.99, 1)],
        )
        .unwrap()
    }

    #[test]
    fn lookups_resolve_by_id_and_name() {
        let catalog = sample();
        assert_eq!(catalog.location(1).unwrap().name, "Produce");
        assert_eq!(catalog.location_by_name("produce").unwrap().id, 1);
        assert!(catalog.location(9).is_none());
        assert_eq!(
            catalog.describe(EntityType::Product, 10),
            Some(("Organic Bananas", "Fair trade"))
        );
        assert_eq!(catalog.products_at(1).count(), 1);
        assert_eq!(catalog.products_at(0).count(), 0);
    }

    #[test]
    fn dangling_product_is_rejected() {
        let err = CatalogStore::new(
            vec![Location::new(0, "Entrance", "")],
            vec![Product::new(1, "Milk", "", 0.99, 5)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DanglingProduct {
                product_id: 1,
                location_id: 5
            }
        );
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let err = CatalogStore::new(
            vec![Location::new(0, "A", ""), Location::new(0, "B", "")],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateLocation(0));
    }
}
