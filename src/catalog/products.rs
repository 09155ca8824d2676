//! Productos en memoria
//!
//! | Ruta                               | Acción                     |
//! |------------------------------------|----------------------------|
//! | `GET /products`                    | listar                     |
//! | `GET /products/:id`                | uno por id                 |
//! | `POST /products`                   | crear                      |
//! | `PUT /products/:id`                | reemplazar                 |
//! | `DELETE /products/:id`             | borrar                     |
//! | `PATCH /products/:id/stock`        | `{"stockQuantity": n}`     |
//! | `PATCH /products/:id/price`        | `{"price": n}`             |
//! | `GET /products/category/:category` | filtrar por categoría      |

use super::{respond, CatalogError};
use crate::codec::{self, LocalDateTime, Map, Value};
use crate::record;
use crate::router::{path_segment_from_end, Router};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: Option<LocalDateTime>,
    pub updated_at: Option<LocalDateTime>,
}

record!(Product {
    id => "id",
    name => "name",
    description => "description",
    price => "price",
    stock_quantity => "stockQuantity",
    category => "category",
    image_url => "imageUrl",
    active => "active",
    created_at => "createdAt",
    updated_at => "updatedAt",
});

impl Product {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::Invalid("Product name cannot be empty".into()));
        }
        if self.price < 0.0 || !self.price.is_finite() {
            return Err(CatalogError::Invalid("Product price cannot be negative".into()));
        }
        if self.stock_quantity < 0 {
            return Err(CatalogError::Invalid("Stock quantity cannot be negative".into()));
        }
        Ok(())
    }
}

struct Inventory {
    products: BTreeMap<i64, Product>,
    next_id: i64,
}

/// Almacén de productos protegido por `RwLock`
pub struct ProductStore {
    inner: RwLock<Inventory>,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inventory {
                products: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn get(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let inventory = self.inner.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(inventory.products.get(&id).cloned())
    }

    pub fn all(&self) -> Result<Vec<Product>, CatalogError> {
        let inventory = self.inner.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(inventory.products.values().cloned().collect())
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        let inventory = self.inner.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(inventory
            .products
            .values()
            .filter(|p| p.category.as_deref() == Some(category))
            .cloned()
            .collect())
    }

    /// Asigna id y fechas que falten
    pub fn create(&self, mut product: Product) -> Result<Product, CatalogError> {
        product.validate()?;
        let now = LocalDateTime::now();
        product.created_at.get_or_insert(now);
        product.updated_at.get_or_insert(now);

        let mut inventory = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        let id = inventory.next_id;
        inventory.next_id += 1;
        product.id = Some(id);
        inventory.products.insert(id, product.clone());
        Ok(product)
    }

    /// Reemplaza todo salvo `id` y `createdAt`
    pub fn update(&self, id: i64, mut product: Product) -> Result<Product, CatalogError> {
        product.validate()?;
        let mut inventory = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        let existing = inventory
            .products
            .get(&id)
            .ok_or(CatalogError::NotFound(id))?;

        product.id = Some(id);
        product.created_at = existing.created_at;
        product.updated_at = Some(LocalDateTime::now());
        inventory.products.insert(id, product.clone());
        Ok(product)
    }

    pub fn delete(&self, id: i64) -> Result<bool, CatalogError> {
        let mut inventory = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        Ok(inventory.products.remove(&id).is_some())
    }

    pub fn update_stock(&self, id: i64, quantity: i32) -> Result<Product, CatalogError> {
        if quantity < 0 {
            return Err(CatalogError::Invalid("Stock quantity cannot be negative".into()));
        }
        self.modify(id, |product| product.stock_quantity = quantity)
    }

    pub fn update_price(&self, id: i64, price: f64) -> Result<Product, CatalogError> {
        if price < 0.0 || !price.is_finite() {
            return Err(CatalogError::Invalid("Price cannot be negative".into()));
        }
        self.modify(id, |product| product.price = price)
    }

    fn modify(&self, id: i64, change: impl FnOnce(&mut Product)) -> Result<Product, CatalogError> {
        let mut inventory = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        let product = inventory
            .products
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;
        change(product);
        product.updated_at = Some(LocalDateTime::now());
        Ok(product.clone())
    }
}

/// Registra las rutas de productos
pub fn register_routes(router: &mut Router, store: Arc<ProductStore>) {
    let s = Arc::clone(&store);
    router.get("/products", move |_, _, _| Ok(codec::to_json(&s.all()?)));

    let s = Arc::clone(&store);
    router.get("/products/:id", move |path, _, _| {
        respond(parse_id(path, 0).and_then(|id| match s.get(id)? {
            Some(product) => Ok(codec::to_json(&product)),
            None => Err(CatalogError::NotFound(id)),
        }))
    });

    let s = Arc::clone(&store);
    router.post("/products", move |_, body, _| {
        respond(
            codec::from_json::<Product>(body)
                .map_err(CatalogError::from)
                .and_then(|product| s.create(product))
                .map(|product| codec::to_json(&product)),
        )
    });

    let s = Arc::clone(&store);
    router.put("/products/:id", move |path, body, _| {
        respond(parse_id(path, 0).and_then(|id| {
            let product = codec::from_json::<Product>(body)?;
            Ok(codec::to_json(&s.update(id, product)?))
        }))
    });

    let s = Arc::clone(&store);
    router.delete("/products/:id", move |path, _, _| {
        respond(parse_id(path, 0).and_then(|id| {
            if s.delete(id)? {
                let mut body = Map::new();
                body.insert("message", "Product deleted successfully");
                Ok(codec::to_json(&body))
            } else {
                Err(CatalogError::NotFound(id))
            }
        }))
    });

    let s = Arc::clone(&store);
    router.patch("/products/:id/stock", move |path, body, _| {
        respond(parse_id(path, 1).and_then(|id| {
            let quantity = required_field(body, "stockQuantity", "Stock quantity is required")?;
            let quantity = codec::FromValue::from_value(&quantity).map_err(|_| {
                CatalogError::Invalid("Invalid product ID or stock quantity format".into())
            })?;
            Ok(codec::to_json(&s.update_stock(id, quantity)?))
        }))
    });

    let s = Arc::clone(&store);
    router.patch("/products/:id/price", move |path, body, _| {
        respond(parse_id(path, 1).and_then(|id| {
            let price = required_field(body, "price", "Price is required")?;
            let price = price
                .as_f64()
                .ok_or_else(|| CatalogError::Invalid("Invalid price format".into()))?;
            Ok(codec::to_json(&s.update_price(id, price)?))
        }))
    });

    let s = store;
    router.get("/products/category/:category", move |path, _, _| {
        let category = path_segment_from_end(path, 0).unwrap_or_default();
        Ok(codec::to_json(&s.by_category(category)?))
    });
}

/// Id numérico tomado `from_end` segmentos antes del final
fn parse_id(path: &str, from_end: usize) -> Result<i64, CatalogError> {
    path_segment_from_end(path, from_end)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| CatalogError::Invalid("Invalid product ID format".into()))
}

fn required_field(body: &str, key: &str, missing: &str) -> Result<Value, CatalogError> {
    let data: Map = codec::from_json(body)?;
    data.get(key)
        .cloned()
        .ok_or_else(|| CatalogError::Invalid(missing.to_string()))
}
