//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use serde_json::{json, Value};
use tessel_core::Database;
use tessel_engine::{CollectionSchema, IndexSchema, MemoryEngine};

/// Generates `count` product records with random prices in `0..10_000`.
pub fn random_products(count: usize) -> Vec<Value> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|id| json!({"id": id, "price": rng.gen_range(0..10_000), "sku": format!("sku-{id:06}")}))
        .collect()
}

/// An engine with a `products` collection indexed on `price`, and an
/// empty `orders` collection.
pub fn empty_shop() -> MemoryEngine {
    MemoryEngine::builder("bench", 1)
        .collection(
            CollectionSchema::new("products")
                .key_path("id")
                .index(IndexSchema::new("price", "price")),
        )
        .collection(CollectionSchema::new("orders").key_path("id").auto_increment())
        .build()
        .expect("Failed to build bench engine")
}

/// A shop database seeded with `count` random products.
pub fn seeded_shop(runtime: &tokio::runtime::Runtime, count: usize) -> Database {
    let db = Database::new(empty_shop());
    let mut chain = db.write(["products"]);
    for product in random_products(count) {
        chain.put("products", product);
    }
    runtime
        .block_on(chain.commit())
        .expect("Failed to seed bench engine");
    db
}
