//! Demo data seeding for local exercise of the engine.
//!
//! Provisions two locations (a warehouse origin and a store
//! destination), a small product catalog, a blueprint, a loadout at
//! the store declaring lot reservations, and stocked inventory lots at
//! the warehouse. Safe to run once per empty database; refuses to run
//! against a database that already holds locations.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

/// Seed the demo dataset.
///
/// # Errors
///
/// Returns an error if the database already holds data or a statement
/// fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wms.location")
        .fetch_one(&pool)
        .await?;
    if existing > 0 {
        return Err("Database already holds locations; refusing to seed".into());
    }

    let warehouse = insert_location(&pool, "Central Warehouse", "WH-1").await?;
    let store = insert_location(&pool, "Downtown Store", "ST-1").await?;

    let espresso = insert_product(&pool, "SKU-ESP-250", Some("06128000011"), "Espresso Beans 250g").await?;
    let filters = insert_product(&pool, "SKU-FLT-100", Some("06128000042"), "Paper Filters x100").await?;
    let cups = insert_product(&pool, "SKU-CUP-12", None, "Ceramic Cups 12-pack").await?;

    let (blueprint,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO wms.blueprint (name, description, allow_quantity_override)
        VALUES ('Cafe restock', 'Weekly cafe replenishment', TRUE)
        RETURNING id
        ",
    )
    .fetch_one(&pool)
    .await?;

    insert_blueprint_line(&pool, blueprint, espresso, 2, 10, 24, 0).await?;
    insert_blueprint_line(&pool, blueprint, filters, 1, 4, 8, 1).await?;
    insert_blueprint_line(&pool, blueprint, cups, 0, 2, 6, 2).await?;

    let (loadout,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO wms.loadout (blueprint_id, location_id, serial_number, notes)
        VALUES ($1, $2, 'LD-0001', 'Demo loadout')
        RETURNING id
        ",
    )
    .bind(blueprint)
    .bind(store)
    .fetch_one(&pool)
    .await?;

    let lot_a = insert_lot(&pool, espresso, warehouse, "LOT-A", 4, "A1").await?;
    insert_lot(&pool, espresso, warehouse, "LOT-B", 20, "A2").await?;
    insert_lot(&pool, filters, warehouse, "LOT-F1", 12, "B1").await?;
    insert_lot(&pool, cups, warehouse, "LOT-C1", 6, "C4").await?;

    // Declared reservations: one live lot, one by number only.
    sqlx::query(
        r"
        INSERT INTO wms.loadout_lot (loadout_id, product_id, lot_id, lot_number, quantity)
        VALUES ($1, $2, $3, 'LOT-A', $4)
        ",
    )
    .bind(loadout)
    .bind(espresso)
    .bind(lot_a)
    .bind(Decimal::from(4))
    .execute(&pool)
    .await?;
    sqlx::query(
        r"
        INSERT INTO wms.loadout_lot (loadout_id, product_id, lot_number, quantity)
        VALUES ($1, $2, 'LOT-F1', $3)
        ",
    )
    .bind(loadout)
    .bind(filters)
    .bind(Decimal::from(4))
    .execute(&pool)
    .await?;

    info!(
        warehouse_id = warehouse,
        store_id = store,
        blueprint_id = blueprint,
        loadout_id = loadout,
        "Demo data seeded"
    );
    Ok(())
}

async fn insert_location(
    pool: &PgPool,
    name: &str,
    code: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    let (id,): (i32,) =
        sqlx::query_as("INSERT INTO wms.location (name, code) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(code)
            .fetch_one(pool)
            .await?;
    Ok(id)
}

async fn insert_product(
    pool: &PgPool,
    sku: &str,
    gtin: Option<&str>,
    name: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO wms.product (sku, gtin, name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(sku)
    .bind(gtin)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn insert_blueprint_line(
    pool: &PgPool,
    blueprint_id: i32,
    product_id: i32,
    min: i64,
    default: i64,
    max: i64,
    position: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    sqlx::query(
        r"
        INSERT INTO wms.blueprint_line
            (blueprint_id, product_id, minimum_quantity, default_quantity, maximum_quantity, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(blueprint_id)
    .bind(product_id)
    .bind(Decimal::from(min))
    .bind(Decimal::from(default))
    .bind(Decimal::from(max))
    .bind(position)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_lot(
    pool: &PgPool,
    product_id: i32,
    location_id: i32,
    lot_number: &str,
    on_hand: i64,
    aisle: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO wms.inventory_lot
            (product_id, location_id, lot_number, quantity_on_hand, aisle, rack, shelf, bin, zone)
        VALUES ($1, $2, $3, $4, $5, '1', '2', '03', 'ambient')
        RETURNING id
        ",
    )
    .bind(product_id)
    .bind(location_id)
    .bind(lot_number)
    .bind(Decimal::from(on_hand))
    .bind(aisle)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
