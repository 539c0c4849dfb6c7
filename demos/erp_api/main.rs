//! ERP list API example
//!
//! Serves every resource of the built-in catalog from in-memory stores seeded
//! with a few branches, customers, products, sales, purchases and expenses.
//!
//! ```sh
//! cargo run --example erp_api [config.yaml]
//! ```
//!
//! Identity comes from gateway headers:
//!
//! ```sh
//! curl -H 'x-user-id: 7b0c5c8e-64a4-4a3e-9d6f-1f7f7f6a2c11' -H 'x-user-role: admin' \
//!     'http://127.0.0.1:3000/sales?query=inv-2024&pageSize=5'
//! ```

use chrono::{Duration, TimeZone};
use tally::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,tower_http=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TallyConfig::from_yaml_file(&path)?,
        None => TallyConfig::default_config(),
    };
    let bind = config.server.bind.clone();

    let seed = Seed::generate();
    tracing::info!(
        branches = seed.branches.len(),
        sales = seed.sales.len(),
        purchases = seed.purchases.len(),
        "seeded in-memory stores"
    );

    println!("🚀 Starting tally ERP API on http://{}", bind);
    println!("\n📚 List routes (GET /{{plural}} and GET /{{plural}}/{{id}}):");
    for resource in &config.resources {
        println!("    /{:<12} roles: {}", resource.plural, resource.roles.join(", "));
    }
    println!("\n🔑 Headers: x-user-id, x-user-role, x-branch-id");
    println!("🧪 Try: ?page=2&pageSize=5&query=inv&branchId=<id>&dateRange=2024-01-01_2024-01-31\n");

    ServerBuilder::new(config)
        .with_session_provider(HeaderSessionProvider)
        .register_resource::<Branch, _>(InMemoryDataService::with_entities(seed.branches))
        .register_resource::<Category, _>(InMemoryDataService::with_entities(seed.categories))
        .register_resource::<Customer, _>(InMemoryDataService::with_entities(seed.customers))
        .register_resource::<Supplier, _>(InMemoryDataService::with_entities(seed.suppliers))
        .register_resource::<Product, _>(InMemoryDataService::with_entities(seed.products))
        .register_resource::<Sale, _>(InMemoryDataService::with_entities(seed.sales))
        .register_resource::<Purchase, _>(InMemoryDataService::with_entities(seed.purchases))
        .register_resource::<Expense, _>(InMemoryDataService::with_entities(seed.expenses))
        .register_resource::<StaffUser, _>(InMemoryDataService::with_entities(seed.users))
        .serve(&bind)
        .await
}

/// Demo documents, cross-referenced by id
struct Seed {
    branches: Vec<Branch>,
    categories: Vec<Category>,
    customers: Vec<Customer>,
    suppliers: Vec<Supplier>,
    products: Vec<Product>,
    sales: Vec<Sale>,
    purchases: Vec<Purchase>,
    expenses: Vec<Expense>,
    users: Vec<StaffUser>,
}

impl Seed {
    fn generate() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let day = |n: i64| start + Duration::days(n);

        let branches = vec![
            Branch::new("active".into(), "Downtown".into(), "12 Market St".into(), "555-0101".into()),
            Branch::new("active".into(), "Harbor".into(), "3 Pier Rd".into(), "555-0102".into()),
        ];
        let branch = |i: usize| Some(branches[i % branches.len()].id);

        let categories = vec![
            Category::new("active".into(), "Beverages".into(), "Drinks and juices".into()),
            Category::new("active".into(), "Utilities".into(), "Power, water, internet".into()),
        ];

        let customers: Vec<Customer> = ["Ada Traders", "Bola Stores", "Chen Foods", "Dara Market"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let due = if i % 2 == 0 { 0.0 } else { 25.0 * i as f64 };
                Customer::new(
                    if due > 0.0 { "owing" } else { "active" }.into(),
                    name.to_string(),
                    format!("555-02{:02}", i),
                    format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                    if i < 2 { "wholesale" } else { "retail" }.into(),
                    branch(i),
                    due,
                )
            })
            .collect();

        let suppliers = vec![
            Supplier::new(
                "active".into(),
                "Kofi Mensah".into(),
                "Northwind Traders".into(),
                "555-0301".into(),
                "kofi@northwind.example".into(),
                120.0,
            ),
            Supplier::new(
                "active".into(),
                "Lena Park".into(),
                "Contoso Wholesale".into(),
                "555-0302".into(),
                "lena@contoso.example".into(),
                0.0,
            ),
        ];

        let users = vec![
            StaffUser::new("active".into(), "Admin".into(), "admin@example.com".into(), "admin".into(), None),
            StaffUser::new("active".into(), "Maya".into(), "maya@example.com".into(), "branch".into(), branch(0)),
            StaffUser::new("active".into(), "Sam".into(), "sam@example.com".into(), "staff".into(), branch(1)),
        ];

        let products: Vec<Product> = ["Orange Juice 1L", "Mineral Water 500ml", "Cola 330ml"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Product::new(
                    "active".into(),
                    name.to_string(),
                    format!("SKU-{:04}", i + 1),
                    Some(categories[0].id),
                    branch(i),
                    2.5 + i as f64,
                    1.5 + i as f64,
                    40 - 10 * i as i64,
                )
            })
            .collect();

        let sales: Vec<Sale> = (0..30usize)
            .map(|i| {
                let customer = &customers[i % customers.len()];
                let grand_total = 15.0 + (i * 7 % 50) as f64;
                let paid = if i % 3 == 0 { grand_total / 2.0 } else { grand_total };
                let due = grand_total - paid;
                Sale::new(
                    "completed".into(),
                    format!("INV-2024-{:04}", i + 1),
                    Some(customer.id),
                    customer.name.clone(),
                    branch(i),
                    Some(users[1 + i % 2].id),
                    day(i as i64),
                    grand_total,
                    paid,
                    due,
                    if due > 0.0 { "partial" } else { "paid" }.into(),
                )
                .with_created_at(day(i as i64))
            })
            .collect();

        let purchases: Vec<Purchase> = (0..12usize)
            .map(|i| {
                let supplier = &suppliers[i % suppliers.len()];
                let grand_total = 100.0 + 10.0 * i as f64;
                let paid = if i % 4 == 0 { 0.0 } else { grand_total };
                Purchase::new(
                    if i % 5 == 0 { "ordered" } else { "received" }.into(),
                    format!("PO-2024-{:04}", i + 1),
                    Some(supplier.id),
                    supplier.company.clone(),
                    branch(i),
                    day(2 * i as i64),
                    grand_total,
                    paid,
                    grand_total - paid,
                    if paid == 0.0 { "due" } else { "paid" }.into(),
                )
                .with_created_at(day(2 * i as i64))
            })
            .collect();

        let expenses: Vec<Expense> = ["Electricity", "Internet", "Rent", "Cleaning"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                Expense::new(
                    if i == 3 { "pending" } else { "approved" }.into(),
                    title.to_string(),
                    Some(categories[1].id),
                    branch(i),
                    day(7 * i as i64),
                    40.0 * (i + 1) as f64,
                    String::new(),
                )
                .with_created_at(day(7 * i as i64))
            })
            .collect();

        Self {
            branches,
            categories,
            customers,
            suppliers,
            products,
            sales,
            purchases,
            expenses,
            users,
        }
    }
}
