//! ERP documents exposed through list endpoints

pub mod macros;

use chrono::{DateTime, Utc};
use uuid::Uuid;

crate::impl_listable_entity!(
    Branch,
    "branch",
    "branches",
    title: name,
    {
        name: String,
        address: String,
        phone: String,
    }
);

crate::impl_listable_entity!(
    Category,
    "category",
    "categories",
    title: name,
    {
        name: String,
        description: String,
    }
);

crate::impl_listable_entity!(
    Customer,
    "customer",
    "customers",
    title: name,
    {
        name: String,
        phone: String,
        email: String,
        customer_type: String,
        branch_id: Option<Uuid>,
        due: f64,
    }
);

crate::impl_listable_entity!(
    Supplier,
    "supplier",
    "suppliers",
    title: name,
    {
        name: String,
        company: String,
        phone: String,
        email: String,
        due: f64,
    }
);

crate::impl_listable_entity!(
    Product,
    "product",
    "products",
    title: name,
    {
        name: String,
        sku: String,
        category_id: Option<Uuid>,
        branch_id: Option<Uuid>,
        price: f64,
        cost: f64,
        quantity: i64,
    }
);

crate::impl_listable_entity!(
    Sale,
    "sale",
    "sales",
    title: reference,
    {
        reference: String,
        customer_id: Option<Uuid>,
        customer_name: String,
        branch_id: Option<Uuid>,
        staff_id: Option<Uuid>,
        sale_date: DateTime<Utc>,
        grand_total: f64,
        paid: f64,
        due: f64,
        payment_status: String,
    }
);

crate::impl_listable_entity!(
    Purchase,
    "purchase",
    "purchases",
    title: reference,
    {
        reference: String,
        supplier_id: Option<Uuid>,
        supplier_name: String,
        branch_id: Option<Uuid>,
        purchase_date: DateTime<Utc>,
        grand_total: f64,
        paid: f64,
        due: f64,
        payment_status: String,
    }
);

crate::impl_listable_entity!(
    Expense,
    "expense",
    "expenses",
    title: title,
    {
        title: String,
        category_id: Option<Uuid>,
        branch_id: Option<Uuid>,
        expense_date: DateTime<Utc>,
        amount: f64,
        note: String,
    }
);

crate::impl_listable_entity!(
    StaffUser,
    "user",
    "users",
    title: name,
    {
        name: String,
        email: String,
        role: String,
        branch_id: Option<Uuid>,
    }
);
