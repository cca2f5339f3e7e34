use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub gender: i64,
}

#[derive(Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub gender: i64,
}

/// Sort/limit parameters on the collection route. Only `by=id` ordering is
/// supported, which is all the max-id query needs.
#[derive(Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub by: Option<String>,
    pub order: Option<String>,
}

#[derive(Default)]
pub struct Store {
    last_id: i64,
    records: BTreeMap<i64, Customer>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/", get(list_customers).post(create_customer))
        .route(
            "/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/gender/{value}", get(list_by_gender))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_customers(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Customer>> {
    let store = db.read().await;
    // BTreeMap iterates ascending by id.
    let mut records: Vec<Customer> = store.records.values().cloned().collect();
    if params.by.as_deref() == Some("id") && params.order.as_deref() == Some("desc") {
        records.reverse();
    }
    if let Some(limit) = params.limit {
        records.truncate(limit);
    }
    Json(records)
}

async fn create_customer(
    State(db): State<Db>,
    Json(input): Json<CustomerInput>,
) -> (StatusCode, Json<Customer>) {
    let mut store = db.write().await;
    store.last_id += 1;
    let customer = Customer {
        id: store.last_id,
        name: input.name,
        gender: input.gender,
    };
    store.records.insert(customer.id, customer.clone());
    (StatusCode::CREATED, Json(customer))
}

async fn get_customer(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, StatusCode> {
    let store = db.read().await;
    store.records.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_by_gender(State(db): State<Db>, Path(value): Path<i64>) -> Json<Vec<Customer>> {
    let store = db.read().await;
    Json(store.records.values().filter(|c| c.gender == value).cloned().collect())
}

async fn update_customer(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<CustomerInput>,
) -> Result<Json<Customer>, StatusCode> {
    let mut store = db.write().await;
    let customer = store.records.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    customer.name = input.name;
    customer.gender = input.gender;
    Ok(Json(customer.clone()))
}

async fn delete_customer(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    store.records.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}
