mod common;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use common::{app, create_category, create_product, login_as, send};

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

#[tokio::test]
async fn writes_require_a_bearer_token() {
    let app = app();
    let resp = send(&app, "POST", "/api/categories", None, Some(json!({ "name": "Books" }))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    let body = resp.json();
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["errorCode"], "UNAUTHORIZED");

    let resp = send(&app, "POST", "/api/categories", Some("garbage"), Some(json!({ "name": "Books" }))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = send(&app, "GET", "/api/categories", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!([]));
}

#[tokio::test]
async fn product_lifecycle_with_soft_delete() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let books = create_category(&app, &token, "Books").await;

    let resp = create_product(
        &app,
        &token,
        json!({
            "name": "Dune",
            "price": "20.00",
            "sale_price": "15.00",
            "stock_quantity": 4,
            "sku": "BK-DUNE",
            "category_id": books
        }),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    let created = resp.json();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["category_name"], "Books");
    assert_eq!(created["is_on_sale"], true);
    assert_eq!(created["stock_status"], "low_stock");
    assert_eq!(decimal(&created["effective_price"]), Decimal::from(15));
    assert_eq!(decimal(&created["discount_percentage"]), Decimal::from(25));
    assert!(created["updated_at"].is_null());

    let resp = send(
        &app,
        "PUT",
        &format!("/api/products/{}", id),
        Some(&token),
        Some(json!({
            "name": "Dune (paperback)",
            "price": "22.00",
            "stock_quantity": 10,
            "sku": "BK-DUNE",
            "category_id": books
        })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let updated = resp.json();
    assert_eq!(updated["name"], "Dune (paperback)");
    assert_eq!(updated["created_at"], created["created_at"]);
    assert!(updated["updated_at"].is_string());

    let resp = send(&app, "GET", "/api/products/sku/BK-DUNE", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["id"], id);

    let resp = send(&app, "DELETE", &format!("/api/products/{}", id), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = send(&app, "GET", &format!("/api/products/{}", id), None, None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let body = resp.json();
    assert_eq!(body["errorCode"], "NOT_FOUND");
    assert_eq!(
        body["message"],
        format!("Entity 'Product' with key '{}' was not found", id)
    );

    let resp = send(&app, "GET", "/api/products", None, None).await;
    assert_eq!(resp.json()["total_items"], 0);
}

#[tokio::test]
async fn sale_price_at_or_above_price_is_rejected() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let books = create_category(&app, &token, "Books").await;

    let resp = create_product(
        &app,
        &token,
        json!({ "name": "Dune", "price": "20.00", "sale_price": "20.00", "category_id": books }),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let body = resp.json();
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
    assert!(body["errors"]["sale_price"].is_array());

    let resp = create_product(
        &app,
        &token,
        json!({ "name": "Dune", "price": "20.00", "category_id": books }),
    )
    .await;
    let id = resp.json()["id"].as_i64().unwrap();
    let resp = send(
        &app,
        "PUT",
        &format!("/api/products/{}", id),
        Some(&token),
        Some(json!({ "name": "Dune", "price": "20.00", "sale_price": "25.00", "category_id": books })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["errorCode"], "PRICE_VALIDATION");
}

#[tokio::test]
async fn duplicate_sku_is_rejected() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let books = create_category(&app, &token, "Books").await;
    let product = |name: &str| json!({ "name": name, "price": "9.99", "sku": "DUP-1", "category_id": books });

    assert_eq!(create_product(&app, &token, product("First")).await.status, StatusCode::CREATED);
    let resp = create_product(&app, &token, product("Second")).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["errorCode"], "SKU_UNIQUENESS");
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let books = create_category(&app, &token, "Books").await;
    let resp = create_product(
        &app,
        &token,
        json!({ "name": "Dune", "price": "20.00", "category_id": books }),
    )
    .await;
    let product_id = resp.json()["id"].as_i64().unwrap();

    let resp = send(&app, "DELETE", &format!("/api/categories/{}", books), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let body = resp.json();
    assert_eq!(body["errorCode"], "CATEGORY_HAS_PRODUCTS");
    assert_eq!(
        body["message"],
        "Cannot delete category 'Books' because it contains 1 products"
    );

    let resp = send(&app, "GET", "/api/categories", None, None).await;
    assert_eq!(resp.json()[0]["product_count"], 1);

    send(&app, "DELETE", &format!("/api/products/{}", product_id), Some(&token), None).await;
    let resp = send(&app, "DELETE", &format!("/api/categories/{}", books), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    let resp = send(&app, "GET", &format!("/api/categories/{}", books), None, None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_update_keeps_created_at() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let id = create_category(&app, &token, "Books").await;
    let before = send(&app, "GET", &format!("/api/categories/{}", id), None, None).await.json();

    let resp = send(
        &app,
        "PUT",
        &format!("/api/categories/{}", id),
        Some(&token),
        Some(json!({ "name": "Novels", "display_order": 3 })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    let after = resp.json();
    assert_eq!(after["name"], "Novels");
    assert_eq!(after["created_at"], before["created_at"]);
    assert!(before["updated_at"].is_null());
    assert!(after["updated_at"].is_string());

    create_category(&app, &token, "Music").await;
    let resp = send(
        &app,
        "PUT",
        &format!("/api/categories/{}", id),
        Some(&token),
        Some(json!({ "name": "Music" })),
    )
    .await;
    assert_eq!(resp.json()["errorCode"], "CATEGORY_NAME_EXISTS");
}

#[tokio::test]
async fn product_queries_paging_and_bulk_status() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let gear = create_category(&app, &token, "Gear").await;

    for (i, stock) in [0, 3, 8, 12, 20].iter().enumerate() {
        let resp = create_product(
            &app,
            &token,
            json!({
                "name": format!("Item {}", i + 1),
                "price": format!("{}.00", 10 * (i + 1)),
                "stock_quantity": stock,
                "is_featured": i % 2 == 0,
                "category_id": gear
            }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    }

    let low = send(&app, "GET", "/api/products/low-stock", None, None).await.json();
    let names: Vec<&str> = low.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Item 1", "Item 2"]);

    let featured = send(&app, "GET", "/api/products/featured", None, None).await.json();
    assert_eq!(featured.as_array().unwrap().len(), 3);

    let page = send(
        &app,
        "GET",
        "/api/products?page=2&page_size=2&sort_by=price&sort_desc=true",
        None,
        None,
    )
    .await
    .json();
    assert_eq!(page["total_items"], 5);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["items"][0]["name"], "Item 3");
    assert_eq!(page["has_next"], true);

    let resp = send(
        &app,
        "PATCH",
        "/api/products/1/stock",
        Some(&token),
        Some(json!({ "quantity": 50 })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["stock_status"], "in_stock");

    let resp = send(
        &app,
        "PATCH",
        "/api/products/1/stock",
        Some(&token),
        Some(json!({ "quantity": -1 })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        "POST",
        "/api/products/bulk-status",
        Some(&token),
        Some(json!({ "ids": [1, 2, 999], "is_active": false })),
    )
    .await;
    assert_eq!(resp.json()["updated"], 2);
    let active = send(&app, "GET", "/api/products/active", None, None).await.json();
    assert_eq!(active.as_array().unwrap().len(), 3);

    let too_many: Vec<i64> = (1..=101).collect();
    let resp = send(
        &app,
        "POST",
        "/api/products/bulk-status",
        Some(&token),
        Some(json!({ "ids": too_many, "is_active": true })),
    )
    .await;
    assert_eq!(resp.json()["errorCode"], "BULK_LIMIT");

    let by_category = send(&app, "GET", &format!("/api/categories/{}/products", gear), None, None).await.json();
    assert_eq!(by_category.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let resp = send(
        &app,
        "POST",
        "/api/categories",
        Some(&token),
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["errorCode"], "VALIDATION_ERROR");

    let resp = send(
        &app,
        "POST",
        "/api/categories",
        Some(&token),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["errors"]["name"].is_array());
}

#[tokio::test]
async fn page_far_past_the_end_is_an_empty_page() {
    let app = app();
    let token = login_as(&app, "admin@example.com").await;
    let books = create_category(&app, &token, "Books").await;
    create_product(&app, &token, json!({ "name": "Dune", "price": "20.00", "category_id": books })).await;

    let resp = send(
        &app,
        "GET",
        &format!("/api/products?page={}&page_size=100", usize::MAX),
        None,
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let page = resp.json();
    assert_eq!(page["items"], json!([]));
    assert_eq!(page["total_items"], 1);
    assert_eq!(page["has_next"], false);
}
