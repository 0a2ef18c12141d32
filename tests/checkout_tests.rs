mod common;

use axum::http::StatusCode;
use common::{ADMIN_KEY, spawn_app};
use serde_json::json;

#[tokio::test]
async fn transfer_quote_and_order_freeze_discount() {
    let app = spawn_app().await;
    app.activate_gateway("bank_transfer").await;
    let product_id = app.create_product("Consola", "1000.00", 5).await;
    let (_, key) = app.register_customer("Ana", "ana@example.com").await;

    let (status, body) = app
        .get(
            &format!("/api/checkout/transfer-quote?productId={product_id}&quantity=1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["originalAmount"], "1000.00");
    assert_eq!(body["data"]["discountApplied"], "35.00");
    assert_eq!(body["data"]["totalAmount"], "965.00");

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({
                "productId": product_id,
                "quantity": 1,
                "paymentType": "direct_transfer",
                "originalAmount": "1000.00",
                "discountApplied": "35.00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["totalAmount"], "965.00");
    assert_eq!(body["data"]["paymentStatus"], "pending");
    assert_eq!(body["data"]["status"], "PENDIENTE");

    // Raising the discount must not touch the existing order.
    app.set_discount("10", true).await;

    let (status, body) = app.get(&format!("/api/orders/{order_id}"), Some(&key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["discountApplied"], "35.00");
    assert_eq!(body["data"]["totalAmount"], "965.00");

    // Amounts from the old quote are now stale.
    let (status, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({
                "productId": product_id,
                "quantity": 1,
                "paymentType": "direct_transfer",
                "originalAmount": "1000.00",
                "discountApplied": "35.00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "QUOTE_MISMATCH");
}

#[tokio::test]
async fn transfer_order_requires_amount_fields() {
    let app = spawn_app().await;
    app.activate_gateway("bank_transfer").await;
    let product_id = app.create_product("Audífonos", "250.00", 5).await;
    let (_, key) = app.register_customer("Luis", "luis@example.com").await;

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({ "productId": product_id, "quantity": 1, "paymentType": "direct_transfer" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_AMOUNT_FIELDS");
}

#[tokio::test]
async fn inactive_gateway_is_rejected() {
    let app = spawn_app().await;
    let product_id = app.create_product("Teclado", "500.00", 5).await;
    let (_, key) = app.register_customer("Eva", "eva@example.com").await;

    let (status, _) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({ "productId": product_id, "quantity": 1, "paymentType": "mercadopago" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict() {
    let app = spawn_app().await;
    app.activate_gateway("mercadopago").await;
    let product_id = app.create_product("Bocina", "300.00", 1).await;
    let (_, key) = app.register_customer("Iker", "iker@example.com").await;

    let (status, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({ "productId": product_id, "quantity": 2, "paymentType": "mercadopago" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn transfer_review_lifecycle() {
    let app = spawn_app().await;
    app.activate_gateway("bank_transfer").await;
    let product_id = app.create_product("Monitor", "1000.00", 5).await;
    let (_, key) = app.register_customer("Sofía", "sofia@example.com").await;

    let (_, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({
                "productId": product_id,
                "quantity": 1,
                "paymentType": "direct_transfer",
                "originalAmount": "1000.00",
                "discountApplied": "35.00"
            }),
        )
        .await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    // Cannot review before a receipt is uploaded.
    let (status, body) = app
        .post(
            "/api/admin/verify-transfer",
            Some(ADMIN_KEY),
            json!({ "orderId": order_id, "verified": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSFER_STATE");

    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/transfer-receipt"),
            Some(&key),
            json!({ "receiptUrl": "https://cdn.example.com/receipts/1.jpg" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["paymentStatus"], "pending_verification");

    let (status, body) = app.get("/api/admin/pending-transfers", Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    let pending = body["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], order_id);

    let (status, body) = app
        .post(
            "/api/admin/verify-transfer",
            Some(ADMIN_KEY),
            json!({ "orderId": order_id, "verified": true, "notes": "Depósito confirmado" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["paymentStatus"], "verified");
    assert_eq!(body["data"]["status"], "PAGADO");
    assert!(body["data"]["transferVerifiedBy"].is_number());

    // The decision is final.
    let (status, body) = app
        .post(
            "/api/admin/verify-transfer",
            Some(ADMIN_KEY),
            json!({ "orderId": order_id, "verified": false }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSFER_STATE");

    let (_, body) = app.get("/api/admin/pending-transfers", Some(ADMIN_KEY)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn fulfillment_only_moves_forward() {
    let app = spawn_app().await;
    app.activate_gateway("mercadopago").await;
    let product_id = app.create_product("Tableta", "800.00", 5).await;
    let (_, key) = app.register_customer("Raúl", "raul@example.com").await;

    let (_, body) = app
        .post(
            "/api/orders",
            Some(&key),
            json!({ "productId": product_id, "quantity": 1, "paymentType": "mercadopago" }),
        )
        .await;
    let order_id = body["data"]["id"].as_i64().unwrap();
    let order_number = body["data"]["orderNumber"].as_str().unwrap().to_string();

    // Unpaid orders stay PENDIENTE.
    let (status, _) = app
        .post(
            &format!("/api/admin/orders/{order_id}/status"),
            Some(ADMIN_KEY),
            json!({ "status": "ENVIADO" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let notification = json!({ "orderNumber": order_number, "paymentStatus": "approved" });
    let (status, _) = app.webhook("wrong-secret", notification.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.webhook("test-webhook-secret", notification.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["paymentStatus"], "approved");
    assert_eq!(body["data"]["status"], "PAGADO");

    // Duplicate deliveries are harmless.
    let (status, _) = app.webhook("test-webhook-secret", notification).await;
    assert_eq!(status, StatusCode::OK);

    // Stages cannot be skipped.
    let (status, _) = app
        .post(
            &format!("/api/admin/orders/{order_id}/status"),
            Some(ADMIN_KEY),
            json!({ "status": "ENVIADO" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for stage in ["EN_PREPARACION", "RECOGIDO"] {
        let (status, body) = app
            .post(
                &format!("/api/admin/orders/{order_id}/status"),
                Some(ADMIN_KEY),
                json!({ "status": stage }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{stage}: {body}");
        assert_eq!(body["data"]["status"], stage);
    }

    let (status, body) = app
        .post(
            &format!("/api/admin/orders/{order_id}/status"),
            Some(ADMIN_KEY),
            json!({ "status": "ENVIADO", "note": "Guía 123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "ENVIADO");

    for backwards in ["EN_PREPARACION", "ENVIADO", "PAGADO"] {
        let (status, body) = app
            .post(
                &format!("/api/admin/orders/{order_id}/status"),
                Some(ADMIN_KEY),
                json!({ "status": backwards }),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "{backwards}: {body}");
    }

    let (_, body) = app.get(&format!("/api/orders/{order_id}"), Some(&key)).await;
    assert_eq!(body["data"]["status"], "ENVIADO");
    assert!(body["data"]["statusHistory"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn customers_cannot_see_other_orders() {
    let app = spawn_app().await;
    app.activate_gateway("mercadopago").await;
    let product_id = app.create_product("Cámara", "900.00", 5).await;
    let (_, owner) = app.register_customer("Uno", "uno@example.com").await;
    let (_, other) = app.register_customer("Dos", "dos@example.com").await;

    let (_, body) = app
        .post(
            "/api/orders",
            Some(&owner),
            json!({ "productId": product_id, "quantity": 1, "paymentType": "mercadopago" }),
        )
        .await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/api/orders/{order_id}"), Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/api/orders/{order_id}"), Some(ADMIN_KEY)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rejected_transfer_is_final_and_returns_stock() {
    let app = spawn_app().await;
    app.activate_gateway("bank_transfer").await;
    let product_id = app.create_product("Bicicleta", "1000.00", 1).await;
    let (_, key) = app.register_customer("Marta", "marta@example.com").await;

    let transfer_order = json!({
        "productId": product_id,
        "quantity": 1,
        "paymentType": "direct_transfer",
        "originalAmount": "1000.00",
        "discountApplied": "35.00"
    });

    let (status, body) = app.post("/api/orders", Some(&key), transfer_order.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app.get(&format!("/api/products/{product_id}"), None).await;
    assert_eq!(body["data"]["stock"], 0);

    app.post(
        &format!("/api/orders/{order_id}/transfer-receipt"),
        Some(&key),
        json!({ "receiptUrl": "https://cdn.example.com/receipts/9.jpg" }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/admin/verify-transfer",
            Some(ADMIN_KEY),
            json!({ "orderId": order_id, "verified": false, "notes": "Monto incorrecto" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["paymentStatus"], "rejected");
    assert_eq!(body["data"]["status"], "PENDIENTE");
    assert_eq!(body["data"]["transferNotes"], "Monto incorrecto");
    assert!(body["data"]["transferVerifiedBy"].is_null());

    let (status, body) = app
        .post(
            "/api/admin/verify-transfer",
            Some(ADMIN_KEY),
            json!({ "orderId": order_id, "verified": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSFER_STATE");

    let (_, body) = app.get(&format!("/api/products/{product_id}"), None).await;
    assert_eq!(body["data"]["stock"], 1);

    let (status, body) = app.post("/api/orders", Some(&key), transfer_order).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn failed_gateway_payments_return_stock() {
    let app = spawn_app().await;
    app.activate_gateway("mercadopago").await;
    let product_id = app.create_product("Reloj", "600.00", 2).await;
    let (_, key) = app.register_customer("Nico", "nico@example.com").await;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let (status, body) = app
            .post(
                "/api/orders",
                Some(&key),
                json!({ "productId": product_id, "quantity": 1, "paymentType": "mercadopago" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        numbers.push(body["data"]["orderNumber"].as_str().unwrap().to_string());
    }

    let (_, body) = app.get(&format!("/api/products/{product_id}"), None).await;
    assert_eq!(body["data"]["stock"], 0);

    for (number, outcome) in numbers.iter().zip(["cancelled", "rejected"]) {
        let notification = json!({ "orderNumber": number, "paymentStatus": outcome });
        let (status, body) = app.webhook("test-webhook-secret", notification.clone()).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["paymentStatus"], outcome);
        assert_eq!(body["data"]["status"], "PENDIENTE");

        // Replays must not restock twice.
        let (status, _) = app.webhook("test-webhook-secret", notification).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.get(&format!("/api/products/{product_id}"), None).await;
    assert_eq!(body["data"]["stock"], 2);

    // A failed payment cannot be approved afterwards.
    let late = json!({ "orderNumber": numbers[0], "paymentStatus": "approved" });
    let (status, _) = app.webhook("test-webhook-secret", late).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn discount_percentage_rejects_fractional_cents() {
    let app = spawn_app().await;

    for value in ["3.125", "100.004", "101"] {
        let (status, body) = app
            .put(
                "/api/admin/transfer-discount-config",
                Some(ADMIN_KEY),
                json!({ "discountPercentage": value, "isActive": true }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{value}: {body}");
    }

    app.set_discount("4.5", true).await;
    let (_, body) = app
        .get("/api/admin/transfer-discount-config", Some(ADMIN_KEY))
        .await;
    assert_eq!(body["data"]["discountPercentage"], "4.50");
}
