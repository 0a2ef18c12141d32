mod common;

use axum::http::StatusCode;
use common::{ADMIN_KEY, spawn_app};
use serde_json::json;

#[tokio::test]
async fn ticket_thread_lifecycle() {
    let app = spawn_app().await;
    let (_, key) = app.register_customer("Ana", "ana@example.com").await;

    let (status, body) = app
        .post(
            "/api/support/tickets",
            Some(&key),
            json!({
                "subject": "Mi pago no aparece",
                "category": "PAGO",
                "priority": "URGENTE",
                "message": "Hice la transferencia ayer y el pedido sigue pendiente."
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ticket_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"], "PAGO");
    assert_eq!(body["data"]["priority"], "URGENTE");
    assert_eq!(body["data"]["status"], "ABIERTO");
    assert!(body["data"]["ticketNumber"].as_str().unwrap().starts_with("TK"));
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(
            &format!("/api/support/tickets/{ticket_id}/messages"),
            Some(ADMIN_KEY),
            json!({ "message": "Revisamos tu comprobante, danos un momento." }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["senderType"], "ADMIN");

    let (status, body) = app
        .post(
            &format!("/api/support/tickets/{ticket_id}/messages"),
            Some(&key),
            json!({ "message": "¡Gracias!" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["senderType"], "CLIENTE");

    let (_, body) = app
        .get(&format!("/api/support/tickets/{ticket_id}"), Some(&key))
        .await;
    let senders: Vec<&str> = body["data"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["senderType"].as_str().unwrap())
        .collect();
    assert_eq!(senders, ["CLIENTE", "ADMIN", "CLIENTE"]);

    let (status, body) = app
        .patch(
            &format!("/api/admin/support/tickets/{ticket_id}/status"),
            Some(ADMIN_KEY),
            json!({ "status": "CERRADO" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "CERRADO");
    assert!(body["data"]["closedAt"].is_string());

    let (status, body) = app
        .post(
            &format!("/api/support/tickets/{ticket_id}/messages"),
            Some(&key),
            json!({ "message": "¿Sigue abierto?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TICKET_CLOSED");

    // Closed is terminal.
    let (status, _) = app
        .patch(
            &format!("/api/admin/support/tickets/{ticket_id}/status"),
            Some(ADMIN_KEY),
            json!({ "status": "ABIERTO" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn tickets_are_private_to_their_owner() {
    let app = spawn_app().await;
    let (_, owner) = app.register_customer("Ana", "ana@example.com").await;
    let (_, other) = app.register_customer("Beto", "beto@example.com").await;

    let (_, body) = app
        .post(
            "/api/support/tickets",
            Some(&owner),
            json!({ "subject": "Envío", "category": "ENVIO", "message": "¿Dónde está mi paquete?" }),
        )
        .await;
    let ticket_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["priority"], "MEDIA");

    let (status, _) = app
        .get(&format!("/api/support/tickets/{ticket_id}"), Some(&other))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/support/tickets", Some(&other)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = app.get("/api/support/tickets", Some(ADMIN_KEY)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get("/api/support/tickets?status=CERRADO", Some(ADMIN_KEY))
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let app = spawn_app().await;
    let (_, key) = app.register_customer("Ana", "ana@example.com").await;

    let (status, _) = app
        .post(
            "/api/support/tickets",
            Some(&key),
            json!({ "subject": "Cuenta", "category": "CUENTA", "message": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
