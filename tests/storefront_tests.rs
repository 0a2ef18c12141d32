mod common;

use axum::http::StatusCode;
use common::{ADMIN_KEY, spawn_app};
use serde_json::{Value, json};

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn banners_are_managed_by_admins_and_listed_in_display_order() {
    let app = spawn_app().await;

    let mut ids = Vec::new();
    for (title, order, active) in [
        ("Buen Fin", 2, true),
        ("Envío gratis", 1, true),
        ("Borrador", 0, false),
    ] {
        let (status, body) = app
            .post(
                "/api/admin/banners",
                Some(ADMIN_KEY),
                json!({
                    "title": title,
                    "imageUrl": "https://cdn.example.com/banners/a.jpg",
                    "displayOrder": order,
                    "isActive": active
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        ids.push(body["data"]["id"].as_i64().unwrap());
    }

    let (status, body) = app.get("/api/banners", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), ["Envío gratis", "Buen Fin"]);

    // Admins see drafts too.
    let (_, body) = app.get("/api/admin/banners", Some(ADMIN_KEY)).await;
    assert_eq!(titles(&body), ["Borrador", "Envío gratis", "Buen Fin"]);

    let (status, body) = app
        .put(
            &format!("/api/admin/banners/{}", ids[0]),
            Some(ADMIN_KEY),
            json!({
                "title": "Buen Fin",
                "imageUrl": "https://cdn.example.com/banners/a.jpg",
                "displayOrder": 0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["displayOrder"], 0);

    let (_, body) = app.get("/api/banners", None).await;
    assert_eq!(titles(&body), ["Buen Fin", "Envío gratis"]);

    let (status, _) = app
        .delete(&format!("/api/admin/banners/{}", ids[1]), Some(ADMIN_KEY))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .delete(&format!("/api/admin/banners/{}", ids[1]), Some(ADMIN_KEY))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/banners", None).await;
    assert_eq!(titles(&body), ["Buen Fin"]);
}

#[tokio::test]
async fn banner_requires_image_url() {
    let app = spawn_app().await;

    let (status, _) = app
        .post(
            "/api/admin/banners",
            Some(ADMIN_KEY),
            json!({ "title": "Sin imagen", "imageUrl": "no-es-url" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn special_offers_crud() {
    let app = spawn_app().await;
    let (_, customer) = app.register_customer("Ana", "ana@example.com").await;

    let (status, _) = app
        .post(
            "/api/admin/special-offers",
            Some(&customer),
            json!({ "title": "2x1" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/admin/special-offers",
            Some(ADMIN_KEY),
            json!({ "title": "Audio", "discountPercentage": "20", "displayOrder": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["discountPercentage"], "20.00");
    let audio = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/api/admin/special-offers",
            Some(ADMIN_KEY),
            json!({ "title": "Gaming", "displayOrder": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/admin/special-offers",
            Some(ADMIN_KEY),
            json!({ "title": "Imposible", "discountPercentage": "120" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/special-offers", None).await;
    assert_eq!(titles(&body), ["Gaming", "Audio"]);

    let (status, body) = app
        .put(
            &format!("/api/admin/special-offers/{audio}"),
            Some(ADMIN_KEY),
            json!({ "title": "Audio", "discountPercentage": "25", "isActive": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["isActive"], false);

    let (_, body) = app.get("/api/special-offers", None).await;
    assert_eq!(titles(&body), ["Gaming"]);

    let (status, _) = app
        .delete(&format!("/api/admin/special-offers/{audio}"), Some(ADMIN_KEY))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/admin/special-offers", Some(ADMIN_KEY)).await;
    assert_eq!(titles(&body), ["Gaming"]);
}
