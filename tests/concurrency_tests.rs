mod common;

use std::sync::Arc;

use common::spawn_app;
use mercadoboom::db::{NewOrder, ProductInput};
use mercadoboom::domain::{PaymentType, SensitiveAction, TransferQuote};
use mercadoboom::services::SecurityError;
use rust_decimal::Decimal;

#[tokio::test]
async fn concurrent_code_verification_grants_once() {
    let app = spawn_app().await;
    let (user_id, _) = app.register_customer("Ana", "ana@example.com").await;
    let security = app.shared.security_service.clone();

    security
        .send_code(user_id, SensitiveAction::ProfileUpdate)
        .await
        .unwrap();
    let code = Arc::new(app.notifier.last_code_for("ana@example.com"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let security = security.clone();
            let code = code.clone();
            tokio::spawn(async move {
                security
                    .verify_code(user_id, SensitiveAction::ProfileUpdate, &code)
                    .await
            })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);
}

#[tokio::test]
async fn concurrent_wrong_guesses_respect_attempt_limit() {
    let mut config = common::test_config();
    config.security.verification.max_attempts = 2;
    let app = common::spawn_app_with(config).await;
    let (user_id, _) = app.register_customer("Ana", "ana@example.com").await;
    let security = app.shared.security_service.clone();

    security
        .send_code(user_id, SensitiveAction::ProfileUpdate)
        .await
        .unwrap();
    let code = app.notifier.last_code_for("ana@example.com");
    let wrong = Arc::new(if code == "000000" { "111111" } else { "000000" }.to_string());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let security = security.clone();
            let wrong = wrong.clone();
            tokio::spawn(async move {
                security
                    .verify_code(user_id, SensitiveAction::ProfileUpdate, &wrong)
                    .await
            })
        })
        .collect();

    let mut compared = 0;
    let mut locked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(SecurityError::CodeMismatch { .. }) => compared += 1,
            Err(SecurityError::TooManyAttempts) => locked += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(compared, 2);
    assert_eq!(locked, 8);

    // The right code no longer helps once the attempts are spent.
    let result = security
        .verify_code(user_id, SensitiveAction::ProfileUpdate, &code)
        .await;
    assert!(matches!(result, Err(SecurityError::TooManyAttempts)));
}

#[tokio::test]
async fn concurrent_transfer_reviews_settle_once() {
    let app = spawn_app().await;
    let (user_id, _) = app.register_customer("Ana", "ana@example.com").await;
    let store = &app.shared.store;

    let product = store
        .products()
        .create(ProductInput {
            name: "Laptop".to_string(),
            description: None,
            price: Decimal::new(100_000, 2),
            stock: 3,
            category: None,
            image_url: None,
            is_active: true,
        })
        .await
        .unwrap();

    let quote = TransferQuote::compute(product.price, Decimal::new(350, 2)).unwrap();
    let order = store
        .orders()
        .create(NewOrder {
            number_prefix: "MB".to_string(),
            user_id,
            product_id: product.id,
            quantity: 1,
            unit_price: product.price,
            total_amount: quote.total_amount,
            quote: Some(quote),
            payment_type: PaymentType::DirectTransfer,
            shipping_address: None,
        })
        .await
        .unwrap()
        .unwrap();

    let customer = store.users().get_by_id(user_id).await.unwrap().unwrap();
    let orders = app.shared.order_service.clone();
    orders
        .submit_transfer_receipt(&customer, order.id, "https://cdn.example.com/r.jpg")
        .await
        .unwrap();

    let handles: Vec<_> = [true, false, true, false]
        .into_iter()
        .map(|verified| {
            let orders = orders.clone();
            let order_id = order.id;
            tokio::spawn(async move { orders.verify_transfer(1, order_id, verified, None).await })
        })
        .collect();

    let mut settled = Vec::new();
    for handle in handles {
        if let Ok(order) = handle.await.unwrap() {
            settled.push(order.payment_status);
        }
    }
    assert_eq!(settled.len(), 1);

    let stored = store.orders().get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, settled[0]);
}
