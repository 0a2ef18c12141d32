//! Pending transfer review queue command handler

use crate::config::Config;
use crate::db::{OrderFilter, Store};
use crate::domain::{PaymentStatus, PaymentType};

pub async fn cmd_pending_transfers(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let mut orders = store
        .orders()
        .list(OrderFilter {
            payment_status: Some(PaymentStatus::PendingVerification),
            payment_type: Some(PaymentType::DirectTransfer),
            ..OrderFilter::default()
        })
        .await?;
    orders.sort_by_key(|o| o.id);

    if orders.is_empty() {
        println!("No transfers waiting for review.");
        return Ok(());
    }

    println!("Pending Transfers ({} total)", orders.len());
    println!("{:-<70}", "");

    for order in orders {
        println!(
            "{} | user {} | {} {}",
            order.order_number, order.user_id, order.total_amount, config.storefront.currency
        );
        if let (Some(original), Some(discount)) = (order.original_amount, order.discount_applied) {
            println!("  Original: {original} | Discount: {discount}");
        }
        if let Some(receipt) = &order.transfer_receipt_url {
            println!("  Receipt: {receipt}");
        }
        println!("  Created: {}", order.created_at);
    }

    println!();
    println!("Review with: POST /api/admin/verify-transfer");

    Ok(())
}
