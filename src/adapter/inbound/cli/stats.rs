//! Handler for `copytrail stats`.

use std::path::Path;

use rust_decimal::Decimal;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::StatsArgs;
use crate::adapter::inbound::cli::output;
use crate::domain::{CopyTradingId, LotId, RecordWithDetails, SettlementSummary};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Print the settlement summary of one relationship.
///
/// # Errors
///
/// Returns an error if the configuration or database cannot be opened.
pub async fn execute(path: &Path, args: &StatsArgs) -> Result<()> {
    let config = Config::load(path)?;
    let statistics = bootstrap::build_statistics(&config)?;
    let summary = statistics
        .summary(CopyTradingId::new(args.copy_trading_id))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

#[derive(Tabled)]
struct SellRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Sell Order")]
    order: String,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Qty")]
    quantity: Decimal,
    #[tabled(rename = "Price")]
    price: Decimal,
    #[tabled(rename = "PnL")]
    pnl: Decimal,
    #[tabled(rename = "Status")]
    status: &'static str,
}

#[derive(Tabled)]
struct LotRow {
    #[tabled(rename = "Sell Order")]
    order: String,
    #[tabled(rename = "Lot")]
    lot: LotId,
    #[tabled(rename = "Buy Order")]
    buy_order: String,
    #[tabled(rename = "Qty")]
    quantity: Decimal,
    #[tabled(rename = "Bought")]
    buy_price: Decimal,
    #[tabled(rename = "Sold")]
    sell_price: Decimal,
    #[tabled(rename = "PnL")]
    pnl: Decimal,
}

fn sell_rows(records: &[RecordWithDetails]) -> Vec<SellRow> {
    records
        .iter()
        .map(|entry| {
            let record = &entry.record;
            SellRow {
                time: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                order: record.sell_order_id.to_string(),
                market: record.market.clone(),
                outcome: record.side.clone(),
                quantity: record.total_matched_quantity,
                price: record.sell_price,
                pnl: record.total_realized_pnl,
                status: if record.price_updated {
                    "final"
                } else {
                    "pending"
                },
            }
        })
        .collect()
}

fn lot_rows(records: &[RecordWithDetails]) -> Vec<LotRow> {
    records
        .iter()
        .flat_map(|entry| {
            entry.details.iter().map(|detail| LotRow {
                order: entry.record.sell_order_id.to_string(),
                lot: detail.tracking_id,
                buy_order: detail.buy_order_id.to_string(),
                quantity: detail.matched_quantity,
                buy_price: detail.buy_price,
                sell_price: detail.sell_price,
                pnl: detail.realized_pnl,
            })
        })
        .collect()
}

fn print_summary(summary: &SettlementSummary) {
    output::section(&format!("Copy trading {}", summary.copy_trading_id));
    output::field("Sells settled", summary.sell_count);
    output::field("Matched quantity", summary.total_matched_quantity);
    output::field("Realized PnL", summary.total_realized_pnl);
    output::field("Pending reconciliation", summary.pending_reconciliation);

    if summary.records.is_empty() {
        output::note("No settled sells yet");
        return;
    }
    output::section("Sells");
    output::lines(&Table::new(sell_rows(&summary.records)).to_string());
    output::section("Lots consumed");
    output::lines(&Table::new(lot_rows(&summary.records)).to_string());
}
