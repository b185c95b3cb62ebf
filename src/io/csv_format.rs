//! CSV format handling for journal requests, seed rows and output tables
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord / CardRow / ListingRow structures for deserialization
//! - Conversion from CSV rows to domain types
//! - Card, listing and order output serialization
//!
//! All functions are pure (no I/O besides the supplied writer) for easy testing.

use crate::types::{
    AccountId, Card, CardId, Listing, ListingId, ListingStatus, OrderRecord, OrderRequest,
    RequestRecord,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Journal row
///
/// Columns: type, account, card, code, listing, quantity, amount, key.
/// Which of the optional columns are required depends on the request type.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub request_type: String,
    pub account: AccountId,
    pub card: Option<CardId>,
    pub code: Option<String>,
    pub listing: Option<ListingId>,
    pub quantity: Option<i64>,
    pub amount: Option<String>,
    pub key: Option<String>,
}

/// Seed row for `cards.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CardRow {
    pub card: CardId,
    pub account: AccountId,
    pub number: String,
    pub code: String,
    pub balance: String,
}

/// Seed row for `listings.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ListingRow {
    pub listing: ListingId,
    pub card: CardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub stock: u32,
    pub price: String,
    pub status: String,
}

fn parse_decimal(value: &str, what: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|_| format!("Invalid {} '{}'", what, value))
}

fn required<T>(value: Option<T>, field: &str, record: &CsvRecord) -> Result<T, String> {
    value.ok_or_else(|| {
        format!(
            "{} request for account {} requires a {}",
            record.request_type, record.account, field
        )
    })
}

/// Non-empty text column
fn required_text(value: &Option<String>, field: &str, record: &CsvRecord) -> Result<String, String> {
    let value = value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    required(value, field, record)
}

/// Convert a journal row to a RequestRecord
///
/// This function:
/// - Parses the request type (case-insensitive)
/// - Checks the columns that request type needs are present
/// - Parses the amount into a Decimal
///
/// Range checks (positive quantity, positive amount) are left to the
/// marketplace so they surface as `InvalidArgument`.
///
/// # Returns
///
/// * `Ok(RequestRecord)` - Successfully converted record
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_csv_record(record: CsvRecord) -> Result<RequestRecord, String> {
    let account = record.account;

    match record.request_type.trim().to_lowercase().as_str() {
        "order" => {
            let mut request = OrderRequest::new(
                account,
                required(record.card, "card", &record)?,
                required_text(&record.code, "code", &record)?,
                required(record.listing, "listing", &record)?,
                required(record.quantity, "quantity", &record)?,
            );
            if let Some(key) = record.key.as_deref().map(str::trim).filter(|key| !key.is_empty()) {
                request = request.with_idempotency_key(key);
            }
            Ok(RequestRecord::Order(request))
        }
        "top_up" | "topup" => {
            let amount = required_text(&record.amount, "amount", &record)?;
            Ok(RequestRecord::TopUp {
                account,
                card: required(record.card, "card", &record)?,
                code: required_text(&record.code, "code", &record)?,
                amount: parse_decimal(&amount, "amount")?,
            })
        }
        "restock" => Ok(RequestRecord::Restock {
            account,
            listing: required(record.listing, "listing", &record)?,
            code: required_text(&record.code, "code", &record)?,
            quantity: required(record.quantity, "quantity", &record)?,
        }),
        "remove" => Ok(RequestRecord::Remove {
            account,
            listing: required(record.listing, "listing", &record)?,
            code: required_text(&record.code, "code", &record)?,
        }),
        "reactivate" => Ok(RequestRecord::Reactivate {
            account,
            listing: required(record.listing, "listing", &record)?,
            code: required_text(&record.code, "code", &record)?,
        }),
        _ => Err(format!(
            "Invalid request type: '{}' for account {}",
            record.request_type, account
        )),
    }
}

/// Convert a seed row to a Card
pub fn convert_card_row(row: CardRow, created_at: DateTime<Utc>) -> Result<Card, String> {
    let balance = parse_decimal(&row.balance, "balance")
        .map_err(|e| format!("{} for card {}", e, row.card))?;
    Ok(Card::new(row.card, row.account, row.number, row.code, created_at).with_balance(balance))
}

/// Convert a seed row to a Listing
pub fn convert_listing_row(row: ListingRow, created_at: DateTime<Utc>) -> Result<Listing, String> {
    let price = parse_decimal(&row.price, "price")
        .map_err(|e| format!("{} for listing {}", e, row.listing))?;
    let status = ListingStatus::parse(&row.status)
        .ok_or_else(|| format!("Invalid status '{}' for listing {}", row.status, row.listing))?;

    Ok(Listing {
        id: row.listing,
        card: row.card,
        name: row.name,
        description: row.description,
        category: row.category,
        stock: row.stock,
        price,
        status,
        created_at,
    })
}

/// Write card balances as CSV: card, account, balance
///
/// Cards are sorted by id for deterministic output.
pub fn write_cards_csv(cards: &[Card], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["card", "account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = cards.to_vec();
    sorted.sort_by_key(|card| card.id);

    for card in sorted {
        writer
            .write_record(&[
                card.id.to_string(),
                card.owner.to_string(),
                format!("{:.4}", card.balance),
            ])
            .map_err(|e| format!("Failed to write card record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write listing state as CSV: listing, card, stock, price, status
pub fn write_listings_csv(listings: &[Listing], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["listing", "card", "stock", "price", "status"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = listings.to_vec();
    sorted.sort_by_key(|listing| listing.id);

    for listing in sorted {
        writer
            .write_record(&[
                listing.id.to_string(),
                listing.card.to_string(),
                listing.stock.to_string(),
                format!("{:.4}", listing.price),
                listing.status.as_str().to_string(),
            ])
            .map_err(|e| format!("Failed to write listing record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write the order ledger as CSV
pub fn write_orders_csv(orders: &[OrderRecord], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "order",
            "buyer_card",
            "buyer_account",
            "listing",
            "seller_card",
            "seller_account",
            "quantity",
            "unit_price",
            "total",
            "status",
            "key",
            "created_at",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = orders.to_vec();
    sorted.sort_by_key(|order| order.id);

    for order in sorted {
        writer
            .write_record(&[
                order.id.to_string(),
                order.buyer_card.to_string(),
                order.buyer_account.to_string(),
                order.listing.to_string(),
                order.seller_card.to_string(),
                order.seller_account.to_string(),
                order.quantity.to_string(),
                format!("{:.4}", order.unit_price),
                format!("{:.4}", order.total),
                order.status.as_str().to_string(),
                order.idempotency_key.clone().unwrap_or_default(),
                order.created_at.to_rfc3339(),
            ])
            .map_err(|e| format!("Failed to write order record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderStatus, RequestType};
    use chrono::TimeZone;
    use rstest::rstest;

    fn csv_record(request_type: &str) -> CsvRecord {
        CsvRecord {
            request_type: request_type.to_string(),
            account: 1,
            card: Some(2),
            code: Some("1234".to_string()),
            listing: Some(3),
            quantity: Some(4),
            amount: Some("10.5".to_string()),
            key: None,
        }
    }

    #[rstest]
    #[case("order", RequestType::Order)]
    #[case("ORDER", RequestType::Order)]
    #[case("top_up", RequestType::TopUp)]
    #[case("topup", RequestType::TopUp)]
    #[case("restock", RequestType::Restock)]
    #[case("remove", RequestType::Remove)]
    #[case("reactivate", RequestType::Reactivate)]
    fn test_convert_csv_record_types(#[case] request_type: &str, #[case] expected: RequestType) {
        let record = convert_csv_record(csv_record(request_type)).unwrap();

        assert_eq!(record.request_type(), expected);
        assert_eq!(record.account(), 1);
    }

    #[test]
    fn test_convert_order_with_key() {
        let mut row = csv_record("order");
        row.key = Some(" retry-7 ".to_string());

        let record = convert_csv_record(row).unwrap();

        assert_eq!(
            record,
            RequestRecord::Order(OrderRequest::new(1, 2, "1234", 3, 4).with_idempotency_key("retry-7"))
        );
    }

    #[test]
    fn test_convert_top_up_amount() {
        let record = convert_csv_record(csv_record("top_up")).unwrap();

        assert_eq!(
            record,
            RequestRecord::TopUp {
                account: 1,
                card: 2,
                code: "1234".to_string(),
                amount: Decimal::new(105, 1),
            }
        );
    }

    #[rstest]
    #[case::invalid_type(CsvRecord { request_type: "refund".to_string(), ..csv_record("order") }, "Invalid request type")]
    #[case::order_without_card(CsvRecord { card: None, ..csv_record("order") }, "requires a card")]
    #[case::order_without_quantity(CsvRecord { quantity: None, ..csv_record("order") }, "requires a quantity")]
    #[case::blank_code(CsvRecord { code: Some("  ".to_string()), ..csv_record("order") }, "requires a code")]
    #[case::top_up_without_amount(CsvRecord { amount: None, ..csv_record("top_up") }, "requires a amount")]
    #[case::bad_amount(CsvRecord { amount: Some("ten".to_string()), ..csv_record("top_up") }, "Invalid amount")]
    #[case::remove_without_listing(CsvRecord { listing: None, ..csv_record("remove") }, "requires a listing")]
    fn test_convert_csv_record_errors(#[case] record: CsvRecord, #[case] expected_error: &str) {
        let result = convert_csv_record(record);

        assert!(result.unwrap_err().contains(expected_error));
    }

    #[test]
    fn test_convert_seed_rows() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let card = convert_card_row(
            CardRow {
                card: 5,
                account: 2,
                number: "123456789012".to_string(),
                code: "0042".to_string(),
                balance: "12.50".to_string(),
            },
            at,
        )
        .unwrap();
        let listing = convert_listing_row(
            ListingRow {
                listing: 9,
                card: 5,
                name: "Desk".to_string(),
                description: String::new(),
                category: "office".to_string(),
                stock: 0,
                price: "99.99".to_string(),
                status: "removed".to_string(),
            },
            at,
        )
        .unwrap();

        assert_eq!(card.code, "0042");
        assert_eq!(card.balance, Decimal::new(1250, 2));
        assert_eq!(listing.status, ListingStatus::Removed);
        assert_eq!(listing.price, Decimal::new(9999, 2));
    }

    #[test]
    fn test_convert_listing_row_rejects_unknown_status() {
        let row = ListingRow {
            listing: 9,
            card: 5,
            name: "Desk".to_string(),
            description: String::new(),
            category: String::new(),
            stock: 1,
            price: "1".to_string(),
            status: "banned".to_string(),
        };

        assert!(convert_listing_row(row, Utc::now())
            .unwrap_err()
            .contains("Invalid status"));
    }

    #[rstest]
    #[case::sorted_by_id(
        vec![
            Card::new(3, 1, "333333333333", "3333", Utc::now()).with_balance(Decimal::new(1001234, 4)),
            Card::new(1, 2, "111111111111", "1111", Utc::now()),
        ],
        "card,account,balance\n1,2,0.0000\n3,1,100.1234\n"
    )]
    #[case::empty(vec![], "card,account,balance\n")]
    fn test_write_cards_csv(#[case] cards: Vec<Card>, #[case] expected_output: &str) {
        let mut output = Vec::new();

        write_cards_csv(&cards, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_listings_csv() {
        let listing = Listing {
            id: 2,
            card: 1,
            name: "Chair".to_string(),
            description: String::new(),
            category: String::new(),
            stock: 7,
            price: Decimal::new(20, 0),
            status: ListingStatus::Active,
            created_at: Utc::now(),
        };
        let mut output = Vec::new();

        write_listings_csv(&[listing], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "listing,card,stock,price,status\n2,1,7,20.0000,active\n"
        );
    }

    #[test]
    fn test_write_orders_csv() {
        let order = OrderRecord {
            id: 1,
            buyer_card: 2,
            buyer_account: 20,
            listing: 3,
            seller_card: 4,
            seller_account: 40,
            quantity: 3,
            unit_price: Decimal::new(20, 0),
            total: Decimal::new(60, 0),
            status: OrderStatus::Placed,
            idempotency_key: Some("k".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        let mut output = Vec::new();

        write_orders_csv(&[order], &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1,2,20,3,4,40,3,20.0000,60.0000,placed,k,2024-01-02T03:04:05+00:00"
        );
    }
}
