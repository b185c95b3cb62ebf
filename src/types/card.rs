//! Funding instrument (stored-value card) types
//!
//! A card belongs to exactly one account and holds a non-negative balance
//! used to pay for purchases and to receive sale proceeds.

use super::ids::{AccountId, CardId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Number of ASCII digits in a card number
pub const CARD_NUMBER_LEN: usize = 12;

/// Number of characters in a card verification code
pub const CARD_CODE_LEN: usize = 4;

/// Stored-value card
///
/// The balance is only ever changed through the card ledger primitives or a
/// committed store transaction, both of which keep it at or above zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Opaque card identity
    pub id: CardId,

    /// Account that owns the card
    pub owner: AccountId,

    /// Fixed-length card number (12 digits)
    pub number: String,

    /// Secret verification code (4 characters)
    pub code: String,

    /// Current balance, never negative
    pub balance: Decimal,

    /// When the card was opened
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card with a zero balance
    pub fn new(
        id: CardId,
        owner: AccountId,
        number: impl Into<String>,
        code: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Card {
            id,
            owner,
            number: number.into(),
            code: code.into(),
            balance: Decimal::ZERO,
            created_at,
        }
    }

    /// Builder-style helper used when restoring cards from a seed file
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }
}

/// Check that a card number is exactly [`CARD_NUMBER_LEN`] ASCII digits
pub fn is_valid_card_number(number: &str) -> bool {
    number.len() == CARD_NUMBER_LEN && number.bytes().all(|b| b.is_ascii_digit())
}

/// Check that a verification code is exactly [`CARD_CODE_LEN`] characters
pub fn is_valid_card_code(code: &str) -> bool {
    code.chars().count() == CARD_CODE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_card_starts_with_zero_balance() {
        let card = Card::new(1, 7, "123456789012", "0420", Utc::now());

        assert_eq!(card.id, 1);
        assert_eq!(card.owner, 7);
        assert_eq!(card.balance, Decimal::ZERO);
    }

    #[rstest]
    #[case::valid("123456789012", true)]
    #[case::too_short("12345678901", false)]
    #[case::too_long("1234567890123", false)]
    #[case::letters("12345678901a", false)]
    #[case::empty("", false)]
    fn test_card_number_validation(#[case] number: &str, #[case] expected: bool) {
        assert_eq!(is_valid_card_number(number), expected);
    }

    #[rstest]
    #[case::valid("0420", true)]
    #[case::letters("abcd", true)]
    #[case::too_short("042", false)]
    #[case::too_long("04200", false)]
    fn test_card_code_validation(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_valid_card_code(code), expected);
    }
}
