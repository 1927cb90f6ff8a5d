//! Transaction validator
//!
//! Checks an entry intent against the domain rules before the ledger sees it:
//!
//! - the amount must be positive
//! - the amount may not carry more decimals than the currency allows, unless
//!   the account rounds (half-even) instead of rejecting
//! - the date must lie in `[opened_on, today + 1 day]`
//! - entries read with less than high confidence need the user's confirmation
//!
//! Validation is side-effect free: the result depends only on the intent and
//! the [`ValidationContext`] snapshot.

use crate::types::{
    CategoryChoice, CategoryIndex, Confidence, Currency, EntryDraft, Intent, Transaction,
    TransactionId, TransactionStatus, ValidationError, OTHER_CATEGORY,
};
use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

/// What to do with amounts finer than the currency's minor unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionPolicy {
    /// Refuse with `ExcessivePrecision`
    #[default]
    Reject,
    /// Round half-even to the minor unit
    Round,
}

/// Account facts the rules are checked against
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    pub currency: Currency,
    pub opened_on: NaiveDate,
    pub today: NaiveDate,
    pub precision: PrecisionPolicy,
    pub categories: CategoryIndex,
}

/// Why an entry needs an explicit yes before it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationReason {
    /// The message started with an amount, no verb
    ImplicitVerb,
    /// The category does not exist yet and would be created
    UnknownCategory(String),
    /// No category given, the entry goes to the fallback bucket
    MissingCategory,
}

/// An entry waiting for confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub draft: EntryDraft,
    /// Preview of what will be applied
    pub transaction: Transaction,
    pub reason: ConfirmationReason,
}

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Apply right away
    Ready(Transaction),
    /// Ask the user first
    NeedsConfirmation(PendingEntry),
}

/// Validate an intent
///
/// # Returns
///
/// * `Ok(Validation::Ready)` with a `Pending` transaction for high-confidence entries
/// * `Ok(Validation::NeedsConfirmation)` for medium and low confidence entries
///
/// # Errors
///
/// * `UnsupportedIntent` if the intent is not an entry
/// * `InvalidAmount`, `ExcessivePrecision`, `DateOutOfRange` per the rules
pub fn validate(intent: &Intent, ctx: &ValidationContext) -> Result<Validation, ValidationError> {
    let draft = intent
        .entry()
        .ok_or_else(|| ValidationError::UnsupportedIntent {
            kind: format!("{:?}", intent.kind()),
        })?;

    let transaction = build_transaction(draft, ctx, TransactionId::new())?;

    if intent.confidence >= Confidence::High {
        return Ok(Validation::Ready(transaction));
    }

    let reason = if !draft.explicit_verb {
        ConfirmationReason::ImplicitVerb
    } else {
        match &draft.category {
            CategoryChoice::Hint(name) if !ctx.categories.contains(name) => {
                ConfirmationReason::UnknownCategory(name.clone())
            }
            CategoryChoice::Fallback => ConfirmationReason::MissingCategory,
            CategoryChoice::Known(_) | CategoryChoice::Hint(_) => {
                // Category became known after parsing
                return Ok(Validation::Ready(transaction));
            }
        }
    };

    Ok(Validation::NeedsConfirmation(PendingEntry {
        draft: draft.clone(),
        transaction,
        reason,
    }))
}

/// Re-check a confirmed entry against a fresh context
///
/// Every rule except the confidence gate is applied again; the previewed id
/// is kept.
pub fn revalidate(
    pending: &PendingEntry,
    ctx: &ValidationContext,
) -> Result<Transaction, ValidationError> {
    build_transaction(&pending.draft, ctx, pending.transaction.id)
}

/// Check a budget limit with the same amount rules as entries
pub fn validate_budget_limit(
    limit: Decimal,
    ctx: &ValidationContext,
) -> Result<Decimal, ValidationError> {
    check_amount(limit, ctx)
}

fn build_transaction(
    draft: &EntryDraft,
    ctx: &ValidationContext,
    id: TransactionId,
) -> Result<Transaction, ValidationError> {
    let amount = check_amount(draft.amount, ctx)?;
    let date = check_date(draft.date.unwrap_or(ctx.today), ctx)?;

    let category = match &draft.category {
        CategoryChoice::Known(name) | CategoryChoice::Hint(name) => ctx
            .categories
            .display_name(name)
            .unwrap_or(name)
            .to_string(),
        CategoryChoice::Fallback => ctx
            .categories
            .display_name(OTHER_CATEGORY)
            .unwrap_or(OTHER_CATEGORY)
            .to_string(),
    };

    Ok(Transaction {
        id,
        kind: draft.kind,
        amount,
        currency: ctx.currency,
        category,
        date,
        note: draft.note.clone(),
        payment_method: draft.payment_method,
        status: TransactionStatus::Pending,
    })
}

fn check_amount(amount: Decimal, ctx: &ValidationContext) -> Result<Decimal, ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount { amount });
    }

    let max_decimals = ctx.currency.minor_units();
    let normalized = amount.normalize();
    if normalized.scale() <= max_decimals {
        return Ok(normalized);
    }

    match ctx.precision {
        PrecisionPolicy::Reject => Err(ValidationError::ExcessivePrecision {
            amount,
            max_decimals,
        }),
        PrecisionPolicy::Round => {
            let rounded =
                normalized.round_dp_with_strategy(max_decimals, RoundingStrategy::MidpointNearestEven);
            if rounded.is_zero() {
                Err(ValidationError::InvalidAmount { amount })
            } else {
                Ok(rounded)
            }
        }
    }
}

fn check_date(date: NaiveDate, ctx: &ValidationContext) -> Result<NaiveDate, ValidationError> {
    let latest = ctx.today.checked_add_days(Days::new(1)).unwrap_or(ctx.today);
    if date < ctx.opened_on || date > latest {
        return Err(ValidationError::DateOutOfRange {
            date,
            earliest: ctx.opened_on,
            latest,
        });
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::{PaymentMethod, TransactionKind};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn ctx(precision: PrecisionPolicy) -> ValidationContext {
        ValidationContext {
            currency: Currency::Brl,
            opened_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            today: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            precision,
            categories: CategoryIndex::new(["transporte", "lazer", "outros"]),
        }
    }

    fn validate_text(raw: &str, precision: PrecisionPolicy) -> Result<Validation, ValidationError> {
        let ctx = ctx(precision);
        let intent = parse(raw, &ctx.categories, ctx.today).unwrap();
        validate(&intent, &ctx)
    }

    fn ready(raw: &str, precision: PrecisionPolicy) -> Transaction {
        match validate_text(raw, precision) {
            Ok(Validation::Ready(tx)) => tx,
            other => panic!("Expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_high_confidence_entry_is_ready() {
        let tx = ready("gasto 45,90 transporte pix", PrecisionPolicy::Reject);
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, dec!(45.9));
        assert_eq!(tx.category, "transporte");
        assert_eq!(tx.currency, Currency::Brl);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        assert_eq!(tx.payment_method, Some(PaymentMethod::Pix));
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[rstest]
    #[case::zero("gasto 0 lazer")]
    #[case::zero_decimals("gasto 0,00 lazer")]
    #[case::negative("gasto -10 lazer")]
    fn test_non_positive_amount_rejected(#[case] raw: &str) {
        for policy in [PrecisionPolicy::Reject, PrecisionPolicy::Round] {
            assert!(matches!(
                validate_text(raw, policy),
                Err(ValidationError::InvalidAmount { .. })
            ));
        }
    }

    #[test]
    fn test_excess_precision_rejected_by_default() {
        let result = validate_text("gasto 0,125 lazer", PrecisionPolicy::Reject);
        assert_eq!(
            result,
            Err(ValidationError::ExcessivePrecision {
                amount: dec!(0.125),
                max_decimals: 2
            })
        );
    }

    #[test]
    fn test_trailing_zeros_are_not_excess_precision() {
        let tx = ready("gasto 7,100000 lazer", PrecisionPolicy::Reject);
        assert_eq!(tx.amount, dec!(7.1));

        let tx = ready("gasto 1234,5600 lazer", PrecisionPolicy::Reject);
        assert_eq!(tx.amount, dec!(1234.56));
    }

    #[rstest]
    #[case::half_to_even_down("gasto 0,125 lazer", dec!(0.12))]
    #[case::half_to_even_up("gasto 0,135 lazer", dec!(0.14))]
    #[case::plain_round("gasto 2,3456 lazer", dec!(2.35))]
    fn test_round_policy_half_even(#[case] raw: &str, #[case] expected: Decimal) {
        let tx = ready(raw, PrecisionPolicy::Round);
        assert_eq!(tx.amount, expected);
    }

    #[test]
    fn test_rounding_to_zero_is_invalid() {
        assert!(matches!(
            validate_text("gasto 0,004 lazer", PrecisionPolicy::Round),
            Err(ValidationError::InvalidAmount { .. })
        ));
    }

    #[rstest]
    #[case::before_opening("gasto 10 lazer 31/12/2024", false)]
    #[case::opening_day("gasto 10 lazer 01/01/2025", true)]
    #[case::tomorrow("gasto 10 lazer 11/05/2025", true)]
    #[case::after_tomorrow("gasto 10 lazer 12/05/2025", false)]
    fn test_date_bounds(#[case] raw: &str, #[case] accepted: bool) {
        let result = validate_text(raw, PrecisionPolicy::Reject);
        if accepted {
            assert!(matches!(result, Ok(Validation::Ready(_))));
        } else {
            assert!(matches!(result, Err(ValidationError::DateOutOfRange { .. })));
        }
    }

    #[rstest]
    #[case::unknown_category("gasto 30 padaria", ConfirmationReason::UnknownCategory("padaria".to_string()), "padaria")]
    #[case::missing_category("gasto 30", ConfirmationReason::MissingCategory, "outros")]
    #[case::implicit_verb("30 lazer", ConfirmationReason::ImplicitVerb, "lazer")]
    fn test_low_confidence_needs_confirmation(
        #[case] raw: &str,
        #[case] reason: ConfirmationReason,
        #[case] category: &str,
    ) {
        match validate_text(raw, PrecisionPolicy::Reject) {
            Ok(Validation::NeedsConfirmation(pending)) => {
                assert_eq!(pending.reason, reason);
                assert_eq!(pending.transaction.category, category);
            }
            other => panic!("Expected NeedsConfirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_low_confidence_still_checks_rules() {
        assert!(matches!(
            validate_text("gasto 0 padaria", PrecisionPolicy::Reject),
            Err(ValidationError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_revalidate_keeps_id_and_rechecks_dates() {
        let pending = match validate_text("gasto 30 padaria 11/05/2025", PrecisionPolicy::Reject) {
            Ok(Validation::NeedsConfirmation(pending)) => pending,
            other => panic!("Expected NeedsConfirmation, got {:?}", other),
        };

        let same_day = ctx(PrecisionPolicy::Reject);
        let tx = revalidate(&pending, &same_day).unwrap();
        assert_eq!(tx.id, pending.transaction.id);

        let mut earlier = ctx(PrecisionPolicy::Reject);
        earlier.today = NaiveDate::from_ymd_opt(2025, 5, 9).unwrap();
        assert!(matches!(
            revalidate(&pending, &earlier),
            Err(ValidationError::DateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_non_entry_intent_is_unsupported() {
        assert!(matches!(
            validate_text("saldo", PrecisionPolicy::Reject),
            Err(ValidationError::UnsupportedIntent { .. })
        ));
    }

    #[test]
    fn test_budget_limit_rules() {
        let ctx = ctx(PrecisionPolicy::Reject);
        assert_eq!(validate_budget_limit(dec!(300), &ctx), Ok(dec!(300)));
        assert!(validate_budget_limit(dec!(0), &ctx).is_err());
        assert!(validate_budget_limit(dec!(1.001), &ctx).is_err());
    }
}
