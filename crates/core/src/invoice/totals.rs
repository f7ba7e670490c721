//! Line item and invoice totals.
//!
//! CRITICAL: Rounding strategy:
//! - Line HT is exact (unit prices are validated to the currency's minor unit)
//! - Line tax is rounded per line with banker's rounding (round half to even)
//! - Invoice totals are plain sums of the rounded line values
//!
//! Totals are never stored; they are recomputed from the item snapshots.
//! Lines are capped at [`MAX_LINE_HT`] so the sums stay far from `Decimal`'s range.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factura_shared::types::{Currency, InvoiceItemId};

use crate::invoice::error::InvoiceError;
use crate::invoice::types::{InvoiceItem, NewInvoiceItem};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest accepted `unit price * quantity` of a single line (10^15).
pub const MAX_LINE_HT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Totals of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    /// `unit price * quantity`.
    pub line_ht: Decimal,
    /// Tax on the line, rounded to the minor unit.
    pub line_tax: Decimal,
    /// `line_ht + line_tax`.
    pub line_ttc: Decimal,
}

/// Invoice-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of line HT.
    pub subtotal_ht: Decimal,
    /// Sum of line tax.
    pub total_tax: Decimal,
    /// `subtotal_ht + total_tax`.
    pub total_ttc: Decimal,
}

impl InvoiceTotals {
    /// Totals of an invoice without items.
    pub const ZERO: Self = Self {
        subtotal_ht: Decimal::ZERO,
        total_tax: Decimal::ZERO,
        total_ttc: Decimal::ZERO,
    };
}

/// Stateless calculator for HT, tax and TTC amounts.
pub struct LineItemCalculator;

impl LineItemCalculator {
    /// Computes the totals of one line.
    ///
    /// Saturates instead of overflowing; validated lines never get near the limit.
    #[must_use]
    pub fn line_totals(item: &InvoiceItem, currency: Currency) -> LineTotals {
        let line_ht = item
            .unit_price_ht_snapshot
            .saturating_mul(Decimal::from(item.quantity));
        let line_tax = currency.round(line_ht.saturating_mul(item.tax_rate_snapshot) / HUNDRED);
        LineTotals {
            line_ht,
            line_tax,
            line_ttc: line_ht.saturating_add(line_tax),
        }
    }

    /// Computes the totals of one line, failing instead of saturating.
    pub fn checked_line_totals(
        item: &InvoiceItem,
        currency: Currency,
    ) -> Result<LineTotals, InvoiceError> {
        let overflow = || InvoiceError::InvalidItem("line amount is too large".to_string());

        let line_ht = item
            .unit_price_ht_snapshot
            .checked_mul(Decimal::from(item.quantity))
            .ok_or_else(overflow)?;
        let line_tax = line_ht
            .checked_mul(item.tax_rate_snapshot)
            .and_then(|taxed| taxed.checked_div(HUNDRED))
            .map(|tax| currency.round(tax))
            .ok_or_else(overflow)?;
        let line_ttc = line_ht.checked_add(line_tax).ok_or_else(overflow)?;

        Ok(LineTotals {
            line_ht,
            line_tax,
            line_ttc,
        })
    }

    /// Computes the invoice totals over all lines.
    #[must_use]
    pub fn invoice_totals(items: &[InvoiceItem], currency: Currency) -> InvoiceTotals {
        let (subtotal_ht, total_tax) = items
            .iter()
            .map(|item| Self::line_totals(item, currency))
            .fold((Decimal::ZERO, Decimal::ZERO), |(ht, tax), line| {
                (ht.saturating_add(line.line_ht), tax.saturating_add(line.line_tax))
            });

        InvoiceTotals {
            subtotal_ht,
            total_tax,
            total_ttc: subtotal_ht.saturating_add(total_tax),
        }
    }

    /// Computes the invoice totals, failing when any sum overflows.
    pub fn checked_invoice_totals(
        items: &[InvoiceItem],
        currency: Currency,
    ) -> Result<InvoiceTotals, InvoiceError> {
        let overflow = || InvoiceError::InvalidInvoice("invoice total is too large".to_string());

        let mut subtotal_ht = Decimal::ZERO;
        let mut total_tax = Decimal::ZERO;
        for item in items {
            let line = Self::checked_line_totals(item, currency)?;
            subtotal_ht = subtotal_ht.checked_add(line.line_ht).ok_or_else(overflow)?;
            total_tax = total_tax.checked_add(line.line_tax).ok_or_else(overflow)?;
        }

        Ok(InvoiceTotals {
            subtotal_ht,
            total_tax,
            total_ttc: subtotal_ht.checked_add(total_tax).ok_or_else(overflow)?,
        })
    }

    /// Validates a new line and freezes it into a snapshot.
    pub fn snapshot(
        item: NewInvoiceItem,
        currency: Currency,
    ) -> Result<InvoiceItem, InvoiceError> {
        let snapshot = InvoiceItem {
            id: InvoiceItemId::new(),
            product_name_snapshot: item.product_name.trim().to_string(),
            product_sku_snapshot: item
                .product_sku
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            quantity: item.quantity,
            unit_price_ht_snapshot: item.unit_price_ht,
            tax_rate_snapshot: item.tax_rate,
        };
        Self::validate(&snapshot, currency)?;
        Ok(snapshot)
    }

    /// Checks the snapshot invariants of a line.
    pub fn validate(item: &InvoiceItem, currency: Currency) -> Result<(), InvoiceError> {
        if item.product_name_snapshot.trim().is_empty() {
            return Err(InvoiceError::InvalidItem(
                "product name is required".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(InvoiceError::InvalidItem(
                "quantity must be at least 1".to_string(),
            ));
        }
        if item.unit_price_ht_snapshot < Decimal::ZERO {
            return Err(InvoiceError::InvalidItem(
                "unit price cannot be negative".to_string(),
            ));
        }
        if !currency.is_representable(item.unit_price_ht_snapshot) {
            return Err(InvoiceError::InvalidItem(format!(
                "unit price {} has more than {} decimal places",
                item.unit_price_ht_snapshot,
                currency.minor_units()
            )));
        }
        if item.tax_rate_snapshot < Decimal::ZERO || item.tax_rate_snapshot > HUNDRED {
            return Err(InvoiceError::InvalidItem(format!(
                "tax rate {} must be between 0 and 100",
                item.tax_rate_snapshot
            )));
        }

        let line = Self::checked_line_totals(item, currency)?;
        if line.line_ht > MAX_LINE_HT {
            return Err(InvoiceError::InvalidItem(format!(
                "line amount {} exceeds {MAX_LINE_HT}",
                line.line_ht
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn new_item(quantity: u32, price: Decimal, rate: Decimal) -> NewInvoiceItem {
        NewInvoiceItem {
            product_name: "Widget".to_string(),
            product_sku: Some("W-1".to_string()),
            quantity,
            unit_price_ht: price,
            tax_rate: rate,
        }
    }

    fn item(quantity: u32, price: Decimal, rate: Decimal) -> InvoiceItem {
        LineItemCalculator::snapshot(new_item(quantity, price, rate), Currency::Eur).unwrap()
    }

    #[test]
    fn test_single_line_scenario() {
        let items = vec![item(2, dec!(100), dec!(20))];
        let totals = LineItemCalculator::invoice_totals(&items, Currency::Eur);
        assert_eq!(totals.subtotal_ht, dec!(200));
        assert_eq!(totals.total_tax, dec!(40));
        assert_eq!(totals.total_ttc, dec!(240));
    }

    #[test]
    fn test_empty_invoice_totals_are_zero() {
        assert_eq!(
            LineItemCalculator::invoice_totals(&[], Currency::Eur),
            InvoiceTotals::ZERO
        );
    }

    #[test]
    fn test_tax_is_rounded_per_line() {
        // 0.125 and 0.135 round to even: 0.12 and 0.14
        let items = vec![item(1, dec!(1.25), dec!(10)), item(1, dec!(1.35), dec!(10))];
        let lines: Vec<_> = items
            .iter()
            .map(|i| LineItemCalculator::line_totals(i, Currency::Eur))
            .collect();
        assert_eq!(lines[0].line_tax, dec!(0.12));
        assert_eq!(lines[1].line_tax, dec!(0.14));

        let totals = LineItemCalculator::invoice_totals(&items, Currency::Eur);
        assert_eq!(totals.subtotal_ht, dec!(2.60));
        assert_eq!(totals.total_tax, dec!(0.26));
        assert_eq!(totals.total_ttc, dec!(2.86));
    }

    #[test]
    fn test_fractional_tax_rate() {
        let line =
            LineItemCalculator::line_totals(&item(3, dec!(19.99), dec!(5.5)), Currency::Eur);
        assert_eq!(line.line_ht, dec!(59.97));
        // 59.97 * 5.5% = 3.29835
        assert_eq!(line.line_tax, dec!(3.30));
        assert_eq!(line.line_ttc, dec!(63.27));
    }

    #[rstest]
    #[case(new_item(0, dec!(10), dec!(20)))]
    #[case(new_item(1, dec!(-1), dec!(20)))]
    #[case(new_item(1, dec!(10.001), dec!(20)))]
    #[case(new_item(1, dec!(10), dec!(-1)))]
    #[case(new_item(1, dec!(10), dec!(100.01)))]
    #[case(NewInvoiceItem { product_name: "  ".to_string(), ..new_item(1, dec!(10), dec!(20)) })]
    #[case(new_item(2, Decimal::MAX, dec!(20)))]
    #[case(new_item(u32::MAX, dec!(1000000), dec!(20)))]
    #[case(new_item(1, MAX_LINE_HT + dec!(0.01), dec!(0)))]
    fn test_invalid_items_rejected(#[case] input: NewInvoiceItem) {
        assert!(matches!(
            LineItemCalculator::snapshot(input, Currency::Eur),
            Err(InvoiceError::InvalidItem(_))
        ));
    }

    #[test]
    fn test_boundary_tax_rates_accepted() {
        let free = new_item(1, dec!(0), dec!(0));
        let fully_taxed = new_item(1, dec!(10), dec!(100));
        assert!(LineItemCalculator::snapshot(free, Currency::Eur).is_ok());
        assert!(LineItemCalculator::snapshot(fully_taxed, Currency::Eur).is_ok());
    }

    #[test]
    fn test_line_at_cap_is_accepted_and_totals_stay_exact() {
        let items = vec![item(1, MAX_LINE_HT, dec!(100)), item(1, MAX_LINE_HT, dec!(100))];
        let totals = LineItemCalculator::checked_invoice_totals(&items, Currency::Eur).unwrap();
        assert_eq!(totals.subtotal_ht, dec!(2_000_000_000_000_000));
        assert_eq!(totals.total_ttc, dec!(4_000_000_000_000_000));
        assert_eq!(LineItemCalculator::invoice_totals(&items, Currency::Eur), totals);
    }

    #[test]
    fn test_unvalidated_overflow_saturates_or_errors() {
        let huge = InvoiceItem {
            id: InvoiceItemId::new(),
            product_name_snapshot: "Widget".to_string(),
            product_sku_snapshot: None,
            quantity: 2,
            unit_price_ht_snapshot: Decimal::MAX,
            tax_rate_snapshot: dec!(20),
        };
        let line = LineItemCalculator::line_totals(&huge, Currency::Eur);
        assert_eq!(line.line_ht, Decimal::MAX);
        assert!(matches!(
            LineItemCalculator::checked_line_totals(&huge, Currency::Eur),
            Err(InvoiceError::InvalidItem(_))
        ));
        assert!(matches!(
            LineItemCalculator::checked_invoice_totals(&[huge], Currency::Eur),
            Err(InvoiceError::InvalidItem(_))
        ));
    }

    #[test]
    fn test_snapshot_drops_blank_sku() {
        let input = NewInvoiceItem {
            product_sku: Some("  ".to_string()),
            ..new_item(1, dec!(10), dec!(20))
        };
        let snapshot = LineItemCalculator::snapshot(input, Currency::Eur).unwrap();
        assert_eq!(snapshot.product_sku_snapshot, None);
    }
}
