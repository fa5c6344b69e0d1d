//! Amount arithmetic shared by quotes, invoices and payroll.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Default IGV (sales tax) percentage.
pub const IGV_PERCENT: f64 = 18.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Line amount: quantity times unit price, rounded to cents.
pub fn line_total(cantidad: f64, precio_unitario: f64) -> f64 {
    round2(cantidad * precio_unitario)
}

/// `part * 100 / whole` with two decimals, 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        round2(part * 100.0 / whole)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct Totals {
    pub sub_total: f64,
    pub total_igv: f64,
    pub total: f64,
}

impl Totals {
    /// Totals over already-computed line amounts.
    pub fn from_line_totals<I>(line_totals: I, igv_percent: f64) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let sub_total = round2(line_totals.into_iter().sum());
        let total_igv = round2(sub_total * igv_percent / 100.0);
        Self {
            sub_total,
            total_igv,
            total: round2(sub_total + total_igv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_apply_igv_over_subtotal() {
        let totals = Totals::from_line_totals(
            [line_total(2.0, 50.0), line_total(1.0, 35.5)],
            IGV_PERCENT,
        );
        assert_eq!(totals.sub_total, 135.5);
        assert_eq!(totals.total_igv, 24.39);
        assert_eq!(totals.total, 159.89);
    }

    #[test]
    fn empty_lines_give_zero_totals() {
        let totals = Totals::from_line_totals(Vec::new(), IGV_PERCENT);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert_eq!(percentage(3.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 3.0), 33.33);
    }
}
