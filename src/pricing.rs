use crate::models::{AffiliateDiscount, Amounts, Settings};

/// Integer division of `value * numerator / denominator`, rounded half up.
///
/// The product is taken in `i128`; inputs are bounded by
/// `lifecycle::MAX_HT_CENTS` so the quotient fits back in `i64`.
fn mul_div_round(value: i64, numerator: i64, denominator: i64) -> i64 {
    let product = i128::from(value) * i128::from(numerator);
    ((product + i128::from(denominator / 2)) / i128::from(denominator)) as i64
}

/// Builds the money breakdown of a quote from its pre-tax amount.
///
/// The affiliate discount is applied before VAT; the deposit is a share of the
/// VAT-inclusive total.
pub fn compute_amounts(
    ht_brut: i64,
    discount: Option<AffiliateDiscount>,
    settings: &Settings,
) -> Amounts {
    let remise = discount
        .as_ref()
        .map(|d| mul_div_round(ht_brut, i64::from(d.pourcentage), 100))
        .unwrap_or(0);
    let ht = ht_brut - remise;
    let tva = mul_div_round(ht, settings.tva_rate_bp, 10_000);
    let ttc = ht + tva;
    let acompte = mul_div_round(ttc, settings.deposit_percent, 100);

    Amounts {
        ht_brut,
        remise,
        ht,
        tva,
        ttc,
        acompte,
        remise_affilie: discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{MAX_HT_CENTS, TransitionError, validate_amount_input};

    #[test]
    fn vat_and_deposit_on_round_amount() {
        let amounts = compute_amounts(100_000, None, &Settings::default());
        assert_eq!(amounts.remise, 0);
        assert_eq!(amounts.ht, 100_000);
        assert_eq!(amounts.tva, 20_000);
        assert_eq!(amounts.ttc, 120_000);
        assert_eq!(amounts.acompte, 60_000);
        assert_eq!(amounts.balance(), 60_000);
    }

    #[test]
    fn largest_accepted_amount_does_not_overflow() {
        let settings = Settings {
            tva_rate_bp: 10_000,
            deposit_percent: 100,
            ..Settings::default()
        };
        let amounts = compute_amounts(MAX_HT_CENTS, None, &settings);
        assert_eq!(amounts.tva, MAX_HT_CENTS);
        assert_eq!(amounts.ttc, 2 * MAX_HT_CENTS);
        assert_eq!(amounts.acompte, 2 * MAX_HT_CENTS);
    }

    #[test]
    fn amounts_above_the_cap_are_rejected() {
        assert!(validate_amount_input(MAX_HT_CENTS, Some(100)).is_ok());
        assert!(matches!(
            validate_amount_input(MAX_HT_CENTS + 1, None),
            Err(TransitionError::Validation(_))
        ));
        assert!(matches!(
            validate_amount_input(10_000_000_000_000_000, None),
            Err(TransitionError::Validation(_))
        ));
    }

    #[test]
    fn affiliate_discount_applies_before_vat() {
        let discount = AffiliateDiscount {
            code: "PARTNER10".into(),
            pourcentage: 10,
        };
        let amounts = compute_amounts(99_999, Some(discount.clone()), &Settings::default());
        assert_eq!(amounts.remise_affilie, Some(discount));
        assert_eq!(amounts.remise, 10_000);
        assert_eq!(amounts.ht, 89_999);
        assert_eq!(amounts.tva, 18_000);
        assert_eq!(amounts.ttc, 107_999);
        assert_eq!(amounts.acompte, 54_000);
    }
}
