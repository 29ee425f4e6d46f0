use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    entities::{coupons::CouponEntity, courses::CourseEntity},
    value_objects::enums::discount_types::DiscountType,
};

/// Time-boxed course sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseDiscount {
    pub price: i64,
    pub valid_until: Option<DateTime<Utc>>,
}

impl CourseDiscount {
    pub fn from_course(course: &CourseEntity) -> Option<Self> {
        course.discount_price.map(|price| Self {
            price,
            valid_until: course.discount_valid_until,
        })
    }

    /// A sale price counts when it is positive and not past its deadline.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.price > 0 && self.valid_until.map_or(true, |deadline| deadline > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponTerms {
    pub discount_type: DiscountType,
    pub value: i64,
    pub max_discount: Option<i64>,
}

impl CouponTerms {
    pub fn from_coupon(coupon: &CouponEntity) -> anyhow::Result<Self> {
        Ok(Self {
            discount_type: coupon.discount_type.parse()?,
            value: coupon.discount_value,
            max_discount: coupon.max_discount,
        })
    }

    /// Discount this coupon grants on `price`, always within `[0, price]`.
    pub fn discount_for(&self, price: i64) -> i64 {
        if price <= 0 || self.value <= 0 {
            return 0;
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let percent = price.saturating_mul(self.value) / 100;
                match self.max_discount {
                    Some(cap) => percent.min(cap),
                    None => percent,
                }
            }
            DiscountType::Fixed => self.value,
        };

        raw.clamp(0, price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub original: i64,
    /// Price after the course sale, before any coupon.
    pub course_discounted_price: i64,
    pub coupon_discount: i64,
    pub total_discount: i64,
    pub final_price: i64,
    pub coupon_applied: bool,
}

impl PriceBreakdown {
    pub fn is_free(&self) -> bool {
        self.final_price <= 0
    }

    /// `(original_amount, discount_amount)` as persisted on the ledger row.
    pub fn recorded_amounts(&self) -> Option<(i64, i64)> {
        if self.total_discount > 0 || self.coupon_applied {
            Some((self.original, self.total_discount))
        } else {
            None
        }
    }
}

pub fn compute_final_price(
    course_price: i64,
    course_discount: Option<&CourseDiscount>,
    coupon: Option<&CouponTerms>,
    now: DateTime<Utc>,
) -> PriceBreakdown {
    let original = course_price.max(0);

    let course_discounted_price = match course_discount {
        Some(discount) if discount.is_active(now) => discount.price,
        _ => original,
    };

    let coupon_discount = coupon
        .map(|terms| terms.discount_for(course_discounted_price))
        .unwrap_or(0);

    let final_price = (course_discounted_price - coupon_discount).max(0);

    PriceBreakdown {
        original,
        course_discounted_price,
        coupon_discount,
        total_discount: (original - final_price).max(0),
        final_price,
        coupon_applied: coupon.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percent(value: i64, cap: Option<i64>) -> CouponTerms {
        CouponTerms {
            discount_type: DiscountType::Percentage,
            value,
            max_discount: cap,
        }
    }

    fn fixed(value: i64) -> CouponTerms {
        CouponTerms {
            discount_type: DiscountType::Fixed,
            value,
            max_discount: None,
        }
    }

    #[test]
    fn course_sale_then_capped_percentage_coupon() {
        let now = Utc::now();
        let sale = CourseDiscount {
            price: 300_000,
            valid_until: Some(now + Duration::days(1)),
        };
        let save10 = percent(10, Some(20_000));

        let breakdown = compute_final_price(500_000, Some(&sale), Some(&save10), now);

        assert_eq!(breakdown.course_discounted_price, 300_000);
        assert_eq!(breakdown.coupon_discount, 20_000);
        assert_eq!(breakdown.final_price, 280_000);
        assert_eq!(breakdown.recorded_amounts(), Some((500_000, 220_000)));
    }

    #[test]
    fn expired_sale_falls_back_to_list_price() {
        let now = Utc::now();
        let sale = CourseDiscount {
            price: 300_000,
            valid_until: Some(now - Duration::minutes(1)),
        };

        let breakdown = compute_final_price(500_000, Some(&sale), Some(&percent(10, None)), now);

        assert_eq!(breakdown.course_discounted_price, 500_000);
        assert_eq!(breakdown.coupon_discount, 50_000);
        assert_eq!(breakdown.final_price, 450_000);
    }

    #[test]
    fn sale_without_deadline_applies() {
        let now = Utc::now();
        let sale = CourseDiscount {
            price: 99_000,
            valid_until: None,
        };

        let breakdown = compute_final_price(150_000, Some(&sale), None, now);

        assert_eq!(breakdown.final_price, 99_000);
        assert_eq!(breakdown.recorded_amounts(), Some((150_000, 51_000)));
    }

    #[test]
    fn sale_price_above_list_price_is_still_charged() {
        let sale = CourseDiscount {
            price: 600_000,
            valid_until: None,
        };

        let breakdown = compute_final_price(500_000, Some(&sale), None, Utc::now());

        assert_eq!(breakdown.course_discounted_price, 600_000);
        assert_eq!(breakdown.final_price, 600_000);
        assert_eq!(breakdown.total_discount, 0);
        assert_eq!(breakdown.recorded_amounts(), None);
    }

    #[test]
    fn zero_cap_grants_no_percentage_discount() {
        let breakdown = compute_final_price(200_000, None, Some(&percent(50, Some(0))), Utc::now());

        assert_eq!(breakdown.coupon_discount, 0);
        assert_eq!(breakdown.final_price, 200_000);
        assert_eq!(breakdown.recorded_amounts(), Some((200_000, 0)));
    }

    #[test]
    fn fixed_coupon_larger_than_price_makes_it_free() {
        let breakdown = compute_final_price(50_000, None, Some(&fixed(75_000)), Utc::now());

        assert_eq!(breakdown.coupon_discount, 50_000);
        assert_eq!(breakdown.final_price, 0);
        assert!(breakdown.is_free());
    }

    #[test]
    fn hundred_percent_coupon_is_free() {
        let breakdown = compute_final_price(120_000, None, Some(&percent(100, None)), Utc::now());
        assert_eq!(breakdown.final_price, 0);
        assert_eq!(breakdown.total_discount, 120_000);
    }

    #[test]
    fn percentage_truncates_fractional_amounts() {
        let breakdown = compute_final_price(99_999, None, Some(&percent(15, None)), Utc::now());
        assert_eq!(breakdown.coupon_discount, 14_999);
        assert_eq!(breakdown.final_price, 85_000);
    }

    #[test]
    fn zero_value_coupon_is_still_recorded() {
        let breakdown = compute_final_price(100_000, None, Some(&fixed(0)), Utc::now());
        assert_eq!(breakdown.final_price, 100_000);
        assert_eq!(breakdown.recorded_amounts(), Some((100_000, 0)));
    }

    #[test]
    fn no_discount_records_nothing() {
        let breakdown = compute_final_price(100_000, None, None, Utc::now());
        assert_eq!(breakdown.final_price, 100_000);
        assert_eq!(breakdown.recorded_amounts(), None);
    }

    #[test]
    fn final_price_never_negative_and_coupon_never_exceeds_base() {
        let now = Utc::now();
        for price in [0_i64, 1, 999, 10_000, 1_000_000] {
            for terms in [percent(250, None), fixed(i64::MAX / 2), percent(50, Some(1))] {
                let breakdown = compute_final_price(price, None, Some(&terms), now);
                assert!(breakdown.final_price >= 0);
                assert!(breakdown.coupon_discount <= breakdown.course_discounted_price);
            }
        }
    }
}
