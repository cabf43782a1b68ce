use rust_decimal::Decimal;

use crate::error::PricingError;
use crate::PricingResult;

fn overflow(context: &str) -> PricingError {
    PricingError::Overflow {
        context: context.to_string(),
    }
}

pub(crate) fn mul(a: Decimal, b: Decimal, context: &str) -> PricingResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

pub(crate) fn add(a: Decimal, b: Decimal, context: &str) -> PricingResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

pub(crate) fn div(a: Decimal, b: Decimal, context: &str) -> PricingResult<Decimal> {
    if b.is_zero() {
        return Err(PricingError::DivisionByZero {
            context: context.to_string(),
        });
    }
    a.checked_div(b).ok_or_else(|| overflow(context))
}

pub(crate) fn sum<I>(values: I, context: &str) -> PricingResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add(acc, v, context))
}
