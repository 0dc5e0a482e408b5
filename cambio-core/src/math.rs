//! Logistic transition functions
//!
//! The model expresses every smooth threshold (emissions decline, CO2 fertilisation
//! loss, albedo loss) with the same logistic curve, parameterised by a transition
//! point and an interval over which most of the transition happens.

use crate::FloatValue;

/// Smooth step-up from 0 to 1 centred on `transition`.
///
/// $$ \sigma_{up}(x) = \frac{1}{1 + \exp(-3 (x - x_0) / w)} $$
///
/// The factor of 3 means roughly 90% of the transition happens within `interval`
/// either side of `transition`.
pub fn sigmaup(x: FloatValue, transition: FloatValue, interval: FloatValue) -> FloatValue {
    1.0 / (1.0 + (-(x - transition) * 3.0 / interval).exp())
}

/// Smooth step-down from 1 to 0 centred on `transition`.
pub fn sigmadown(x: FloatValue, transition: FloatValue, interval: FloatValue) -> FloatValue {
    1.0 - sigmaup(x, transition, interval)
}

/// Step-down from 1 towards `floor` instead of towards 0.
///
/// $$ \sigma_{floor}(x) = \sigma_{down}(x) (1 - f) + f $$
pub fn sigmafloor(
    x: FloatValue,
    transition: FloatValue,
    interval: FloatValue,
    floor: FloatValue,
) -> FloatValue {
    sigmadown(x, transition, interval) * (1.0 - floor) + floor
}
