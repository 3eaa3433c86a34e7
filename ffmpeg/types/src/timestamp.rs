/*!
    Timestamps and durations expressed in stream time base units.
*/

use crate::Rational;

/**
    A presentation timestamp in time base units.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Convert to seconds using the given time base.
    */
    pub fn to_seconds(self, time_base: Rational) -> f64 {
        scale(self.0, time_base)
    }
}

/**
    A duration in time base units.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(pub i64);

impl MediaDuration {
    pub fn to_seconds(self, time_base: Rational) -> f64 {
        scale(self.0, time_base)
    }
}

fn scale(value: i64, time_base: Rational) -> f64 {
    if time_base.den == 0 {
        return 0.0;
    }
    value as f64 * time_base.num as f64 / time_base.den as f64
}
