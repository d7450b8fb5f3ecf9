use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Mul, Sub},
};

/// Simulation time, in microseconds.
///
/// Backed by an `f64` because the modelled delays are fractional (a 100 ns
/// latency, a byte count divided by a bandwidth). Ordering is total
/// (`f64::total_cmp`), so the type can key the calendar heap directly.
#[derive(Copy, Clone, Default)]
pub struct VirtualTime(pub f64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    pub fn from_nanos(nanos: f64) -> Self {
        VirtualTime(nanos / 1_000.0)
    }

    pub fn from_micros(micros: f64) -> Self {
        VirtualTime(micros)
    }

    pub fn from_millis(millis: f64) -> Self {
        VirtualTime(millis * 1_000.0)
    }

    pub fn from_secs(secs: f64) -> Self {
        VirtualTime(secs * 1_000_000.0)
    }

    pub fn as_micros(self) -> f64 {
        self.0
    }

    pub fn as_millis(self) -> f64 {
        self.0 / 1_000.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn min(self, other: VirtualTime) -> VirtualTime {
        if other < self { other } else { self }
    }
}

impl PartialEq for VirtualTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VirtualTime {}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: Self) -> Self::Output {
        VirtualTime(self.0 + rhs.0)
    }
}

impl Sub for VirtualTime {
    type Output = VirtualTime;

    fn sub(self, rhs: Self) -> Self::Output {
        VirtualTime(self.0 - rhs.0)
    }
}

impl AddAssign<VirtualTime> for VirtualTime {
    fn add_assign(&mut self, rhs: VirtualTime) {
        self.0 += rhs.0
    }
}

impl Mul<f64> for VirtualTime {
    type Output = VirtualTime;

    fn mul(self, rhs: f64) -> Self::Output {
        VirtualTime(self.0 * rhs)
    }
}

impl Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}us", self.0)
    }
}

impl Debug for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert_eq!(VirtualTime::from_secs(10.0), VirtualTime(10_000_000.0));
        assert_eq!(VirtualTime::from_millis(1.5), VirtualTime(1_500.0));
        assert_eq!(VirtualTime::from_nanos(100.0), VirtualTime(0.1));
        assert_eq!(VirtualTime::from_millis(25.0).as_millis(), 25.0);
    }

    #[test]
    fn ordering_is_total() {
        let mut times = vec![
            VirtualTime(3.0),
            VirtualTime(0.1),
            VirtualTime(2.5),
            VirtualTime::ZERO,
        ];
        times.sort();
        assert_eq!(
            times,
            vec![
                VirtualTime::ZERO,
                VirtualTime(0.1),
                VirtualTime(2.5),
                VirtualTime(3.0)
            ]
        );
        assert!(VirtualTime(f64::NAN) > VirtualTime(f64::INFINITY));
        assert_eq!(VirtualTime(1.0).min(VirtualTime(0.5)), VirtualTime(0.5));
    }

    #[test]
    fn arithmetic() {
        let mut t = VirtualTime(1.0) + VirtualTime(2.0);
        t += VirtualTime(0.5);
        assert_eq!(t, VirtualTime(3.5));
        assert_eq!(t - VirtualTime(1.5), VirtualTime(2.0));
        assert_eq!(VirtualTime(1.5) * 16.0, VirtualTime(24.0));
        assert_eq!(format!("{}", VirtualTime(1.0)), "1.000us");
    }
}
