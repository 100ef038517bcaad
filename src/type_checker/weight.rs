use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, AddAssign},
    str::FromStr,
};

/// Cost of a sequence of conversions.
///
/// Ordered by `length` first, then by `cost`: a single expensive step is
/// cheaper than two cheap ones. Addition saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Weight {
    pub cost: u32,
    pub length: u32,
}

impl Weight {
    pub const ZERO: Weight = Weight { cost: 0, length: 0 };
    pub const MAX: Weight = Weight {
        cost: u32::MAX,
        length: u32::MAX,
    };

    pub const fn new(cost: u32, length: u32) -> Self {
        Weight { cost, length }
    }

    /// Weight of one conversion step with the given cost.
    pub const fn step(cost: u32) -> Self {
        Weight { cost, length: 1 }
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.length
            .cmp(&other.length)
            .then(self.cost.cmp(&other.cost))
    }
}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Self) -> Self::Output {
        Weight {
            cost: self.cost.saturating_add(rhs.cost),
            length: self.length.saturating_add(rhs.length),
        }
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.length, self.cost)
    }
}

/// Parses `<length>:<cost>`, the same format `Display` produces.
impl FromStr for Weight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (length, cost) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <length>:<cost>, found {:?}", s))?;

        let length = length
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid length {:?}: {}", length, e))?;
        let cost = cost
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid cost {:?}: {}", cost, e))?;

        Ok(Weight { cost, length })
    }
}
