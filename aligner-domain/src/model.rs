use rust_decimal::{Decimal, RoundingStrategy};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoctorId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentId(pub u64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DoctorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency amount backed by an exact decimal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds half away from zero to `scale` decimal places.
    pub fn round_to(self, scale: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Truncates toward negative infinity at `scale` decimal places.
    pub fn floor_to(self, scale: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(scale, RoundingStrategy::ToNegativeInfinity),
        )
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Currency precision and reconciliation tolerance for one computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationSettings {
    /// Decimal places of the atomic currency unit (2 for cents).
    pub scale: u32,
    /// Largest accepted gap between the payment and the allocated total.
    pub tolerance: Money,
}

impl AllocationSettings {
    pub fn cents() -> Self {
        Self {
            scale: 2,
            tolerance: Money::new(1, 2),
        }
    }

    pub fn atomic_unit(&self) -> Money {
        Money::from_decimal(Decimal::new(1, self.scale))
    }
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self::cents()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaseStatus {
    Submitted,
    InTreatment,
    Completed,
    Cancelled,
}

/// Billing position of a case, derived from its cost and remaining balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl PaymentStatus {
    pub fn from_balance(total_cost: Money, remaining: Money) -> Self {
        if !remaining.is_positive() {
            PaymentStatus::Paid
        } else if remaining >= total_cost {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially paid",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Case metadata as supplied by the case directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseRecord {
    pub id: CaseId,
    pub doctor_id: Option<DoctorId>,
    pub patient_name: String,
    pub total_cost: Money,
    pub status: CaseStatus,
}

/// Remaining amount owed on one case at computation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaseBalance {
    pub case_id: CaseId,
    pub remaining: Money,
}

impl CaseBalance {
    pub fn new(case_id: CaseId, remaining: Money) -> Self {
        Self { case_id, remaining }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub doctor_id: Option<DoctorId>,
    pub amount: Money,
    pub note: Option<String>,
}

/// Persisted portion of a payment attributed to one case. Append-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub payment_id: PaymentId,
    pub case_id: CaseId,
    pub amount: Money,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocationSource {
    /// Proportional share of an explicitly selected case.
    Selected,
    /// Even share of the overflow beyond the selected total.
    Overflow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationLine {
    pub case_id: CaseId,
    pub remaining: Money,
    pub amount: Money,
    pub source: AllocationSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentKind {
    CaseSpecific,
    General,
}

/// Auditable breakdown of one payment across cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationPlan {
    pub kind: PaymentKind,
    pub payment_amount: Money,
    pub lines: Vec<AllocationLine>,
    pub selected_total: Money,
    pub overflow: Money,
    /// Even per-case share handed to unselected cases, when overflow was spread.
    pub overflow_share: Option<Money>,
    pub allocated_total: Money,
    pub unallocated: Money,
    pub mismatch: bool,
}

impl AllocationPlan {
    pub fn general(payment_amount: Money) -> Self {
        Self {
            kind: PaymentKind::General,
            payment_amount,
            lines: Vec::new(),
            selected_total: Money::ZERO,
            overflow: Money::ZERO,
            overflow_share: None,
            allocated_total: Money::ZERO,
            unallocated: payment_amount,
            mismatch: false,
        }
    }

    pub fn is_general(&self) -> bool {
        self.kind == PaymentKind::General
    }

    pub fn line_for(&self, case_id: CaseId) -> Option<&AllocationLine> {
        self.lines.iter().find(|line| line.case_id == case_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unpaid(100, 100, PaymentStatus::Unpaid)]
    #[case::partial(100, 40, PaymentStatus::PartiallyPaid)]
    #[case::paid(100, 0, PaymentStatus::Paid)]
    #[case::free_case(0, 0, PaymentStatus::Paid)]
    fn payment_status_follows_remaining(
        #[case] total: i64,
        #[case] remaining: i64,
        #[case] expected: PaymentStatus,
    ) {
        assert_eq!(
            PaymentStatus::from_balance(Money::from_i64(total), Money::from_i64(remaining)),
            expected
        );
    }

    #[test]
    fn rounding_helpers_respect_scale() {
        let value: Money = "33.335".parse().expect("valid money");
        assert_eq!(value.round_to(2), Money::new(3334, 2));
        assert_eq!(value.floor_to(2), Money::new(3333, 2));
    }

    #[test]
    fn money_sums_by_reference() {
        let amounts = [Money::from_i64(10), Money::new(250, 2)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::new(1250, 2));
    }

    #[test]
    fn cents_settings_use_one_cent_tolerance() {
        let settings = AllocationSettings::default();
        assert_eq!(settings.scale, 2);
        assert_eq!(settings.tolerance, Money::new(1, 2));
        assert_eq!(settings.atomic_unit(), Money::new(1, 2));
    }
}
