//! Domain model enums shared across db, services and API layers.
//!
//! Persisted columns store the snake_case string form (`as_db`); parsing
//! back is fallible because rows predating a code change may carry values
//! the current build does not know.

use serde::{Deserialize, Serialize};

/// Plan duration class from the plan catalog. Doubles as the billing
/// cycle tag on payment orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Trial,
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl PlanType {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(Self::Trial),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "semi_annual" => Some(Self::SemiAnnual),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// How the entitlement was granted: back-office override or paid checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionSource {
    AdminAssigned,
    SelfPurchased,
}

impl SubscriptionSource {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::AdminAssigned => "admin_assigned",
            Self::SelfPurchased => "self_purchased",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOrderStatus {
    Created,
    Verified,
    Failed,
}

impl PaymentOrderStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "verified" => Some(Self::Verified),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_type_db_strings() {
        assert_eq!(PlanType::SemiAnnual.as_db(), "semi_annual");
        assert_eq!(PlanType::from_db("semi_annual"), Some(PlanType::SemiAnnual));
        assert_eq!(PlanType::from_db("weekly"), None);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(SubscriptionStatus::from_db("active"), Some(SubscriptionStatus::Active));
        assert_eq!(SubscriptionStatus::from_db("paused"), None);
        assert_eq!(PaymentOrderStatus::from_db("verified"), Some(PaymentOrderStatus::Verified));
        assert_eq!(PaymentOrderStatus::from_db(""), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&SubscriptionSource::SelfPurchased).unwrap();
        assert_eq!(json, "\"self_purchased\"");
        let back: PlanType = serde_json::from_str("\"semi_annual\"").unwrap();
        assert_eq!(back, PlanType::SemiAnnual);
    }
}
