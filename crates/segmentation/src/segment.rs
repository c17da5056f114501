use core::fmt;

use serde::{Deserialize, Serialize};

/// Business-facing customer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Vip,
    Frequent,
    Occasional,
    AtRisk,
    New,
    Inactive,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Vip,
        Segment::Frequent,
        Segment::Occasional,
        Segment::AtRisk,
        Segment::New,
        Segment::Inactive,
    ];

    /// Rule cascade over recency (days), frequency (orders) and monetary
    /// value. The first matching rule wins.
    pub fn classify(recency_days: f64, frequency: f64, monetary: f64) -> Self {
        if monetary > 1000.0 && frequency > 5.0 && recency_days < 30.0 {
            Segment::Vip
        } else if frequency > 3.0 && recency_days < 60.0 {
            Segment::Frequent
        } else if frequency <= 2.0 && recency_days < 90.0 {
            Segment::Occasional
        } else if recency_days > 180.0 {
            Segment::Inactive
        } else if frequency <= 2.0 && recency_days > 60.0 && recency_days < 180.0 {
            Segment::AtRisk
        } else {
            Segment::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Vip => "vip",
            Segment::Frequent => "frequent",
            Segment::Occasional => "occasional",
            Segment::AtRisk => "at_risk",
            Segment::New => "new",
            Segment::Inactive => "inactive",
        }
    }

    pub fn recommended_actions(&self) -> &'static [&'static str] {
        match self {
            Segment::Vip => &[
                "Offer exclusive VIP discounts",
                "Early access to new collections",
                "Premium loyalty programme",
                "Invitations to exclusive events",
            ],
            Segment::Frequent => &[
                "Loyalty points programme",
                "Frequent-purchase discounts",
                "New product notifications",
                "Satisfaction surveys",
            ],
            Segment::Occasional => &[
                "Reactivation campaigns",
                "Special discount on next purchase",
                "Reminders of viewed products",
                "Newsletter with new arrivals",
            ],
            Segment::AtRisk => &[
                "Urgent recovery campaign",
                "Significant discount offer",
                "Personal outreach",
                "Churn survey",
            ],
            Segment::New => &[
                "Personalised welcome",
                "Product guide",
                "Discount on second purchase",
                "Follow-up after first purchase",
            ],
            Segment::Inactive => &[
                "Aggressive win-back campaign",
                "Special come-back offer",
                "Remind store benefits",
                "Refresh preferences",
            ],
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_respects_priority_order() {
        assert_eq!(Segment::classify(10.0, 6.0, 1500.0), Segment::Vip);
        // VIP spend but stale: falls through to frequent
        assert_eq!(Segment::classify(45.0, 6.0, 1500.0), Segment::Frequent);
        assert_eq!(Segment::classify(20.0, 1.0, 50.0), Segment::Occasional);
        assert_eq!(Segment::classify(200.0, 1.0, 50.0), Segment::Inactive);
        assert_eq!(Segment::classify(120.0, 2.0, 50.0), Segment::AtRisk);
        // three orders, 100 days ago: nothing else matches
        assert_eq!(Segment::classify(100.0, 3.0, 300.0), Segment::New);
    }

    #[test]
    fn boundaries_are_exclusive() {
        assert_eq!(Segment::classify(30.0, 6.0, 1500.0), Segment::Frequent);
        assert_eq!(Segment::classify(180.0, 1.0, 10.0), Segment::New);
        assert_eq!(Segment::classify(999.0, 0.0, 0.0), Segment::Inactive);
    }

    #[test]
    fn every_segment_has_four_actions() {
        for segment in Segment::ALL {
            assert_eq!(segment.recommended_actions().len(), 4, "{segment}");
        }
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Segment::AtRisk).unwrap(), "\"at_risk\"");
    }
}
