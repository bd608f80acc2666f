use std::fmt;
use std::str::FromStr;

/// Optional capabilities a backend may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFeature {
    /// Common table expressions (`WITH` clause).
    Cte,
    /// Disabling constraints outside of a transaction.
    DisableConstraintWithoutTransaction,
    /// Native JSON column type.
    Json,
    /// Raw literal quoting by the connection.
    Quote,
    /// Transaction savepoints.
    Savepoint,
    /// Truncating tables that have foreign keys attached.
    TruncateWithConstraints,
    /// Window functions (all or some clauses).
    Window,
}

impl DriverFeature {
    pub const ALL: [DriverFeature; 7] = [
        DriverFeature::Cte,
        DriverFeature::DisableConstraintWithoutTransaction,
        DriverFeature::Json,
        DriverFeature::Quote,
        DriverFeature::Savepoint,
        DriverFeature::TruncateWithConstraints,
        DriverFeature::Window,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverFeature::Cte => "cte",
            DriverFeature::DisableConstraintWithoutTransaction => {
                "disable-constraint-without-transaction"
            }
            DriverFeature::Json => "json",
            DriverFeature::Quote => "quote",
            DriverFeature::Savepoint => "savepoint",
            DriverFeature::TruncateWithConstraints => "truncate-with-constraints",
            DriverFeature::Window => "window",
        }
    }
}

impl fmt::Display for DriverFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DriverFeature::ALL
            .iter()
            .copied()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| format!("Unknown driver feature `{}`", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for feature in DriverFeature::ALL {
            assert_eq!(feature.as_str().parse::<DriverFeature>(), Ok(feature));
        }
        assert!("sequences".parse::<DriverFeature>().is_err());
    }
}
