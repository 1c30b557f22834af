//! Endpoint registry data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the registry file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    /// Organization number of the bank
    pub org_number: String,
    /// Display name, may be empty
    pub name: String,
    pub url: String,
    /// Protocol/schema version tag
    pub version: String,
    /// Inclusive start of the validity window, in UTC
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive end of the validity window, in UTC
    pub to_date: Option<DateTime<Utc>>,
}

/// Deployment environment stamped on every served endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    #[default]
    Prod,
}

impl Environment {
    pub fn from_test_flag(use_test_endpoints: bool) -> Self {
        if use_test_endpoints {
            Environment::Test
        } else {
            Environment::Prod
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointView {
    pub org_no: String,
    pub name: String,
    pub url: String,
    pub version: String,
    pub env: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<DateTime<Utc>>,
}

impl EndpointView {
    pub fn from_record(record: EndpointRecord, env: Environment) -> Self {
        Self {
            org_no: record.org_number,
            name: record.name,
            url: record.url,
            version: record.version,
            env,
            from_date: record.from_date,
            to_date: record.to_date,
        }
    }

    /// Copy of this endpoint with both validity dates cleared
    pub fn without_dates(&self) -> Self {
        Self {
            from_date: None,
            to_date: None,
            ..self.clone()
        }
    }

    /// Whether the validity window contains `now` (bounds inclusive)
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.from_date.is_none_or(|from| from <= now) && !self.has_expired_at(now)
    }

    /// Whether the validity window ended before `now`
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.to_date.is_some_and(|to| to < now)
    }
}

/// Listing payload returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointsList {
    pub endpoints: Vec<EndpointView>,
    pub total: usize,
}

impl From<Vec<EndpointView>> for EndpointsList {
    fn from(endpoints: Vec<EndpointView>) -> Self {
        let total = endpoints.len();
        Self { endpoints, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_view(
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> EndpointView {
        EndpointView {
            org_no: "910000000".to_string(),
            name: "Testbank".to_string(),
            url: "https://bank.example/api".to_string(),
            version: "v2".to_string(),
            env: Environment::Test,
            from_date,
            to_date,
        }
    }

    #[test]
    fn test_environment_from_flag() {
        assert_eq!(Environment::from_test_flag(true), Environment::Test);
        assert_eq!(Environment::from_test_flag(false), Environment::Prod);
        assert_eq!(Environment::Prod.to_string(), "prod");
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let view = create_test_view(Some(from), Some(to));

        assert!(view.is_active_at(from));
        assert!(view.is_active_at(to));
        assert!(!view.is_active_at(from - chrono::Duration::seconds(1)));
        assert!(!view.is_active_at(to + chrono::Duration::seconds(1)));
        assert!(view.has_expired_at(to + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_serialization_omits_absent_dates() {
        let json = serde_json::to_value(create_test_view(None, None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "orgNo": "910000000",
                "name": "Testbank",
                "url": "https://bank.example/api",
                "version": "v2",
                "env": "test"
            })
        );
    }

    #[test]
    fn test_serialization_includes_present_dates() {
        let to = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let json = serde_json::to_value(create_test_view(None, Some(to))).unwrap();
        assert_eq!(json["toDate"], "2025-06-30T12:00:00Z");
        assert!(json.get("fromDate").is_none());
    }

    #[test]
    fn test_endpoints_list_total() {
        let list = EndpointsList::from(vec![create_test_view(None, None); 3]);
        assert_eq!(list.total, 3);
    }
}
