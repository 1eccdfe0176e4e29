//! The fixed report catalog.
//!
//! Each report binds a logical name to a response label and a SQL template
//! over the GA4 export schema. Templates are pure string construction; the
//! only interpolated value is the table reference, which is either resolver
//! output or the configured event wildcard. Client input never reaches the
//! query text.

use std::fmt;

use sightline_common::models::ReportDescriptor;
use sightline_error::{find_closest_match, ErrorCode, ErrorContext, Result, SightlineError};

/// Fully qualified warehouse table reference.
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Which table a report queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// Pins the single resolved users shard (latest or selector-dated).
    Snapshot,
    /// Spans all event shards via the `events_*` wildcard.
    Wildcard,
}

impl TableScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Wildcard => "wildcard",
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub name: &'static str,
    pub label: &'static str,
    pub scope: TableScope,
    template: fn(&TableRef) -> String,
}

impl Report {
    pub fn render(&self, table: &TableRef) -> String {
        (self.template)(table)
    }

    pub fn descriptor(&self) -> ReportDescriptor {
        ReportDescriptor {
            name: self.name.to_string(),
            label: self.label.to_string(),
            scope: self.scope.as_str().to_string(),
        }
    }
}

pub struct ReportCatalog {
    reports: Vec<Report>,
}

impl ReportCatalog {
    /// The dashboard's report set, registered once at startup.
    pub fn standard() -> Self {
        use TableScope::{Snapshot, Wildcard};

        Self {
            reports: vec![
                Report { name: "user", label: "users", scope: Snapshot, template: users_query },
                Report { name: "geo", label: "geo", scope: Snapshot, template: geo_query },
                Report { name: "mobile", label: "mobile", scope: Snapshot, template: mobile_query },
                Report { name: "technology", label: "technology", scope: Snapshot, template: technology_query },
                Report { name: "userEngagement", label: "userEngagement", scope: Wildcard, template: user_engagement_query },
                Report { name: "acquisition", label: "acquisition", scope: Wildcard, template: acquisition_query },
                Report { name: "behaviorFlow", label: "behaviorFlow", scope: Wildcard, template: behavior_flow_query },
                Report { name: "userRetention", label: "userRetention", scope: Wildcard, template: user_retention_query },
                Report { name: "eventPopularity", label: "eventPopularity", scope: Wildcard, template: event_popularity_query },
                Report { name: "trafficSourceAnalysis", label: "trafficSourceAnalysis", scope: Wildcard, template: traffic_source_query },
                Report { name: "userActivityOverTime", label: "userActivityOverTime", scope: Wildcard, template: user_activity_query },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Result<&Report> {
        self.reports.iter().find(|r| r.name == name).ok_or_else(|| {
            let available: Vec<String> =
                self.reports.iter().map(|r| r.name.to_string()).collect();

            let mut err = SightlineError::new(
                ErrorCode::UnknownReport,
                format!("Report '{}' is not registered", name),
            )
            .with_context(ErrorContext::UnknownReport {
                report: name.to_string(),
                available_reports: available.clone(),
            });

            if let Some(closest) = find_closest_match(name, &available) {
                err = err.with_hint(format!("Did you mean '{}'?", closest));
            }
            err
        })
    }

    pub fn render(&self, name: &str, table: &TableRef) -> Result<String> {
        Ok(self.get(name)?.render(table))
    }

    pub fn descriptors(&self) -> Vec<ReportDescriptor> {
        self.reports.iter().map(Report::descriptor).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter()
    }
}

// --- Templates over the GA4 export schema ---

fn users_query(t: &TableRef) -> String {
    format!("SELECT user_id, user_pseudo_id FROM `{t}` LIMIT 100")
}

fn geo_query(t: &TableRef) -> String {
    format!(
        "SELECT geo, geo.city, geo.country FROM `{t}` ORDER BY last_updated_date DESC LIMIT 100"
    )
}

fn mobile_query(t: &TableRef) -> String {
    format!(
        "SELECT device, device.category, device.mobile_brand_name, device.operating_system \
         FROM `{t}` ORDER BY last_updated_date DESC LIMIT 100"
    )
}

fn technology_query(t: &TableRef) -> String {
    format!(
        "SELECT device, device.operating_system, device.browser \
         FROM `{t}` ORDER BY last_updated_date DESC LIMIT 100"
    )
}

fn user_engagement_query(t: &TableRef) -> String {
    format!(
        "SELECT event_name, COUNT(*) AS event_count, \
         SUM((SELECT value.int_value FROM UNNEST(event_params) WHERE key = 'engagement_time_msec')) AS engagement_time_msec \
         FROM `{t}` GROUP BY event_name ORDER BY event_count DESC LIMIT 100"
    )
}

fn acquisition_query(t: &TableRef) -> String {
    format!(
        "SELECT traffic_source.source, traffic_source.medium, \
         COUNT(DISTINCT user_pseudo_id) AS new_users \
         FROM `{t}` WHERE event_name = 'first_visit' \
         GROUP BY 1, 2 ORDER BY new_users DESC LIMIT 100"
    )
}

fn behavior_flow_query(t: &TableRef) -> String {
    format!(
        "SELECT event_name, \
         (SELECT value.string_value FROM UNNEST(event_params) WHERE key = 'page_location') AS page_location, \
         COUNT(*) AS occurrences \
         FROM `{t}` WHERE event_name IN ('page_view', 'screen_view') \
         GROUP BY 1, 2 ORDER BY occurrences DESC LIMIT 100"
    )
}

fn user_retention_query(t: &TableRef) -> String {
    format!(
        "SELECT event_date, COUNT(DISTINCT user_pseudo_id) AS active_users, \
         COUNT(DISTINCT IF(event_name = 'first_visit', user_pseudo_id, NULL)) AS new_users \
         FROM `{t}` GROUP BY event_date ORDER BY event_date DESC LIMIT 100"
    )
}

fn event_popularity_query(t: &TableRef) -> String {
    format!(
        "SELECT event_name, COUNT(*) AS total_events \
         FROM `{t}` GROUP BY event_name ORDER BY total_events DESC LIMIT 100"
    )
}

fn traffic_source_query(t: &TableRef) -> String {
    format!(
        "SELECT traffic_source.name, traffic_source.source, traffic_source.medium, \
         COUNT(*) AS events \
         FROM `{t}` GROUP BY 1, 2, 3 ORDER BY events DESC LIMIT 100"
    )
}

fn user_activity_query(t: &TableRef) -> String {
    format!(
        "SELECT event_date, COUNT(DISTINCT user_pseudo_id) AS active_users, COUNT(*) AS events \
         FROM `{t}` GROUP BY event_date ORDER BY event_date DESC LIMIT 100"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> TableRef {
        TableRef {
            project: "steynentertainment-800ea".to_string(),
            dataset: "analytics_403555927".to_string(),
            table: name.to_string(),
        }
    }

    #[test]
    fn test_all_reports_registered() {
        let catalog = ReportCatalog::standard();
        let names: Vec<_> = catalog.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "user",
                "geo",
                "mobile",
                "technology",
                "userEngagement",
                "acquisition",
                "behaviorFlow",
                "userRetention",
                "eventPopularity",
                "trafficSourceAnalysis",
                "userActivityOverTime",
            ]
        );
    }

    #[test]
    fn test_snapshot_render_pins_resolved_table() {
        let catalog = ReportCatalog::standard();
        let sql = catalog
            .render("geo", &table("pseudonymous_users_20240115"))
            .unwrap();
        assert!(sql.contains(
            "`steynentertainment-800ea.analytics_403555927.pseudonymous_users_20240115`"
        ));
        assert!(sql.contains("geo.country"));
    }

    #[test]
    fn test_wildcard_render_spans_all_shards() {
        let catalog = ReportCatalog::standard();
        let sql = catalog.render("userRetention", &table("events_*")).unwrap();
        assert!(sql.contains("`steynentertainment-800ea.analytics_403555927.events_*`"));
        assert!(sql.contains("first_visit"));
    }

    #[test]
    fn test_unknown_report() {
        let catalog = ReportCatalog::standard();
        let err = catalog.get("gio").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownReport);
        assert_eq!(err.hint.as_deref(), Some("Did you mean 'geo'?"));
    }

    #[test]
    fn test_labels_match_reference_behavior() {
        let catalog = ReportCatalog::standard();
        assert_eq!(catalog.get("user").unwrap().label, "users");
        assert_eq!(catalog.get("geo").unwrap().label, "geo");
        assert_eq!(catalog.get("mobile").unwrap().label, "mobile");
    }

    #[test]
    fn test_rendering_is_pure() {
        let catalog = ReportCatalog::standard();
        let a = catalog.render("user", &table("pseudonymous_users_20240115")).unwrap();
        let b = catalog.render("user", &table("pseudonymous_users_20240115")).unwrap();
        assert_eq!(a, b);
    }
}
