//! # Dashboard Aggregation
//!
//! Assembles the admin dashboard from independent aggregation branches.
//! Branches run concurrently and degrade independently: a failing branch
//! logs, bumps a failure counter and serves its zeroed default rather than
//! failing the whole response. Traffic metrics follow the same contract
//! through [`crate::analytics::TrafficProvider`].

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::{TrafficMetrics, TrafficProvider};
use crate::models::{category, lead, perk};
use crate::repositories::{CategoryRepository, LeadRepository, PerkRepository};

/// How far back the recent-activity feed looks.
const ACTIVITY_WINDOW_HOURS: i64 = 24;

/// Reporting window for dashboard queries.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Named period the range came from, `custom` for explicit dates
    pub period: &'static str,
}

impl DateRange {
    /// Resolves the requested window. Explicit start and end dates win;
    /// otherwise a named period (`7d|30d|90d|365d`) counts back from now.
    /// Anything else, including nothing at all, means the last 30 days.
    pub fn resolve(
        period: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        if let (Some(start), Some(end)) = (start, end) {
            return Self::fixed(start, end);
        }
        let now = Utc::now();
        let (days, period) = match period {
            Some("7d") => (7, "7d"),
            Some("90d") => (90, "90d"),
            Some("365d") => (365, "365d"),
            _ => (30, "30d"),
        };
        Self {
            start: now - Duration::days(days),
            end: now,
            period,
        }
    }

    /// An explicit custom window.
    pub fn fixed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            period: "custom",
        }
    }
}

/// Headline numbers shown at the top of the dashboard.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_perks: u64,
    pub active_perks: u64,
    pub pending_approval: u64,
    pub total_leads: u64,
    pub new_leads: u64,
    pub converted_leads: u64,
    pub total_views: i64,
    pub total_clicks: i64,
    pub average_lead_score: f64,
}

/// Perk catalog statistics.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PerkStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub pending_approval: u64,
    pub total_views: i64,
    pub total_clicks: i64,
    pub top_viewed: Vec<TopPerk>,
}

/// One row of the most-viewed perks table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopPerk {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub view_count: i64,
    pub click_count: i64,
    pub conversion_rate: f64,
}

/// Category tree statistics.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CategoryStats {
    pub total: u64,
    pub active: u64,
    pub top_categories: Vec<TopCategory>,
}

/// One row of the largest-categories table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub perk_count: i32,
}

/// Lead pipeline statistics.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LeadStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    pub average_score: f64,
    /// Converted leads as a percentage of all leads
    pub conversion_rate: f64,
    pub needing_follow_up: u64,
}

/// One uniform entry of the recent-activity feed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: &'static str,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub data: JsonValue,
}

impl ActivityEntry {
    fn perk_created(perk: &perk::Model) -> Self {
        Self {
            kind: "perk",
            action: "created",
            title: perk.title.clone(),
            description: match &perk.vendor_name {
                Some(vendor) => format!("New perk from {}", vendor),
                None => "New perk added".to_string(),
            },
            timestamp: perk.created_at.with_timezone(&Utc),
            data: json!({"id": perk.id, "slug": perk.slug, "status": perk.status}),
        }
    }

    fn lead_created(lead: &lead::Model) -> Self {
        Self {
            kind: "lead",
            action: "created",
            title: lead.name.clone(),
            description: match &lead.perk_title {
                Some(title) => format!("New lead for {}", title),
                None => "New lead submitted".to_string(),
            },
            timestamp: lead.created_at.with_timezone(&Utc),
            data: json!({"id": lead.id, "email": lead.email, "lead_score": lead.lead_score}),
        }
    }

    fn category_created(category: &category::Model) -> Self {
        Self {
            kind: "category",
            action: "created",
            title: category.name.clone(),
            description: "New category added".to_string(),
            timestamp: category.created_at.with_timezone(&Utc),
            data: json!({"id": category.id, "slug": category.slug}),
        }
    }
}

/// Full overview response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardOverview {
    pub summary: DashboardSummary,
    pub perks: PerkStats,
    pub categories: CategoryStats,
    pub leads: LeadStats,
    pub recent_activity: Vec<ActivityEntry>,
    pub date_range: DateRange,
}

/// Aggregates repository statistics for the admin dashboard.
pub struct DashboardService {
    perks: PerkRepository,
    categories: CategoryRepository,
    leads: LeadRepository,
    traffic: Arc<dyn TrafficProvider>,
    recent_limit: usize,
}

impl DashboardService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        traffic: Arc<dyn TrafficProvider>,
        recent_limit: usize,
    ) -> Self {
        Self {
            perks: PerkRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            leads: LeadRepository::new(db),
            traffic,
            recent_limit,
        }
    }

    /// Assembles the full overview from all branches at once.
    pub async fn overview(&self, range: DateRange) -> DashboardOverview {
        let (summary, perks, categories, leads, recent_activity) = tokio::join!(
            self.summary(),
            self.perk_stats(),
            self.category_stats(),
            self.lead_stats(),
            self.recent_activity(),
        );

        DashboardOverview {
            summary: zero_on_error("summary", summary),
            perks: zero_on_error("perks", perks),
            categories: zero_on_error("categories", categories),
            leads: zero_on_error("leads", leads),
            recent_activity: zero_on_error("recent_activity", recent_activity),
            date_range: range,
        }
    }

    /// Headline numbers across the whole catalog and pipeline.
    async fn summary(&self) -> Result<DashboardSummary> {
        let total_perks = self.perks.count_total().await?;
        let active_perks = self.perks.count_by_status("active").await?;
        let pending_approval = self.perks.count_pending_approval().await?;
        let total_leads = self.leads.count_total().await?;
        let new_leads = self.leads.count_by_status("new").await?;
        let converted_leads = self.leads.count_by_status("converted").await?;
        let (total_views, total_clicks) = self.perks.sum_views_clicks().await?;
        let average_lead_score = self.leads.average_score().await?;

        Ok(DashboardSummary {
            total_perks,
            active_perks,
            pending_approval,
            total_leads,
            new_leads,
            converted_leads,
            total_views,
            total_clicks,
            average_lead_score,
        })
    }

    /// Perk catalog breakdown.
    pub async fn perk_stats(&self) -> Result<PerkStats> {
        let total = self.perks.count_total().await?;
        let mut by_status = BTreeMap::new();
        for status in perk::STATUSES {
            by_status.insert(status.to_string(), self.perks.count_by_status(status).await?);
        }
        let pending_approval = self.perks.count_pending_approval().await?;
        let (total_views, total_clicks) = self.perks.sum_views_clicks().await?;
        let top_viewed = self
            .perks
            .top_viewed(5)
            .await?
            .into_iter()
            .map(|perk| TopPerk {
                id: perk.id,
                title: perk.title,
                slug: perk.slug,
                view_count: perk.view_count,
                click_count: perk.click_count,
                conversion_rate: perk.conversion_rate,
            })
            .collect();

        Ok(PerkStats {
            total,
            by_status,
            pending_approval,
            total_views,
            total_clicks,
            top_viewed,
        })
    }

    /// Category tree breakdown.
    pub async fn category_stats(&self) -> Result<CategoryStats> {
        let total = self.categories.count_total().await?;
        let active = self.categories.count_active().await?;

        let mut all = self.categories.find_all(true).await?;
        all.sort_by(|a, b| b.perk_count.cmp(&a.perk_count));
        let top_categories = all
            .into_iter()
            .take(5)
            .map(|category| TopCategory {
                id: category.id,
                name: category.name,
                slug: category.slug,
                perk_count: category.perk_count,
            })
            .collect();

        Ok(CategoryStats {
            total,
            active,
            top_categories,
        })
    }

    /// Lead pipeline breakdown.
    pub async fn lead_stats(&self) -> Result<LeadStats> {
        let total = self.leads.count_total().await?;
        let mut by_status = BTreeMap::new();
        for status in lead::STATUSES {
            by_status.insert(status.to_string(), self.leads.count_by_status(status).await?);
        }
        let mut by_source = BTreeMap::new();
        for source in lead::SOURCES {
            by_source.insert(source.to_string(), self.leads.count_by_source(source).await?);
        }
        let average_score = self.leads.average_score().await?;
        let converted = by_status.get("converted").copied().unwrap_or(0);
        let conversion_rate = if total == 0 {
            0.0
        } else {
            converted as f64 * 100.0 / total as f64
        };
        let follow_up_filter = crate::repositories::LeadFilter {
            needs_follow_up: true,
            ..Default::default()
        };
        let (_, needing_follow_up) = self.leads.list(&follow_up_filter, 0, 1).await?;

        Ok(LeadStats {
            total,
            by_status,
            by_source,
            average_score,
            conversion_rate,
            needing_follow_up,
        })
    }

    /// Uniform feed of what was created in the last day, newest first.
    async fn recent_activity(&self) -> Result<Vec<ActivityEntry>> {
        let since = Utc::now() - Duration::hours(ACTIVITY_WINDOW_HOURS);
        let limit = self.recent_limit as u64;

        let (perks, leads, categories) = tokio::join!(
            self.perks.created_since(since, limit),
            self.leads.created_since(since, limit),
            self.categories.created_since(since, limit),
        );

        let mut entries = Vec::new();
        for perk in perks? {
            entries.push(ActivityEntry::perk_created(&perk));
        }
        for lead in leads? {
            entries.push(ActivityEntry::lead_created(&lead));
        }
        for category in categories? {
            entries.push(ActivityEntry::category_created(&category));
        }
        // Stable sort keeps same-timestamp entries in merge order
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(self.recent_limit);
        Ok(entries)
    }

    /// Traffic metrics for the range. Unconfigured or failing providers
    /// degrade to all zeros, never to an error.
    pub async fn traffic(&self, range: &DateRange) -> TrafficMetrics {
        if !self.traffic.is_configured() {
            return TrafficMetrics::zero();
        }
        match self.traffic.fetch(range).await {
            Ok(metrics) => metrics,
            Err(error) => {
                tracing::warn!(error = ?error, "traffic provider failed, serving zeroed metrics");
                counter!("dashboard_traffic_failures_total").increment(1);
                TrafficMetrics::zero()
            }
        }
    }
}

fn zero_on_error<T: Default>(branch: &'static str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(branch, error = ?error, "dashboard branch failed, serving zeroed stats");
            counter!("dashboard_branch_failures_total", "branch" => branch).increment(1);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::UnconfiguredTrafficProvider;
    use async_trait::async_trait;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, Set};

    async fn setup() -> Arc<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Arc::new(db)
    }

    fn service(db: Arc<DatabaseConnection>, recent_limit: usize) -> DashboardService {
        DashboardService::new(db, Arc::new(UnconfiguredTrafficProvider), recent_limit)
    }

    fn perk_row(title: &str) -> perk::ActiveModel {
        let now = Utc::now();
        perk::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            slug: Set(title.to_lowercase().replace(' ', "-")),
            description: Set(None),
            summary: Set(None),
            vendor_name: Set(Some("Acme".to_string())),
            website_url: Set(None),
            discount_label: Set(None),
            category_id: Set(None),
            client_id: Set(None),
            status: Set("active".to_string()),
            approval_status: Set("approved".to_string()),
            approval_note: Set(None),
            is_visible: Set(true),
            starts_at: Set(None),
            ends_at: Set(None),
            quantity: Set(None),
            redemption_count: Set(0),
            view_count: Set(40),
            click_count: Set(10),
            lead_count: Set(0),
            conversion_rate: Set(25.0),
            main_image: Set(None),
            vendor_logo: Set(None),
            gallery: Set(None),
            seo_title: Set(None),
            seo_description: Set(None),
            seo_keywords: Set(None),
            created_by: Set(None),
            updated_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    fn lead_row(name: &str, email: &str) -> lead::ActiveModel {
        let now = Utc::now();
        lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            phone: Set(None),
            company_name: Set(None),
            message: Set(None),
            interests: Set(None),
            budget_range: Set("not-specified".to_string()),
            timeline: Set("flexible".to_string()),
            source: Set("website".to_string()),
            status: Set("new".to_string()),
            priority: Set("medium".to_string()),
            lead_score: Set(0),
            perk_id: Set(None),
            perk_title: Set(None),
            category_id: Set(None),
            category_name: Set(None),
            assigned_to: Set(None),
            notes: Set(None),
            contact_attempts: Set(0),
            last_contacted_at: Set(None),
            follow_up_at: Set(None),
            converted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    fn category_row(name: &str) -> category::ActiveModel {
        let now = Utc::now();
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(name.to_lowercase().replace(' ', "-")),
            description: Set(None),
            parent_id: Set(None),
            level: Set(0),
            display_order: Set(0),
            is_active: Set(true),
            perk_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    #[test]
    fn test_date_range_resolution() {
        let week = DateRange::resolve(Some("7d"), None, None);
        assert_eq!(week.period, "7d");
        assert_eq!((week.end - week.start).num_days(), 7);

        let default = DateRange::resolve(None, None, None);
        assert_eq!(default.period, "30d");
        assert_eq!((default.end - default.start).num_days(), 30);

        // Unknown period names fall back to the default window
        let unknown = DateRange::resolve(Some("14d"), None, None);
        assert_eq!(unknown.period, "30d");

        let start = "2026-01-01T00:00:00Z".parse().unwrap();
        let end = "2026-02-01T00:00:00Z".parse().unwrap();
        let custom = DateRange::resolve(Some("7d"), Some(start), Some(end));
        assert_eq!(custom.period, "custom");
        assert_eq!(custom.start, start);
        assert_eq!(custom.end, end);
    }

    #[tokio::test]
    async fn test_overview_aggregates_all_branches() {
        let db = setup().await;
        let perks = PerkRepository::new(db.clone());
        let leads = LeadRepository::new(db.clone());
        let categories = CategoryRepository::new(db.clone());

        perks.create(perk_row("Cloud Credits")).await.unwrap();
        leads.create(lead_row("Ada", "ada@example.com")).await.unwrap();
        categories.create(category_row("Software")).await.unwrap();

        let range = DateRange::resolve(None, None, None);
        let overview = service(db, 10).overview(range).await;

        assert_eq!(overview.summary.total_perks, 1);
        assert_eq!(overview.summary.active_perks, 1);
        assert_eq!(overview.summary.total_leads, 1);
        assert_eq!(overview.summary.total_views, 40);
        assert_eq!(overview.summary.total_clicks, 10);

        assert_eq!(overview.perks.by_status["active"], 1);
        assert_eq!(overview.perks.top_viewed.len(), 1);
        assert_eq!(overview.leads.by_status["new"], 1);
        assert_eq!(overview.leads.by_source["website"], 1);
        assert_eq!(overview.categories.total, 1);
        assert_eq!(overview.date_range.period, "30d");

        // One entry per freshly created record
        assert_eq!(overview.recent_activity.len(), 3);
        let kinds: Vec<&str> = overview.recent_activity.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&"perk"));
        assert!(kinds.contains(&"lead"));
        assert!(kinds.contains(&"category"));
    }

    #[tokio::test]
    async fn test_recent_activity_respects_limit() {
        let db = setup().await;
        let leads = LeadRepository::new(db.clone());
        for i in 0..5 {
            leads
                .create(lead_row("Ada", &format!("ada{}@example.com", i)))
                .await
                .unwrap();
        }

        let entries = service(db, 2).recent_activity().await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert!(entries[0].timestamp >= entries[1].timestamp);
    }

    #[tokio::test]
    async fn test_traffic_degrades_to_zero_on_provider_failure() {
        struct FailingProvider;

        #[async_trait]
        impl TrafficProvider for FailingProvider {
            fn is_configured(&self) -> bool {
                true
            }
            async fn fetch(&self, _range: &DateRange) -> Result<TrafficMetrics> {
                anyhow::bail!("upstream down")
            }
        }

        let db = setup().await;
        let service = DashboardService::new(db, Arc::new(FailingProvider), 10);
        let range = DateRange::resolve(None, None, None);

        let metrics = service.traffic(&range).await;
        assert_eq!(metrics, TrafficMetrics::zero());
    }

    #[tokio::test]
    async fn test_unconfigured_traffic_is_zero_without_fetching() {
        let db = setup().await;
        let range = DateRange::resolve(Some("90d"), None, None);
        let metrics = service(db, 10).traffic(&range).await;
        assert_eq!(metrics, TrafficMetrics::zero());
    }
}
