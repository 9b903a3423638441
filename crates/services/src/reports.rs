use std::sync::Arc;

use domains::ports::{Notifier, RecipeRepository, ReportRepository};
use domains::{DomainError, DomainResult, NewNotification, NotificationKind, Report, ResolutionStatus, User};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
    recipes: Arc<dyn RecipeRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        recipes: Arc<dyn RecipeRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { reports, recipes, notifier }
    }

    #[instrument(skip_all, fields(%recipe_id, user_id = %user.id))]
    pub async fn create(&self, user: &User, recipe_id: Uuid, reason: &str) -> DomainResult<Report> {
        self.recipes
            .find_by_id(recipe_id)
            .await?
            .filter(|r| r.is_visible_to(Some(user)))
            .ok_or_else(|| DomainError::not_found("recipe", recipe_id))?;
        let report = Report::new(recipe_id, user.id, reason)?;
        self.reports.insert(&report).await?;
        info!(report_id = %report.id, "recipe reported");
        Ok(report)
    }

    pub async fn mine(&self, user: &User) -> DomainResult<Vec<Report>> {
        self.reports.list_by_reporter(user.id).await
    }

    pub async fn list(&self, status: Option<ResolutionStatus>) -> DomainResult<Vec<Report>> {
        self.reports.list(status).await
    }

    /// Resolving a report tells the reporter how it went.
    #[instrument(skip_all, fields(report_id = %id, %status))]
    pub async fn set_status(&self, id: Uuid, status: ResolutionStatus) -> DomainResult<Report> {
        let report = self
            .reports
            .set_status(id, status)
            .await?
            .ok_or_else(|| DomainError::not_found("report", id))?;
        info!("report status changed");

        if let (Some(reporter), false) = (report.reporter_id, status == ResolutionStatus::Pending) {
            let message = match status {
                ResolutionStatus::Approved => "Thanks, your report was reviewed and action was taken",
                _ => "Your report was reviewed and dismissed",
            };
            self.notifier
                .notify(
                    NewNotification::new(reporter, NotificationKind::Admin, message)
                        .with_title("Report resolved")
                        .with_link(format!("/recipes/{}", report.recipe_id))
                        .with_data(serde_json::json!({ "reportId": report.id, "status": status })),
                )
                .await;
        }
        Ok(report)
    }
}
