use std::sync::Arc;

use axum::extract::FromRef;
use domains::ports::{
    CommentRepository, MediaProcessor, MediaStorage, NotificationRepository, Notifier, PasswordHasher,
    RecipeRepository, ReportRepository, ReviewRepository, TokenBlacklist, TokenService, UserRepository,
};
use services::{
    AdminService, AuthService, CommentService, NotificationService, RecipeService, ReportService, ReviewService,
    UserService,
};

use crate::metrics::Metrics;

/// The port implementations chosen by the binary.
pub struct Adapters {
    pub users: Arc<dyn UserRepository>,
    pub recipes: Arc<dyn RecipeRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
    pub blacklist: Arc<dyn TokenBlacklist>,
    pub media: Arc<dyn MediaStorage>,
    pub processor: Arc<dyn MediaProcessor>,
}

/// State shared across all request tasks.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub recipes: Arc<RecipeService>,
    pub reviews: Arc<ReviewService>,
    pub comments: Arc<CommentService>,
    pub reports: Arc<ReportService>,
    pub notifications: Arc<NotificationService>,
    pub admin: Arc<AdminService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wires every service over the given adapters. `auto_approve` publishes
    /// user recipes without moderation.
    pub fn new(adapters: Adapters, auto_approve: bool) -> Self {
        let Adapters {
            users,
            recipes,
            comments,
            reviews,
            reports,
            notifications,
            hasher,
            tokens,
            blacklist,
            media,
            processor,
        } = adapters;

        let notification_service = Arc::new(NotificationService::new(notifications, users.clone()));
        let notifier: Arc<dyn Notifier> = notification_service.clone();

        Self {
            auth: Arc::new(AuthService::new(users.clone(), hasher.clone(), tokens, blacklist)),
            users: Arc::new(UserService::new(users.clone(), recipes.clone(), reviews.clone(), hasher.clone())),
            recipes: Arc::new(RecipeService::new(
                recipes.clone(),
                users.clone(),
                media,
                processor,
                notifier.clone(),
                auto_approve,
            )),
            reviews: Arc::new(ReviewService::new(reviews.clone(), recipes.clone(), notifier.clone())),
            comments: Arc::new(CommentService::new(recipes.clone(), comments)),
            reports: Arc::new(ReportService::new(reports.clone(), recipes.clone(), notifier)),
            notifications: notification_service,
            admin: Arc::new(AdminService::new(users, recipes, reviews, reports, hasher)),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
