//! # services
//!
//! Business rules of LunchBox. Each service owns the checks for one area
//! (ownership, visibility, moderation) and talks to storage only through the
//! `domains::ports` traits.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod notifications;
pub mod recipes;
pub mod reports;
pub mod reviews;
pub mod users;

pub use admin::{AdminService, Overview};
pub use auth::{
    AuthService, AuthSession, ForgotPasswordInput, LoginInput, PasswordReset, RegisterInput, ResetGrant,
    SecurityAnswerInput, SecurityChallenge,
};
pub use comments::{CommentInput, CommentService};
pub use notifications::NotificationService;
pub use recipes::{ImageContent, ImageInput, RecipeService};
pub use reports::ReportService;
pub use reviews::{ReviewInput, ReviewService};
pub use users::{PasswordChange, ProfileUpdate, SecurityQuestionUpdate, UserService};
