//! The signed-in user's own profile.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use storepanel_core::ImagePath;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{FormContext, FormError, FormStatus, error_detail, scalar_to_text};
use crate::api::{ApiError, MultipartPayload};
use crate::notify::Toast;
use crate::preview::{Preview, SelectedFile};

/// How long profile toasts stay visible.
pub const PROFILE_TOAST_DURATION: Duration = Duration::from_millis(3000);

const PROFILE_PATH: &str = "/api/profile";
const DOB_FORMAT: &str = "%Y-%m-%d";

const MSG_LOGIN_REQUIRED: &str = "Authentication required. Please log in.";
const MSG_SESSION_EXPIRED: &str = "Session expired or unauthorized. Please log in again.";
const MSG_LOAD_FAILED_PREFIX: &str = "Failed to load profile data: ";
const MSG_UPDATE_FAILED_PREFIX: &str = "Failed to update profile: ";
const MSG_UPDATED: &str = "Profile updated successfully!";
const MSG_FALLBACK: &str = "Server error";

#[derive(Debug, Default, Deserialize)]
struct UserRecord {
    #[serde(default)]
    phone: Option<serde_json::Value>,
    #[serde(default)]
    dob: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

/// `GET /api/profile` body.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    user: Option<UserRecord>,
}

/// `PUT /api/profile` body.
#[derive(Debug, Default, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<UserRecord>,
}

/// Text fields of the profile form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub phone: String,
    /// `YYYY-MM-DD`, or empty.
    pub dob: String,
}

/// Normalise a server date of birth to `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps (converted to their UTC date), bare dates and
/// naive timestamps. Returns `None` for anything else.
#[must_use]
pub fn normalize_dob(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).format(DOB_FORMAT).to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DOB_FORMAT) {
        return Some(date.format(DOB_FORMAT).to_string());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date().format(DOB_FORMAT).to_string());
    }
    None
}

/// Edit session for the current user's profile.
#[derive(Debug)]
pub struct ProfileForm {
    ctx: FormContext,
    fields: ProfileFields,
    /// Newly chosen avatar, not yet uploaded.
    avatar: Option<SelectedFile>,
    /// Avatar path the server already has.
    existing_avatar: Option<ImagePath>,
    preview: Preview,
    status: watch::Sender<FormStatus>,
}

impl ProfileForm {
    /// Empty form. Call [`ProfileForm::load`] to populate it.
    #[must_use]
    pub fn new(ctx: FormContext) -> Self {
        Self {
            ctx,
            fields: ProfileFields::default(),
            avatar: None,
            existing_avatar: None,
            preview: Preview::Empty,
            status: watch::channel(FormStatus::Idle).0,
        }
    }

    /// Create the form and load the profile in one step.
    ///
    /// Load failures are reported through the notifier; the form is returned
    /// either way.
    pub async fn open(ctx: FormContext) -> Self {
        let mut form = Self::new(ctx);
        let _ = form.load().await;
        form
    }

    fn set_status(&self, status: FormStatus) {
        self.status.send_replace(status);
    }

    fn toast_error(&self, message: impl Into<String>) {
        self.ctx
            .notifier
            .notify(Toast::error(message, PROFILE_TOAST_DURATION));
    }

    /// Toast for a failed call, using `prefix` for errors other than
    /// missing or rejected credentials.
    fn report_failure(&self, err: &FormError, prefix: &str) {
        let message = match err {
            FormError::Api(ApiError::MissingToken) => MSG_LOGIN_REQUIRED.to_string(),
            FormError::Api(api) if api.is_unauthorized() => MSG_SESSION_EXPIRED.to_string(),
            other => format!("{prefix}{}", error_detail(other, MSG_FALLBACK)),
        };
        self.toast_error(message);
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Fetch the profile and populate the form.
    ///
    /// Status is `Loading` while the request is in flight and `Idle`
    /// afterwards, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Api` if the token is missing, the request fails or
    /// the reply carries no `user` object. An error toast has already been
    /// shown when this returns `Err`; the form is left as it was.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), FormError> {
        self.set_status(FormStatus::Loading);
        let result = self
            .ctx
            .api
            .get_json::<ProfileResponse>(PROFILE_PATH)
            .await
            .and_then(|response| {
                response
                    .user
                    .ok_or_else(|| ApiError::Decode("missing user".to_string()))
            });
        self.set_status(FormStatus::Idle);

        match result {
            Ok(user) => {
                self.apply_user(user);
                debug!(has_avatar = self.existing_avatar.is_some(), "Profile loaded");
                Ok(())
            }
            Err(err) => {
                let err = FormError::from(err);
                self.report_failure(&err, MSG_LOAD_FAILED_PREFIX);
                Err(err)
            }
        }
    }

    fn apply_user(&mut self, user: UserRecord) {
        self.fields.phone = scalar_to_text(user.phone.as_ref());
        self.fields.dob = user.dob.as_deref().map_or_else(String::new, |raw| {
            normalize_dob(raw).unwrap_or_else(|| {
                warn!(dob = %raw, "Unrecognised date of birth from server");
                String::new()
            })
        });
        self.avatar = None;
        self.set_existing_avatar(user.avatar);
    }

    fn set_existing_avatar(&mut self, raw: Option<String>) {
        self.existing_avatar = raw.and_then(ImagePath::new);
        self.preview = self
            .existing_avatar
            .as_ref()
            .map_or(Preview::Empty, |path| {
                Preview::remote(self.ctx.api.origin(), path)
            });
    }

    // =========================================================================
    // Edit
    // =========================================================================

    /// Current field values.
    #[must_use]
    pub const fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    pub fn set_phone(&mut self, value: impl Into<String>) {
        self.fields.phone = value.into();
    }

    pub fn set_dob(&mut self, value: impl Into<String>) {
        self.fields.dob = value.into();
    }

    /// Choose a new avatar, or clear the choice with `None`.
    ///
    /// Clearing keeps the preview that was showing.
    pub fn select_avatar(&mut self, file: Option<SelectedFile>) {
        if file.is_some() {
            self.preview = Preview::local_blob(self.ctx.api.origin());
        }
        self.avatar = file;
    }

    /// Read an avatar from disk and select it.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Selection` (after an error toast) if the file
    /// cannot be used; the form is unchanged in that case.
    pub async fn select_avatar_path(&mut self, path: &Path) -> Result<(), FormError> {
        match SelectedFile::from_path(path).await {
            Ok(file) => {
                self.select_avatar(Some(file));
                Ok(())
            }
            Err(err) => {
                self.toast_error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Pending new avatar.
    #[must_use]
    pub const fn selected_avatar(&self) -> Option<&SelectedFile> {
        self.avatar.as_ref()
    }

    /// Avatar path the server currently holds.
    #[must_use]
    pub const fn existing_avatar(&self) -> Option<&ImagePath> {
        self.existing_avatar.as_ref()
    }

    /// Avatar to display next to the form.
    #[must_use]
    pub const fn preview(&self) -> &Preview {
        &self.preview
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        *self.status.borrow()
    }

    /// Receiver that follows [`ProfileForm::status`] while a load or submit
    /// is in flight.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<FormStatus> {
        self.status.subscribe()
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.status() != FormStatus::Idle
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Multipart body for the current state.
    ///
    /// Fields: `phone`, `dob`, then either `avatar` (new file) or
    /// `existingAvatar` (stored path).
    ///
    /// # Errors
    ///
    /// Returns `FormError::Invalid` if the date of birth is neither empty nor
    /// a `YYYY-MM-DD` date.
    pub fn payload(&self) -> Result<MultipartPayload, FormError> {
        let dob = self.fields.dob.trim();
        if !dob.is_empty() && NaiveDate::parse_from_str(dob, DOB_FORMAT).is_err() {
            return Err(FormError::Invalid {
                field: "dob",
                reason: format!("expected YYYY-MM-DD (got {dob:?})"),
            });
        }

        Ok(MultipartPayload::new()
            .text("phone", self.fields.phone.as_str())
            .text("dob", dob)
            .image_source(
                "avatar",
                self.avatar.as_ref(),
                "existingAvatar",
                self.existing_avatar.as_ref(),
            ))
    }

    /// Send the update.
    ///
    /// Dismisses visible toasts first. On success shows the server's message
    /// (or a default) and, when the reply carries the stored avatar path,
    /// switches the preview to it and drops the pending file.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Api(ApiError::MissingToken)` without touching the
    /// network when no token is stored, `FormError::Invalid` for a malformed
    /// date, or the request error. An error toast has already been shown.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<(), FormError> {
        self.ctx.notifier.dismiss_all();

        if let Err(err) = self.ctx.api.bearer_token() {
            let err = FormError::from(err);
            self.report_failure(&err, MSG_UPDATE_FAILED_PREFIX);
            return Err(err);
        }

        let payload = match self.payload() {
            Ok(payload) => payload,
            Err(err) => {
                self.toast_error(err.to_string());
                return Err(err);
            }
        };

        self.set_status(FormStatus::Submitting);
        let result = self
            .ctx
            .api
            .put_multipart::<Option<UpdateResponse>>(PROFILE_PATH, payload)
            .await;
        self.set_status(FormStatus::Idle);

        match result {
            Ok(response) => {
                let response = response.unwrap_or_default();
                info!("Profile updated");

                let message = response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| MSG_UPDATED.to_string());
                self.ctx
                    .notifier
                    .notify(Toast::success(message, PROFILE_TOAST_DURATION));

                if let Some(avatar) = response.user.and_then(|u| u.avatar)
                    && ImagePath::new(avatar.as_str()).is_some()
                {
                    self.avatar = None;
                    self.set_existing_avatar(Some(avatar));
                }
                Ok(())
            }
            Err(err) => {
                let err = FormError::from(err);
                self.report_failure(&err, MSG_UPDATE_FAILED_PREFIX);
                Err(err)
            }
        }
    }
}
