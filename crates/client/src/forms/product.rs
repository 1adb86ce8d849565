//! Admin product editor.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use storepanel_core::{ImagePath, Price, ProductId};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use super::{FormContext, FormError, FormStatus, scalar_to_text};
use crate::api::{ApiError, MultipartPayload};
use crate::navigate::PendingRedirect;
use crate::notify::Toast;
use crate::preview::{Preview, SelectedFile};

/// How long product editor toasts stay visible.
pub const PRODUCT_TOAST_DURATION: Duration = Duration::from_millis(2000);

const MSG_NOT_AUTHENTICATED: &str = "Not authenticated";
const MSG_LOAD_FAILED: &str = "Failed to load product";
const MSG_UPDATE_FAILED: &str = "Update failed";
const MSG_UPDATED: &str = "Product updated successfully!";

/// Product as returned by `GET /api/admin/product/{id}`.
#[derive(Debug, Deserialize)]
struct ProductRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price: Option<serde_json::Value>,
    #[serde(default)]
    quantity: Option<serde_json::Value>,
    #[serde(default)]
    image: Option<String>,
}

/// Text fields of the product form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
}

/// Edit session for one product.
#[derive(Debug)]
pub struct ProductForm {
    ctx: FormContext,
    id: ProductId,
    fields: ProductFields,
    /// Newly chosen file, not yet uploaded.
    image: Option<SelectedFile>,
    /// Path of the image the server already has.
    existing_image: Option<ImagePath>,
    preview: Preview,
    status: watch::Sender<FormStatus>,
}

impl ProductForm {
    /// Empty form for product `id`. Call [`ProductForm::load`] to populate it.
    #[must_use]
    pub fn new(ctx: FormContext, id: ProductId) -> Self {
        Self {
            ctx,
            id,
            fields: ProductFields::default(),
            image: None,
            existing_image: None,
            preview: Preview::Empty,
            status: watch::channel(FormStatus::Idle).0,
        }
    }

    /// Create the form and load the product in one step.
    ///
    /// Load failures are reported through the notifier; the form is returned
    /// either way, empty if loading failed.
    pub async fn open(ctx: FormContext, id: ProductId) -> Self {
        let mut form = Self::new(ctx, id);
        let _ = form.load().await;
        form
    }

    fn path(&self) -> String {
        format!("/api/admin/product/{}", self.id)
    }

    fn set_status(&self, status: FormStatus) {
        self.status.send_replace(status);
    }

    fn toast_error(&self, message: impl Into<String>) {
        self.ctx
            .notifier
            .notify(Toast::error(message, PRODUCT_TOAST_DURATION));
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Fetch the product and populate the form.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Api` if the token is missing or the request fails.
    /// An error toast has already been shown when this returns `Err`.
    #[instrument(skip(self), fields(product_id = %self.id))]
    pub async fn load(&mut self) -> Result<(), FormError> {
        self.set_status(FormStatus::Loading);
        let result = self.ctx.api.get_json::<ProductRecord>(&self.path()).await;
        self.set_status(FormStatus::Idle);

        match result {
            Ok(record) => {
                self.apply_record(record);
                debug!(has_image = self.existing_image.is_some(), "Product loaded");
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    ApiError::MissingToken => MSG_NOT_AUTHENTICATED.to_string(),
                    ApiError::Storage(_) => err.to_string(),
                    other => other
                        .server_message()
                        .unwrap_or(MSG_LOAD_FAILED)
                        .to_string(),
                };
                self.toast_error(message);
                Err(err.into())
            }
        }
    }

    fn apply_record(&mut self, record: ProductRecord) {
        self.fields = ProductFields {
            name: record.name.unwrap_or_default(),
            description: record.description.unwrap_or_default(),
            price: scalar_to_text(record.price.as_ref()),
            quantity: scalar_to_text(record.quantity.as_ref()),
        };
        self.image = None;
        self.existing_image = record.image.and_then(ImagePath::new);
        self.preview = self
            .existing_image
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
    pub const fn fields(&self) -> &ProductFields {
        &self.fields
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.fields.name = value.into();
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        self.fields.description = value.into();
    }

    pub fn set_price(&mut self, value: impl Into<String>) {
        self.fields.price = value.into();
    }

    pub fn set_quantity(&mut self, value: impl Into<String>) {
        self.fields.quantity = value.into();
    }

    /// Choose a new image, or clear the choice with `None`.
    ///
    /// A new file gets a local preview. Clearing drops the pending file but
    /// keeps whatever preview was showing. The stored image path is left
    /// alone either way.
    pub fn select_image(&mut self, file: Option<SelectedFile>) {
        if file.is_some() {
            self.preview = Preview::local_blob(self.ctx.api.origin());
        }
        self.image = file;
    }

    /// Read an image from disk and select it.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Selection` (after an error toast) if the file
    /// cannot be used; the form is unchanged in that case.
    pub async fn select_image_path(&mut self, path: &Path) -> Result<(), FormError> {
        match SelectedFile::from_path(path).await {
            Ok(file) => {
                self.select_image(Some(file));
                Ok(())
            }
            Err(err) => {
                self.toast_error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Product being edited.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.id
    }

    /// Pending new image.
    #[must_use]
    pub const fn selected_image(&self) -> Option<&SelectedFile> {
        self.image.as_ref()
    }

    /// Image path the server currently holds.
    #[must_use]
    pub const fn existing_image(&self) -> Option<&ImagePath> {
        self.existing_image.as_ref()
    }

    /// Image to display next to the form.
    #[must_use]
    pub const fn preview(&self) -> &Preview {
        &self.preview
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        *self.status.borrow()
    }

    /// Receiver that follows [`ProductForm::status`] while a load or submit
    /// is in flight.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<FormStatus> {
        self.status.subscribe()
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Multipart body for the current state.
    ///
    /// Fields: `name`, `description`, `price`, `quantity`, then either `image`
    /// (new file) or `existingImage` (stored path).
    ///
    /// # Errors
    ///
    /// Returns `FormError::Invalid` if price or quantity is not a number.
    pub fn payload(&self) -> Result<MultipartPayload, FormError> {
        let price = Price::parse(&self.fields.price).map_err(|e| FormError::Invalid {
            field: "price",
            reason: e.to_string(),
        })?;

        let quantity = self
            .fields
            .quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| FormError::Invalid {
                field: "quantity",
                reason: format!("must be a whole number (got {:?})", self.fields.quantity),
            })?;

        Ok(MultipartPayload::new()
            .text("name", self.fields.name.as_str())
            .text("description", self.fields.description.as_str())
            .text("price", price.to_form_value())
            .text("quantity", quantity.to_string())
            .image_source(
                "image",
                self.image.as_ref(),
                "existingImage",
                self.existing_image.as_ref(),
            ))
    }

    /// Send the update.
    ///
    /// On success a confirmation toast is shown and navigation to the
    /// dashboard is scheduled after the configured delay; the returned handle
    /// can be awaited or cancelled.
    ///
    /// # Errors
    ///
    /// Returns `FormError::Api(ApiError::MissingToken)` without touching the
    /// network when no token is stored, `FormError::Invalid` for unparseable
    /// numbers, or the request error. An error toast has already been shown.
    #[instrument(skip(self), fields(product_id = %self.id))]
    pub async fn submit(&mut self) -> Result<PendingRedirect, FormError> {
        if let Err(err) = self.ctx.api.bearer_token() {
            match &err {
                ApiError::MissingToken => self.toast_error(MSG_NOT_AUTHENTICATED),
                other => self.toast_error(other.to_string()),
            }
            return Err(err.into());
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
            .put_multipart::<serde_json::Value>(&self.path(), payload)
            .await;
        self.set_status(FormStatus::Idle);

        match result {
            Ok(_) => {
                info!("Product updated");
                self.ctx
                    .notifier
                    .notify(Toast::success(MSG_UPDATED, PRODUCT_TOAST_DURATION));
                Ok(PendingRedirect::schedule(
                    self.ctx.navigator.clone(),
                    self.ctx.redirect.route.clone(),
                    self.ctx.redirect.delay,
                ))
            }
            Err(err) => {
                let message = err.server_message().unwrap_or(MSG_UPDATE_FAILED).to_string();
                self.toast_error(message);
                Err(err.into())
            }
        }
    }
}
