//! Product editor commands.
//!
//! # Usage
//!
//! ```bash
//! sp-cli product show 42
//! sp-cli product edit 42 --name "Green Tea" --price 1500 --quantity 12 --image ./tea.png
//! ```

use std::path::PathBuf;

use storepanel_client::ProductForm;
use storepanel_core::ProductId;

use super::{CommandError, form_context};

/// Field changes requested on the command line. `None` leaves a field as
/// loaded.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub image: Option<PathBuf>,
}

fn log_form(form: &ProductForm) {
    let fields = form.fields();
    tracing::info!(
        id = %form.id(),
        name = %fields.name,
        description = %fields.description,
        price = %fields.price,
        quantity = %fields.quantity,
        image = form.preview().url().unwrap_or("-"),
        "Product"
    );
}

/// Load a product and print it.
pub async fn show(id: ProductId) -> Result<(), CommandError> {
    let mut form = ProductForm::new(form_context()?, id);
    form.load().await?;
    log_form(&form);
    Ok(())
}

/// Load a product, apply `changes`, submit, and wait for the redirect.
pub async fn edit(id: ProductId, changes: ProductChanges) -> Result<(), CommandError> {
    let mut form = ProductForm::new(form_context()?, id);
    if form.load().await.is_err() {
        return Err(CommandError::NotLoaded);
    }

    if let Some(name) = changes.name {
        form.set_name(name);
    }
    if let Some(description) = changes.description {
        form.set_description(description);
    }
    if let Some(price) = changes.price {
        form.set_price(price);
    }
    if let Some(quantity) = changes.quantity {
        form.set_quantity(quantity);
    }
    if let Some(path) = changes.image {
        form.select_image_path(&path).await?;
    }

    let redirect = form.submit().await?;
    log_form(&form);
    tracing::info!(
        route = %redirect.route(),
        delay_ms = u64::try_from(redirect.delay().as_millis()).unwrap_or(u64::MAX),
        "Redirect scheduled"
    );
    redirect.wait().await;
    Ok(())
}
