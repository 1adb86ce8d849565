//! Profile commands.
//!
//! # Usage
//!
//! ```bash
//! sp-cli profile show
//! sp-cli profile update --phone 0771234567 --dob 1990-05-17 --avatar ./me.jpg
//! ```

use std::path::PathBuf;

use storepanel_client::ProfileForm;

use super::{CommandError, form_context};

/// Field changes requested on the command line.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub avatar: Option<PathBuf>,
}

fn log_form(form: &ProfileForm) {
    let fields = form.fields();
    tracing::info!(
        phone = %fields.phone,
        dob = %fields.dob,
        avatar = form.preview().url().unwrap_or("-"),
        "Profile"
    );
}

/// Load the profile and print it.
pub async fn show() -> Result<(), CommandError> {
    let mut form = ProfileForm::new(form_context()?);
    form.load().await?;
    log_form(&form);
    Ok(())
}

/// Load the profile, apply `changes` and submit.
pub async fn update(changes: ProfileChanges) -> Result<(), CommandError> {
    let mut form = ProfileForm::new(form_context()?);
    if form.load().await.is_err() {
        return Err(CommandError::NotLoaded);
    }

    if let Some(phone) = changes.phone {
        form.set_phone(phone);
    }
    if let Some(dob) = changes.dob {
        form.set_dob(dob);
    }
    if let Some(path) = changes.avatar {
        form.select_avatar_path(&path).await?;
    }

    form.submit().await?;
    log_form(&form);
    Ok(())
}
