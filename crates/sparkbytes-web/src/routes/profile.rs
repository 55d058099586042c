use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use sparkbytes_core::model::{Profile, ProfileInput, Requirement, PROFILE_PATH};
use sparkbytes_core::mutation::{self, Action, Flash, ALREADY_SUBMITTING};

use crate::error::AppError;
use crate::gate::{self, Visitor};
use crate::page::{diet_options, redirect_with, DietOption, FlashQuery, FormFields, Layout};
use crate::AppState;

const EDIT_PROFILE_PATH: &str = "/profile/edit_profile";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(show_profile))
        .route("/createprofile", get(new_profile_form).post(create_profile))
        .route(EDIT_PROFILE_PATH, get(edit_profile_form).post(edit_profile))
}

// -- Templates --

/// A profile prepared for display, "N/A" standing in for blanks.
pub struct ProfileView {
    pub name: String,
    pub bu_id: String,
    pub bio: String,
    pub interests: String,
    pub diet: String,
    pub language: String,
}

fn or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "N/A".to_string(),
    }
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        let diet = (!p.diet.is_empty()).then(|| p.diet.join(", "));
        Self {
            name: or_na(Some(&p.name)),
            bu_id: or_na(Some(&p.bu_id)),
            bio: or_na(p.bio.as_deref()),
            interests: or_na(p.interests.as_deref()),
            diet: or_na(diet.as_deref()),
            language: or_na(p.language.as_deref()),
        }
    }
}

#[derive(Template)]
#[template(path = "profile/show.html")]
struct ProfileTemplate {
    layout: Layout,
    profile: Option<ProfileView>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "profile/form.html")]
struct ProfileFormTemplate {
    layout: Layout,
    heading: &'static str,
    action: &'static str,
    submit_label: &'static str,
    input: ProfileInput,
    bu_id: String,
    /// The BU ID is fixed once the profile exists.
    bu_id_locked: bool,
    diet: Vec<DietOption>,
    error: Option<String>,
}

enum FormMode {
    Create,
    Edit,
}

impl FormMode {
    fn template(
        &self,
        state: &AppState,
        flash: Option<Flash>,
        input: ProfileInput,
        bu_id: String,
        error: Option<String>,
    ) -> ProfileFormTemplate {
        let (heading, action, submit_label, bu_id_locked) = match self {
            Self::Create => ("Create Your Profile", "/createprofile", "Create Profile", false),
            Self::Edit => ("Edit Profile", EDIT_PROFILE_PATH, "Save Changes", true),
        };
        ProfileFormTemplate {
            layout: Layout::new(state, true, flash),
            heading,
            action,
            submit_label,
            diet: diet_options(&input.diet),
            input,
            bu_id,
            bu_id_locked,
            error,
        }
    }

    fn render(
        &self,
        state: &AppState,
        input: ProfileInput,
        bu_id: String,
        error: Option<String>,
    ) -> Result<Response, AppError> {
        let tmpl = self.template(state, None, input, bu_id, error);
        Ok(Html(tmpl.render()?).into_response())
    }
}

fn read_input(fields: &FormFields) -> ProfileInput {
    ProfileInput {
        name: fields.get("name"),
        bio: fields.get("bio"),
        interests: fields.get("interests"),
        bu_id: Some(fields.get("bu_id")),
        diet: fields.all("diet"),
        language: fields.get("language"),
    }
}

// -- Handlers --

async fn show_profile(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let (profile, error) = match state.api.get_profile(&visitor.ctx).await {
        Ok(profile) => (Some(ProfileView::from(profile)), None),
        Err(e) => {
            tracing::warn!(error = %e, "profile fetch failed");
            (None, Some(e.user_message("Failed to fetch profile.")))
        }
    };
    let tmpl = ProfileTemplate {
        layout: Layout::new(&state, true, flash.into_flash()),
        profile,
        error,
    };
    Ok(Html(tmpl.render()?))
}

async fn new_profile_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Authenticated).await?;
    let tmpl = FormMode::Create.template(
        &state,
        flash.into_flash(),
        ProfileInput::default(),
        String::new(),
        None,
    );
    Ok(Html(tmpl.render()?))
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Authenticated).await?;

    let fields = FormFields(fields);
    let submitted = read_input(&fields);
    let bu_id = fields.get("bu_id");
    let input = match submitted.clone().validate_new() {
        Ok(input) => input,
        Err(e) => return FormMode::Create.render(&state, submitted, bu_id, Some(e.user_message(""))),
    };

    let key = visitor.credential(&state).unwrap_or_default();
    let Some(_guard) = state.in_flight.try_begin(&key, Action::CreateProfile) else {
        return FormMode::Create.render(&state, input, bu_id, Some(ALREADY_SUBMITTING.into()));
    };

    let outcome = mutation::submit(
        state.api.create_profile(&input, &visitor.ctx),
        |message| message,
        "Failed to create profile.",
    )
    .await;

    match outcome.flash() {
        Some(flash) if flash.is_success() => {
            tracing::info!(bu_id = %bu_id, "profile created");
            // The gate must see the new profile on the next page.
            state.sessions.refresh(&visitor.ctx).await;
            Ok(redirect_with(PROFILE_PATH, &flash).into_response())
        }
        other => FormMode::Create.render(&state, input, bu_id, other.map(|f| f.message)),
    }
}

async fn edit_profile_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let (input, bu_id, error) = match state.api.get_profile(&visitor.ctx).await {
        Ok(profile) => (ProfileInput::from_profile(&profile), profile.bu_id, None),
        Err(e) => {
            tracing::warn!(error = %e, "profile prefill failed");
            let message = e.user_message("Failed to fetch profile data.");
            (ProfileInput::default(), String::new(), Some(message))
        }
    };
    let tmpl = FormMode::Edit.template(&state, flash.into_flash(), input, bu_id, error);
    Ok(Html(tmpl.render()?))
}

async fn edit_profile(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;

    let fields = FormFields(fields);
    let submitted = read_input(&fields);
    let bu_id = fields.get("bu_id");
    let input = match submitted.clone().validate_edit() {
        Ok(input) => input,
        Err(e) => return FormMode::Edit.render(&state, submitted, bu_id, Some(e.user_message(""))),
    };

    let key = visitor.credential(&state).unwrap_or_default();
    let Some(_guard) = state.in_flight.try_begin(&key, Action::EditProfile) else {
        return FormMode::Edit.render(&state, input, bu_id, Some(ALREADY_SUBMITTING.into()));
    };

    let outcome = mutation::submit(
        state.api.edit_profile(&input, &visitor.ctx),
        |message| message,
        "Failed to update profile.",
    )
    .await;

    match outcome.flash() {
        Some(flash) if flash.is_success() => Ok(redirect_with(PROFILE_PATH, &flash).into_response()),
        other => FormMode::Edit.render(&state, input, bu_id, other.map(|f| f.message)),
    }
}
