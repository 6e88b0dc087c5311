//! Admin sign-in and password reset pages

use super::{Rendered, html};
use askama::Template;
use promised_land_admin::{AuthForm, AuthMode, Notice};

#[derive(Debug, Template)]
#[template(path = "login.html")]
struct LoginPage<'a> {
    notice: Option<&'a Notice>,
    mode: AuthMode,
    email: &'a str,
    subtitle: &'static str,
    needs_password: bool,
    submit_label: &'static str,
    loading: bool,
    show_forgot: bool,
    switch_prompt: &'static str,
    switch_label: &'static str,
    switch_target: AuthMode,
}

#[derive(Debug, Template)]
#[template(path = "reset.html")]
struct ResetPage<'a> {
    notice: Option<&'a Notice>,
}

/// Render the sign-in form in its current mode
///
/// # Errors
///
/// Returns the template engine's error.
pub fn render_login(form: &AuthForm, notice: Option<&Notice>) -> Rendered {
    let (switch_prompt, switch_label, switch_target) = form.mode.switch_link();
    html(&LoginPage {
        notice,
        mode: form.mode,
        email: &form.email,
        subtitle: form.mode.subtitle(),
        needs_password: form.mode.needs_password(),
        submit_label: form.mode.submit_label(),
        loading: form.loading,
        show_forgot: form.mode == AuthMode::Login,
        switch_prompt,
        switch_label,
        switch_target,
    })
}

/// Render the set-a-new-password form
///
/// # Errors
///
/// Returns the template engine's error.
pub fn render_reset(notice: Option<&Notice>) -> Rendered {
    html(&ResetPage { notice })
}
