use operis_api::endpoints::auth;

use super::{api_failure, build_context, CommandResult, GlobalArgs};

pub async fn register(
    globals: &GlobalArgs,
    email: &str,
    password: &str,
    full_name: &str,
) -> CommandResult {
    let context = match build_context(globals, "register") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let request = auth::RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        full_name: full_name.to_string(),
        role: None,
    };
    match auth::register(&context.client, &request).await {
        Ok(profile) => CommandResult::success(
            "register",
            format!("account created for {}; log in to continue", profile.email),
        ),
        Err(error) => api_failure("register", error),
    }
}

pub async fn login(globals: &GlobalArgs, email: &str, password: &str) -> CommandResult {
    let context = match build_context(globals, "login") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    match auth::login(&context.client, email, password).await {
        Ok(profile) => CommandResult::success(
            "login",
            format!("logged in as {} ({})", profile.full_name, profile.role),
        ),
        Err(error) => api_failure("login", error),
    }
}

pub fn logout(globals: &GlobalArgs) -> CommandResult {
    let context = match build_context(globals, "logout") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    auth::logout(&context.client);
    CommandResult::success("logout", "session cleared")
}

pub fn whoami(globals: &GlobalArgs) -> CommandResult {
    let context = match build_context(globals, "whoami") {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    match context.client.session().profile() {
        Some(profile) => CommandResult::listing(format!(
            "{} <{}>\nrole: {}\ndashboard: {}",
            profile.full_name,
            profile.email,
            profile.role,
            profile.role.dashboard()
        )),
        None => CommandResult::failure("whoami", "auth_required", "not logged in", 3),
    }
}
