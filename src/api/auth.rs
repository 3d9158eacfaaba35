/// Resolve the bearer token used against the runs API.
///
/// Priority:
/// 1. `server.token` from the config file
/// 2. `STACK_RUNS_TOKEN` environment variable
///
/// Returns `None` when neither is set; requests are then sent anonymously.
pub fn resolve_token(configured: Option<&str>) -> Option<String> {
    if let Some(token) = configured.map(str::trim)
        && !token.is_empty()
    {
        return Some(token.to_owned());
    }

    if let Ok(token) = std::env::var("STACK_RUNS_TOKEN")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_owned());
    }

    None
}
