use atrium_cli::{CLIConfiguration, OutputFormatter, Result};
use atrium_link::AtriumClient;
use atrium_session::{AccessGuard, Principal, RoleResolver, RouteDecision, RouteTable};

/// Sign in, resolve the role and list what the account may open.
///
/// The route table is built before signing in, and a session that was
/// opened is always signed out again.
pub async fn handle_whoami(
    client: &AtriumClient,
    config: &CLIConfiguration,
    formatter: &OutputFormatter,
    email: &str,
    password: &str,
    path: Option<&str>,
) -> Result<()> {
    let routes = RouteTable::site_with_fallback(&config.resolved_routes().fallback)?;

    let auth = client.auth();
    let session = auth.sign_in(email, password).await?;
    let principal = Principal::from(&session.user);

    let shown = report(client, &routes, formatter, &principal, email, path).await;
    let signed_out = auth.sign_out().await;
    shown?;
    signed_out?;
    Ok(())
}

async fn report(
    client: &AtriumClient,
    routes: &RouteTable,
    formatter: &OutputFormatter,
    principal: &Principal,
    email: &str,
    path: Option<&str>,
) -> Result<()> {
    let resolver = RoleResolver::for_client(client.clone());
    let role = match resolver.try_resolve(principal).await {
        Ok(role) => role,
        Err(e) => {
            log::warn!("No role for {}: {}", principal.id, e);
            None
        },
    };

    let guard = AccessGuard::new(role);
    let accessible = routes.accessible(role);
    println!(
        "{}",
        formatter.whoami(
            principal.email.as_deref().unwrap_or(email),
            role,
            guard.permissions(),
            &accessible
        )
    );

    if let Some(path) = path {
        let decision = match routes.decide(path, role) {
            RouteDecision::Open => "open".to_string(),
            RouteDecision::Granted(route) => format!("granted by {}", route.prefix),
            RouteDecision::Redirect { fallback, .. } => format!("redirect to {}", fallback),
        };
        println!("{}: {}", path, decision);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_cli::config::RoutesConfig;
    use atrium_cli::CLIError;
    use atrium_session::SessionError;

    #[tokio::test]
    async fn test_bad_route_table_fails_before_sign_in() {
        // Nothing listens on port 9; reaching sign-in would be a network error.
        let client = AtriumClient::builder()
            .base_url("http://127.0.0.1:9")
            .anon_key("anon")
            .build()
            .unwrap();
        let mut config = CLIConfiguration::default();
        config.routes = Some(RoutesConfig {
            fallback: "signin".into(),
        });

        let result = handle_whoami(
            &client,
            &config,
            &OutputFormatter::new(true),
            "ada@example.com",
            "secret",
            None,
        )
        .await;
        assert!(
            matches!(result, Err(CLIError::SessionError(SessionError::InvalidRouteTable(_)))),
            "unexpected result {:?}",
            result
        );
    }
}
