//! Error display for the CLI.

use colored::Colorize;
use mkr_client::ClientError;
use mkr_provider::ResourceError;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(hint) = err.chain().find_map(hint_for) {
        eprintln!("\n{}", hint.yellow());
    }
}

fn hint_for(cause: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    if let Some(err) = cause.downcast_ref::<ResourceError>() {
        return match err {
            ResourceError::Config(_) => {
                Some("Hint: Run `mkr auth login --key <KEY>` or set MACKEREL_APIKEY.")
            }
            ResourceError::InvalidFormat(e) if e.is_invalid_format() => {
                Some("Hint: Import IDs look like `my-service/my-namespace`.")
            }
            ResourceError::RequiresReplacement { .. } => {
                Some("Hint: Use `mkr apply` to replace the document instead of updating it.")
            }
            ResourceError::RemoteApi(inner) => client_hint(inner),
            _ => None,
        };
    }

    cause.downcast_ref::<ClientError>().and_then(client_hint)
}

fn client_hint(err: &ClientError) -> Option<&'static str> {
    match err {
        ClientError::Api { status: 401 | 403, .. } => {
            Some("Hint: Check that your API key is valid and has write permission.")
        }
        ClientError::Api { status: 404, .. } => {
            Some("Hint: Metadata can only be attached to a service that already exists.")
        }
        ClientError::Network(_) => {
            Some("Hint: Check your network connection and API endpoint.")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_for_missing_key() {
        let err = anyhow::Error::new(ResourceError::Config("no key".into()));
        let hint = err.chain().find_map(hint_for).unwrap();
        assert!(hint.contains("auth login"));
    }

    #[test]
    fn hint_for_wrapped_client_error() {
        let err = anyhow::Error::new(ResourceError::RemoteApi(ClientError::api(
            403,
            "Forbidden",
        )))
        .context("applying service_metadata.foo");
        assert!(err.chain().find_map(hint_for).is_some());
    }
}
