//! Mapping of AWS SDK errors onto the store error taxonomy.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use funnel_error::{FunnelError, StoreError};

/// Convert an SDK error from `operation` on `target` into a [`FunnelError`].
///
/// | SDK error            | Store error                               |
/// |----------------------|-------------------------------------------|
/// | dispatch / timeout   | `Transport`                               |
/// | unparseable response | `StaleSession`                            |
/// | service, 404         | `NotFound`                                |
/// | service, 401 / 403   | `Auth`                                    |
/// | service, other       | `Server`                                  |
/// | request construction | `FunnelError::Other` (a bug, not the wire) |
pub fn map_sdk_error<E>(operation: &str, target: &str, error: SdkError<E, HttpResponse>) -> FunnelError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let detail = format!("{operation} {target}: {}", DisplayErrorContext(&error));

    match &error {
        SdkError::ConstructionFailure(_) => FunnelError::Other(anyhow::anyhow!(detail)),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            StoreError::Transport(detail).into()
        }
        SdkError::ResponseError(_) => StoreError::StaleSession(detail).into(),
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            let code = service.err().code().unwrap_or("Unknown");
            status_error(status, format!("{code}: {detail}"))
        }
        _ => StoreError::Transport(detail).into(),
    }
}

/// Classify a service error by its HTTP status.
pub(crate) fn status_error(status: u16, message: String) -> FunnelError {
    let error = match status {
        404 => StoreError::NotFound(message),
        401 | 403 => StoreError::Auth(message),
        _ => StoreError::Server { status, message },
    };
    error.into()
}
